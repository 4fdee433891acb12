//! Message - producer 输入
//!
//! 待发送消息及其优先级。

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 消息优先级
///
/// Lower ordinal = more urgent. Negative priorities are unrepresentable;
/// unknown names are rejected when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MsgPriority {
    /// 紧急
    Urgent = 0,
    /// 普通
    #[default]
    Normal = 1,
    /// 低于普通
    BelowNormal = 2,
}

impl MsgPriority {
    /// The least urgent level
    pub const SLOWEST: MsgPriority = MsgPriority::BelowNormal;

    /// Number of distinct levels
    pub const COUNT: usize = MsgPriority::SLOWEST as usize + 1;

    /// All levels, most urgent first
    pub const ALL: [MsgPriority; MsgPriority::COUNT] = [
        MsgPriority::Urgent,
        MsgPriority::Normal,
        MsgPriority::BelowNormal,
    ];

    /// Queue index requested by this level
    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Level for an ordinal, if it names one
    pub fn from_ordinal(ordinal: usize) -> Option<Self> {
        Self::ALL.get(ordinal).copied()
    }

    /// Parse a level name (`urgent`, `normal`, `below_normal`) or ordinal
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "urgent" => Some(Self::Urgent),
            "normal" => Some(Self::Normal),
            "below_normal" | "belownormal" | "slowest" => Some(Self::BelowNormal),
            other => other.parse::<usize>().ok().and_then(Self::from_ordinal),
        }
    }
}

impl fmt::Display for MsgPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Urgent => "urgent",
            Self::Normal => "normal",
            Self::BelowNormal => "below_normal",
        };
        f.write_str(name)
    }
}

/// 消息 ID (进程内单调递增)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

impl MessageId {
    /// Allocate the next process-wide id
    pub fn next() -> Self {
        Self(NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 待发送消息
///
/// Immutable once handed to a dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// 消息 ID
    pub id: MessageId,

    /// 优先级
    #[serde(default)]
    pub priority: MsgPriority,

    /// 发送方地址 (可选)
    #[serde(default)]
    pub from: Option<String>,

    /// 接收方地址
    #[serde(default)]
    pub to: Vec<String>,

    /// 主题
    pub subject: String,

    /// 消息体 (零拷贝)
    pub body: Bytes,

    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a message with a fresh id
    pub fn new(priority: MsgPriority, subject: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            id: MessageId::next(),
            priority,
            from: None,
            to: Vec::new(),
            subject: subject.into(),
            body: body.into(),
            created_at: Utc::now(),
        }
    }

    /// Set sender address
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Add a recipient address
    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to.push(to.into());
        self
    }
}
