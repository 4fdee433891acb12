//! # Dispatcher
//!
//! 优先级消息分发模块。
//!
//! 负责：
//! - 按优先级缓冲 `Message` (每级一个 FIFO 队列)
//! - 单个后台 worker 按衰减预算排空队列
//! - 主 sink 失败时转交备用 sink
//! - 停止时限时排空

pub mod error;
pub mod factory;
pub mod messenger;
pub mod metrics;
pub mod queue;
pub mod service;
pub mod sinks;
mod worker;

pub use contracts::{Message, MessageSink, MsgPriority, StatsSnapshot};
pub use error::DispatcherError;
pub use factory::{create_sink, ConfiguredSink};
pub use messenger::{Messenger, ServiceState};
pub use metrics::DispatchStats;
pub use queue::PriorityQueueBank;
pub use service::{MessageService, MessageServiceBuilder};
pub use sinks::{FileSink, LogSink, NetworkSink, NopSink};
