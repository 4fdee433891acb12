//! MessagingConfig - Config Loader 输出
//!
//! 描述消息服务配置：调度参数、主 sink、备用 sink。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::{ContractError, MsgPriority};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的消息服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 服务名称 (用于日志/指标标签)
    #[serde(default = "default_service_name")]
    pub name: String,

    /// 默认日志级别 (RUST_LOG 优先)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// 调度参数
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// 主 sink
    #[serde(default)]
    pub sink: Option<SinkConfig>,

    /// 备用 sink (缺省为 nop)
    #[serde(default)]
    pub fallback_sink: Option<SinkConfig>,
}

fn default_service_name() -> String {
    "messaging".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            name: default_service_name(),
            log_level: default_log_level(),
            dispatch: DispatchConfig::default(),
            sink: None,
            fallback_sink: None,
        }
    }
}

/// 调度循环参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DispatchConfig {
    /// 优先级队列数量
    #[validate(range(min = 1, max = 64))]
    pub priority_levels: usize,

    /// 最高优先级队列每轮预算 (逐级减半, 最少 1)
    #[validate(range(min = 1))]
    pub initial_budget: usize,

    /// 唤醒信号等待上限 (毫秒)
    #[validate(range(min = 1))]
    pub poll_interval_ms: u64,

    /// 停止时单个队列排空的超时 (毫秒)
    pub abort_timeout_ms: u64,

    /// 是否定期输出统计
    pub instrumentation_enabled: bool,

    /// 统计输出间隔 (毫秒)
    #[validate(range(min = 1))]
    pub instrumentation_interval_ms: u64,
}

impl DispatchConfig {
    /// 校验取值范围以及 abort_timeout_ms 与 poll_interval_ms 的关系
    ///
    /// # Errors
    /// 第一个不合法字段对应的 `ConfigValidation`
    pub fn check(&self) -> Result<(), ContractError> {
        self.validate().map_err(|errors| {
            let mut fields: Vec<_> = errors.field_errors().into_keys().collect();
            fields.sort();
            let field = fields
                .first()
                .map(|f| format!("dispatch.{f}"))
                .unwrap_or_else(|| "dispatch".to_string());
            ContractError::config_validation(field, errors.to_string())
        })?;

        if self.abort_timeout_ms > 0 && self.abort_timeout_ms < self.poll_interval_ms {
            return Err(ContractError::config_validation(
                "dispatch.abort_timeout_ms",
                format!(
                    "abort_timeout_ms ({}) must be 0 or >= poll_interval_ms ({})",
                    self.abort_timeout_ms, self.poll_interval_ms
                ),
            ));
        }

        Ok(())
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            priority_levels: MsgPriority::COUNT,
            initial_budget: 50,
            poll_interval_ms: 1000,
            abort_timeout_ms: 10_000,
            instrumentation_enabled: false,
            instrumentation_interval_ms: 10_000,
        }
    }
}

/// Sink 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 名称
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl SinkConfig {
    /// Create a sink config without parameters
    pub fn new(name: impl Into<String>, sink_type: SinkType) -> Self {
        Self {
            name: name.into(),
            sink_type,
            params: HashMap::new(),
        }
    }

    /// Add a type-specific parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// 文件输出 (JSON Lines)
    File,
    /// 网络输出 (UDP)
    Network,
    /// 丢弃
    Nop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.priority_levels, 3);
        assert_eq!(config.initial_budget, 50);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.abort_timeout_ms, 10_000);
        assert!(!config.instrumentation_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dispatch_zero_levels_invalid() {
        let config = DispatchConfig {
            priority_levels: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dispatch_check() {
        assert!(DispatchConfig::default().check().is_ok());

        let busy = DispatchConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        let err = busy.check().unwrap_err().to_string();
        assert!(err.contains("dispatch.poll_interval_ms"));

        let short_abort = DispatchConfig {
            abort_timeout_ms: 10,
            poll_interval_ms: 100,
            ..Default::default()
        };
        assert!(short_abort.check().is_err());

        let unbounded = DispatchConfig {
            abort_timeout_ms: 0,
            ..Default::default()
        };
        assert!(unbounded.check().is_ok());
    }

    #[test]
    fn test_partial_dispatch_section_uses_defaults() {
        let config: MessagingConfig = toml::from_str(
            r#"
name = "mailer"

[dispatch]
initial_budget = 8
"#,
        )
        .unwrap();
        assert_eq!(config.name, "mailer");
        assert_eq!(config.dispatch.initial_budget, 8);
        assert_eq!(config.dispatch.priority_levels, 3);
        assert!(config.sink.is_none());
    }

    #[test]
    fn test_sink_config_builder() {
        let sink = SinkConfig::new("udp", SinkType::Network).with_param("addr", "127.0.0.1:9");
        assert_eq!(sink.params.get("addr").map(String::as_str), Some("127.0.0.1:9"));
    }
}
