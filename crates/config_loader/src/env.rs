//! 环境变量覆盖
//!
//! `MESSAGING_*` 变量覆盖文件中的服务与调度参数，在校验之前应用。

use contracts::{ContractError, MessagingConfig};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "MESSAGING_";

/// Overrides gathered from the environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub name: Option<String>,
    pub log_level: Option<String>,
    pub priority_levels: Option<usize>,
    pub initial_budget: Option<usize>,
    pub poll_interval_ms: Option<u64>,
    pub abort_timeout_ms: Option<u64>,
    pub instrumentation_enabled: Option<bool>,
    pub instrumentation_interval_ms: Option<u64>,
}

impl EnvOverrides {
    /// Read `MESSAGING_*` from the process environment
    pub fn gather() -> Result<Self, ContractError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`, which receives the full variable name
    ///
    /// # Errors
    /// A variable is set but does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ContractError> {
        let get = |suffix: &str| {
            let key = format!("{ENV_PREFIX}{suffix}");
            lookup(&key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| (key, v))
        };

        Ok(Self {
            name: get("NAME").map(|(_, v)| v),
            log_level: get("LOG_LEVEL").map(|(_, v)| v),
            priority_levels: get("PRIORITY_LEVELS").map(parse_number).transpose()?,
            initial_budget: get("INITIAL_BUDGET").map(parse_number).transpose()?,
            poll_interval_ms: get("POLL_INTERVAL_MS").map(parse_number).transpose()?,
            abort_timeout_ms: get("ABORT_TIMEOUT_MS").map(parse_number).transpose()?,
            instrumentation_enabled: get("INSTRUMENTATION").map(parse_bool).transpose()?,
            instrumentation_interval_ms: get("INSTRUMENTATION_INTERVAL_MS")
                .map(parse_number)
                .transpose()?,
        })
    }

    /// True when no variable was set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Write every set override into `config`
    pub fn apply(&self, config: &mut MessagingConfig) {
        if let Some(name) = &self.name {
            config.name = name.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }

        let dispatch = &mut config.dispatch;
        if let Some(v) = self.priority_levels {
            dispatch.priority_levels = v;
        }
        if let Some(v) = self.initial_budget {
            dispatch.initial_budget = v;
        }
        if let Some(v) = self.poll_interval_ms {
            dispatch.poll_interval_ms = v;
        }
        if let Some(v) = self.abort_timeout_ms {
            dispatch.abort_timeout_ms = v;
        }
        if let Some(v) = self.instrumentation_enabled {
            dispatch.instrumentation_enabled = v;
        }
        if let Some(v) = self.instrumentation_interval_ms {
            dispatch.instrumentation_interval_ms = v;
        }
    }
}

fn parse_number<T: std::str::FromStr>((key, value): (String, String)) -> Result<T, ContractError> {
    value
        .parse()
        .map_err(|_| ContractError::config_validation(key, format!("'{value}' is not a number")))
}

fn parse_bool((key, value): (String, String)) -> Result<bool, ContractError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ContractError::config_validation(
            key,
            format!("'{value}' is not a boolean"),
        )),
    }
}
