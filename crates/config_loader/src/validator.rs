//! 配置校验模块
//!
//! 校验规则：
//! - dispatch 参数范围 (validator derive)
//! - 主 sink 必须存在
//! - sink 名称非空且互不相同
//! - network sink 必须提供 addr
//! - 停止超时不能小于轮询间隔 (0 表示停止时立即放弃)

use contracts::{ContractError, MessagingConfig, SinkConfig, SinkType};

/// 校验 MessagingConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &MessagingConfig) -> Result<(), ContractError> {
    validate_service_name(config)?;
    validate_dispatch(config)?;
    validate_sinks(config)?;
    Ok(())
}

/// 校验服务名称
fn validate_service_name(config: &MessagingConfig) -> Result<(), ContractError> {
    if config.name.trim().is_empty() {
        return Err(ContractError::config_validation(
            "name",
            "service name cannot be empty",
        ));
    }
    Ok(())
}

/// 校验调度参数
fn validate_dispatch(config: &MessagingConfig) -> Result<(), ContractError> {
    config.dispatch.check()
}

/// 校验 sink 配置
fn validate_sinks(config: &MessagingConfig) -> Result<(), ContractError> {
    let sink = config
        .sink
        .as_ref()
        .ok_or_else(|| ContractError::config_validation("sink", "mailer sink is not set"))?;
    validate_sink("sink", sink)?;

    if let Some(fallback) = &config.fallback_sink {
        validate_sink("fallback_sink", fallback)?;
        if fallback.name == sink.name {
            return Err(ContractError::config_validation(
                "fallback_sink.name",
                format!("duplicate sink name '{}'", sink.name),
            ));
        }
    }
    Ok(())
}

fn validate_sink(section: &str, sink: &SinkConfig) -> Result<(), ContractError> {
    if sink.name.is_empty() {
        return Err(ContractError::config_validation(
            format!("{section}.name"),
            "sink name cannot be empty",
        ));
    }
    if sink.sink_type == SinkType::Network && !sink.params.contains_key("addr") {
        return Err(ContractError::config_validation(
            format!("{section}.params.addr"),
            "network sink requires 'addr'",
        ));
    }
    Ok(())
}
