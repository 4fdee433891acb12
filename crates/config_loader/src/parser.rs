//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式，格式由文件扩展名决定。

use std::path::Path;

use contracts::{ContractError, MessagingConfig};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// 从文件路径推断格式
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse(format!(
                "cannot determine file format of {}",
                path.display()
            ))
        })?;

        Self::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn label(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }
}

/// 根据格式解析配置 (不做校验)
pub fn parse(content: &str, format: ConfigFormat) -> Result<MessagingConfig, ContractError> {
    match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| parse_error(format, e)),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| parse_error(format, e)),
    }
}

fn parse_error<E>(format: ConfigFormat, e: E) -> ContractError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ContractError::ConfigParse {
        message: format!("{} parse error: {e}", format.label()),
        source: Some(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SinkType;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
name = "mailer"

[dispatch]
poll_interval_ms = 250
instrumentation_enabled = true

[sink]
name = "smtp_relay"
sink_type = "network"
[sink.params]
addr = "127.0.0.1:2525"
format = "json"

[fallback_sink]
name = "outbox"
sink_type = "file"
"#;
        let result = parse(content, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.name, "mailer");
        assert_eq!(config.dispatch.poll_interval_ms, 250);
        assert!(config.dispatch.instrumentation_enabled);
        let sink = config.sink.unwrap();
        assert_eq!(sink.sink_type, SinkType::Network);
        assert_eq!(sink.params.get("addr").map(String::as_str), Some("127.0.0.1:2525"));
        assert_eq!(config.fallback_sink.unwrap().sink_type, SinkType::File);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "name": "mailer",
            "sink": { "name": "log", "sink_type": "log" }
        }"#;
        let result = parse(content, ConfigFormat::Json);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.log_level, "warn");
        assert!(config.fallback_sink.is_none());
    }

    #[test]
    fn test_parse_unknown_sink_type() {
        let content = r#"
[sink]
name = "x"
sink_type = "carrier_pigeon"
"#;
        assert!(parse(content, ConfigFormat::Toml).is_err());
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse(content, ConfigFormat::Toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("conf/messaging.json")).unwrap(),
            ConfigFormat::Json
        );
        assert!(ConfigFormat::from_path(Path::new("messaging")).is_err());
    }

    #[test]
    fn test_parse_error_names_format() {
        let err = parse("{ not json", ConfigFormat::Json).unwrap_err();
        assert!(err.to_string().contains("JSON parse error"));
    }
}
