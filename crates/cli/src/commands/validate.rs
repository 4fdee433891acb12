//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{MessagingConfig, SinkType};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    service: String,
    priority_levels: usize,
    sink: String,
    fallback_sink: Option<String>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    service: config.name.clone(),
                    priority_levels: config.dispatch.priority_levels,
                    sink: config
                        .sink
                        .as_ref()
                        .map(|s| s.name.clone())
                        .unwrap_or_default(),
                    fallback_sink: config.fallback_sink.as_ref().map(|s| s.name.clone()),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &MessagingConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let dispatch = &config.dispatch;

    match &config.fallback_sink {
        None => warnings.push(
            "No fallback sink configured - messages the primary sink rejects will be lost"
                .to_string(),
        ),
        Some(fallback) if fallback.sink_type == SinkType::Nop => warnings.push(
            "Fallback sink is nop - messages the primary sink rejects will be lost".to_string(),
        ),
        Some(_) => {}
    }

    if dispatch.abort_timeout_ms == 0 {
        warnings.push("dispatch.abort_timeout_ms is 0 - shutdown drain is unbounded".to_string());
    }

    if !dispatch.instrumentation_enabled {
        warnings.push("Instrumentation disabled - no periodic stats dumps".to_string());
    }

    if dispatch.priority_levels < contracts::MsgPriority::COUNT {
        warnings.push(format!(
            "dispatch.priority_levels is {} - lower priorities share the last queue",
            dispatch.priority_levels
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Service: {}", summary.service);
            println!("  Priority levels: {}", summary.priority_levels);
            println!("  Sink: {}", summary.sink);
            println!(
                "  Fallback: {}",
                summary.fallback_sink.as_deref().unwrap_or("nop")
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SinkConfig;
    use std::io::Write;

    #[test]
    fn test_warnings_for_bare_config() {
        let config = MessagingConfig {
            sink: Some(SinkConfig::new("log", SinkType::Log)),
            ..Default::default()
        };
        let warnings = collect_warnings(&config);
        assert!(warnings.iter().any(|w| w.contains("No fallback sink")));
        assert!(warnings.iter().any(|w| w.contains("Instrumentation disabled")));
    }

    #[test]
    fn test_validate_missing_file() {
        let args = ValidateArgs {
            config: "/nonexistent/messaging.toml".into(),
            json: true,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_validate_good_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
name = "alerts"

[sink]
name = "primary"
sink_type = "log"

[fallback_sink]
name = "spool"
sink_type = "file"
"#
        )
        .unwrap();

        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(result.valid, "{:?}", result.error);
        let summary = result.summary.unwrap();
        assert_eq!(summary.service, "alerts");
        assert_eq!(summary.fallback_sink.as_deref(), Some("spool"));
    }
}
