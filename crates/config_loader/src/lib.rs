//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Apply `MESSAGING_*` environment overrides
//! - Validate the resulting `MessagingConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_with_env(Path::new("messaging.toml")).unwrap();
//! println!("Service: {}", config.name);
//! ```

mod env;
mod parser;
mod validator;

pub use contracts::MessagingConfig;
pub use env::{EnvOverrides, ENV_PREFIX};
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a configuration file
    ///
    /// Format follows the extension (.toml / .json).
    ///
    /// # Errors
    /// Unsupported extension, read failure, parse failure or validation
    /// failure.
    pub fn load_from_path(path: &Path) -> Result<MessagingConfig, ContractError> {
        Self::load(path, &EnvOverrides::default())
    }

    /// Like [`load_from_path`](Self::load_from_path), with `MESSAGING_*`
    /// environment variables applied before validation
    pub fn load_with_env(path: &Path) -> Result<MessagingConfig, ContractError> {
        Self::load(path, &EnvOverrides::gather()?)
    }

    /// Parse and validate configuration text
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<MessagingConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Validate an already constructed configuration
    pub fn validate(config: &MessagingConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    /// Serialize to TOML
    pub fn to_toml(config: &MessagingConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize to pretty JSON
    pub fn to_json(config: &MessagingConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    fn load(path: &Path, overrides: &EnvOverrides) -> Result<MessagingConfig, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        let mut config = parser::parse(&content, format)?;
        overrides.apply(&mut config);
        validator::validate(&config)?;
        Ok(config)
    }
}
