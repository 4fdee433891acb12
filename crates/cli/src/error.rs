//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Malformed input line
    #[error("Invalid input on line {line}: {message}")]
    InvalidInput { line: usize, message: String },

    /// Service failed while running or stopping
    #[error("Service '{service}' failed: {message}")]
    Service { service: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_input(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            line,
            message: message.into(),
        }
    }

    pub fn service(service: impl Into<String>, message: impl ToString) -> Self {
        Self::Service {
            service: service.into(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
