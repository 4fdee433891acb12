//! Layered error definitions
//!
//! Categorized by source: config / sink / general

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Sink Errors =====
    /// Sink start error
    #[error("sink '{sink_name}' start error: {message}")]
    SinkStart { sink_name: String, message: String },

    /// Sink send error
    #[error("sink '{sink_name}' send error: {message}")]
    SinkSend { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    /// Sink stop error
    #[error("sink '{sink_name}' stop error: {message}")]
    SinkStop { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink start error
    pub fn sink_start(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkStart {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink send error
    pub fn sink_send(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkSend {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink stop error
    pub fn sink_stop(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkStop {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_send_display() {
        let err = ContractError::sink_send("smtp", "relay refused");
        assert_eq!(err.to_string(), "sink 'smtp' send error: relay refused");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ContractError = io.into();
        assert!(matches!(err, ContractError::Io(_)));
    }
}
