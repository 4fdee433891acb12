//! Dispatcher error types

use thiserror::Error;

use crate::messenger::ServiceState;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// No primary sink configured
    #[error("message service '{service}': sink is not set")]
    MissingSink { service: String },

    /// Lifecycle call made in the wrong state
    #[error("message service '{service}' cannot {operation} while {state:?}")]
    InvalidState {
        service: String,
        operation: &'static str,
        state: ServiceState,
    },

    /// Sinks were lost with a crashed worker
    #[error("message service '{service}': sinks are unavailable after a worker crash")]
    SinkUnavailable { service: String },

    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Sink failed to start
    #[error("failed to start sink '{name}': {source}")]
    SinkStart {
        name: String,
        #[source]
        source: contracts::ContractError,
    },

    /// Dispatch worker terminated abnormally
    #[error("dispatch worker of '{service}' panicked: {message}")]
    WorkerPanicked { service: String, message: String },

    /// Sink error (from contract)
    #[error("sink error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(
        service: impl Into<String>,
        operation: &'static str,
        state: ServiceState,
    ) -> Self {
        Self::InvalidState {
            service: service.into(),
            operation,
            state,
        }
    }
}
