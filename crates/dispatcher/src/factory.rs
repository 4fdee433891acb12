//! Sink factory - builds sinks from configuration

use tracing::instrument;

use contracts::{ContractError, Message, MessageSink, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::sinks::{FileSink, LogSink, NetworkSink, NopSink};

/// Any sink the factory can build
pub enum ConfiguredSink {
    Log(LogSink),
    File(FileSink),
    Network(NetworkSink),
    Nop(NopSink),
}

impl Default for ConfiguredSink {
    fn default() -> Self {
        Self::Nop(NopSink::default())
    }
}

/// Create a sink from configuration
#[instrument(
    name = "dispatcher_create_sink",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
pub async fn create_sink(config: &SinkConfig) -> Result<ConfiguredSink, DispatcherError> {
    match config.sink_type {
        SinkType::Log => Ok(ConfiguredSink::Log(LogSink::new(&config.name))),
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(ConfiguredSink::File(sink))
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            Ok(ConfiguredSink::Network(sink))
        }
        SinkType::Nop => Ok(ConfiguredSink::Nop(NopSink::new(&config.name))),
    }
}

macro_rules! each_sink {
    ($self:expr, $sink:ident => $body:expr) => {
        match $self {
            ConfiguredSink::Log($sink) => $body,
            ConfiguredSink::File($sink) => $body,
            ConfiguredSink::Network($sink) => $body,
            ConfiguredSink::Nop($sink) => $body,
        }
    };
}

impl MessageSink for ConfiguredSink {
    fn name(&self) -> &str {
        each_sink!(self, s => s.name())
    }

    async fn start(&mut self) -> Result<(), ContractError> {
        each_sink!(self, s => s.start().await)
    }

    async fn signal_stop(&mut self) {
        each_sink!(self, s => s.signal_stop().await)
    }

    async fn wait_for_complete_stop(&mut self) -> Result<(), ContractError> {
        each_sink!(self, s => s.wait_for_complete_stop().await)
    }

    async fn send_msg(&mut self, msg: &Message) -> Result<bool, ContractError> {
        each_sink!(self, s => s.send_msg(msg).await)
    }
}
