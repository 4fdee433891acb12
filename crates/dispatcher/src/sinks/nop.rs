//! NopSink - accepts and discards

use contracts::{ContractError, Message, MessageSink};
use tracing::trace;

/// Sink that reports every message as delivered without doing anything
///
/// Default fallback when none is configured.
#[derive(Debug, Clone)]
pub struct NopSink {
    name: String,
}

impl NopSink {
    /// Create a new NopSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for NopSink {
    fn default() -> Self {
        Self::new("nop")
    }
}

impl MessageSink for NopSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn signal_stop(&mut self) {}

    async fn wait_for_complete_stop(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn send_msg(&mut self, msg: &Message) -> Result<bool, ContractError> {
        trace!(sink = %self.name, message_id = %msg.id, "Discarded");
        Ok(true)
    }
}
