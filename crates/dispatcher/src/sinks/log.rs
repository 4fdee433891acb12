//! LogSink - logs message summary via tracing

use contracts::{ContractError, Message, MessageSink};
use tracing::{info, instrument};

/// Sink that logs message summaries for debugging
pub struct LogSink {
    name: String,
    stopping: bool,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stopping: false,
        }
    }

    fn log_message_summary(&self, msg: &Message) {
        info!(
            sink = %self.name,
            message_id = %msg.id,
            priority = %msg.priority,
            from = msg.from.as_deref().unwrap_or("-"),
            recipients = msg.to.len(),
            subject = %msg.subject,
            body_len = msg.body.len(),
            stopping = self.stopping,
            "Message received"
        );
    }
}

impl MessageSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_sink_start", skip(self))]
    async fn start(&mut self) -> Result<(), ContractError> {
        self.stopping = false;
        Ok(())
    }

    async fn signal_stop(&mut self) {
        self.stopping = true;
    }

    #[instrument(name = "log_sink_stop", skip(self))]
    async fn wait_for_complete_stop(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }

    #[instrument(
        name = "log_sink_send",
        skip(self, msg),
        fields(sink = %self.name, message_id = %msg.id)
    )]
    async fn send_msg(&mut self, msg: &Message) -> Result<bool, ContractError> {
        self.log_message_summary(msg);
        Ok(true)
    }
}
