//! MessageSink trait - dispatcher output interface
//!
//! Defines the abstract delivery capability used for both the primary and
//! the fallback path.

use crate::{ContractError, Message};

/// Delivery capability
///
/// All sink implementations must implement this trait.
#[trait_variant::make(MessageSink: Send)]
pub trait LocalMessageSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Acquire resources before the first delivery
    async fn start(&mut self) -> Result<(), ContractError>;

    /// Request stop; deliveries may still arrive until the final drain ends
    async fn signal_stop(&mut self);

    /// Flush and release resources
    async fn wait_for_complete_stop(&mut self) -> Result<(), ContractError>;

    /// Deliver one message
    ///
    /// `Ok(true)` means delivered, `Ok(false)` means the sink declined it.
    ///
    /// # Errors
    /// Returns a fault (should include context)
    async fn send_msg(&mut self, msg: &Message) -> Result<bool, ContractError>;
}
