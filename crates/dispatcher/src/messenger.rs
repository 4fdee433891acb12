//! Messenger - producer-facing handle of a message service

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::trace;

use contracts::{Message, StatsSnapshot};

use crate::metrics::DispatchStats;
use crate::queue::PriorityQueueBank;

/// Lifecycle state of a message service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Inactive,
    Starting,
    Running,
    Stopping,
}

impl ServiceState {
    fn as_u8(self) -> u8 {
        match self {
            Self::Inactive => 0,
            Self::Starting => 1,
            Self::Running => 2,
            Self::Stopping => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Starting,
            2 => Self::Running,
            3 => Self::Stopping,
            _ => Self::Inactive,
        }
    }
}

/// State shared between the service, its worker and its producers
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) name: String,
    state: AtomicU8,
    pub(crate) queues: PriorityQueueBank,
    pub(crate) wake: Notify,
    pub(crate) stats: DispatchStats,
}

impl Shared {
    pub(crate) fn new(name: String, levels: usize) -> Self {
        Self {
            name,
            state: AtomicU8::new(ServiceState::Inactive.as_u8()),
            queues: PriorityQueueBank::new(levels),
            wake: Notify::new(),
            stats: DispatchStats::new(),
        }
    }

    pub(crate) fn state(&self) -> ServiceState {
        ServiceState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: ServiceState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Move from `from` to `to`; returns the observed state on failure
    pub(crate) fn transition(&self, from: ServiceState, to: ServiceState) -> Result<(), ServiceState> {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(ServiceState::from_u8)
    }
}

/// Cloneable handle used by producers to submit messages
///
/// Submission is fire-and-forget: callers never observe delivery errors.
#[derive(Debug, Clone)]
pub struct Messenger {
    shared: Arc<Shared>,
}

impl Messenger {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Service name
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Current lifecycle state
    pub fn state(&self) -> ServiceState {
        self.shared.state()
    }

    /// True while the service accepts messages
    pub fn is_running(&self) -> bool {
        self.state() == ServiceState::Running
    }

    /// Queue a message for delivery
    ///
    /// No-op unless the service is running. The priority ordinal is clamped
    /// to the slowest queue when it exceeds the configured levels.
    pub fn send_msg(&self, msg: Message) {
        if !self.is_running() {
            trace!(service = %self.shared.name, message_id = %msg.id, "Service not running, message ignored");
            return;
        }

        let priority = msg.priority;
        let queue = self.shared.queues.enqueue(priority.ordinal(), msg);
        self.shared.wake.notify_one();

        observability::record_message_submitted(&self.shared.name, priority);
        trace!(service = %self.shared.name, %priority, queue, "Message queued");
    }

    /// Messages waiting across all queues
    pub fn pending(&self) -> usize {
        self.shared.queues.total_len()
    }

    /// Lifetime delivery counters
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.totals()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::MsgPriority;

    #[test]
    fn test_state_round_trip() {
        for state in [
            ServiceState::Inactive,
            ServiceState::Starting,
            ServiceState::Running,
            ServiceState::Stopping,
        ] {
            assert_eq!(ServiceState::from_u8(state.as_u8()), state);
        }
    }

    #[test]
    fn test_transition_rejects_wrong_state() {
        let shared = Shared::new("svc".into(), 3);
        assert_eq!(
            shared.transition(ServiceState::Running, ServiceState::Stopping),
            Err(ServiceState::Inactive)
        );
        assert!(shared
            .transition(ServiceState::Inactive, ServiceState::Starting)
            .is_ok());
        assert_eq!(shared.state(), ServiceState::Starting);
    }

    #[test]
    fn test_send_while_inactive_is_noop() {
        let messenger = Messenger::new(Arc::new(Shared::new("svc".into(), 3)));
        messenger.send_msg(Message::new(MsgPriority::Urgent, "s", "b"));
        assert_eq!(messenger.pending(), 0);
        assert!(messenger.stats().is_empty());
    }

    #[test]
    fn test_send_while_running_clamps_priority() {
        let shared = Arc::new(Shared::new("svc".into(), 2));
        shared.set_state(ServiceState::Running);
        let messenger = Messenger::new(Arc::clone(&shared));

        messenger.send_msg(Message::new(MsgPriority::BelowNormal, "slow", ""));
        messenger.send_msg(Message::new(MsgPriority::Urgent, "fast", ""));

        assert_eq!(shared.queues.len(0), 1);
        assert_eq!(shared.queues.len(1), 1);
        assert_eq!(shared.queues.try_dequeue(1).unwrap().subject, "slow");
    }
}
