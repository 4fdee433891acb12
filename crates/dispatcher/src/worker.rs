//! Dispatch loop - the single background worker of a message service

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use contracts::{DispatchConfig, Message, MessageSink};

use crate::messenger::Shared;

/// How many messages one `write` pass may take from a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Budget {
    Limited(usize),
    Unlimited,
}

impl Budget {
    fn allows(self, processed: usize) -> bool {
        match self {
            Self::Limited(max) => processed < max,
            Self::Unlimited => true,
        }
    }
}

/// Result of offering one message to a sink
#[derive(Debug)]
enum Delivery {
    Delivered,
    Declined,
    Fault(String),
}

/// Sinks handed back by a finished worker
///
/// The flags tell whether each sink already received `signal_stop`; they
/// stay false when the loop panicked before reaching it.
pub(crate) struct WorkerExit<P, F> {
    pub(crate) sink: P,
    pub(crate) fallback: F,
    pub(crate) sink_signalled: bool,
    pub(crate) fallback_signalled: bool,
}

/// Worker owning both sinks while the service runs
pub(crate) struct DispatchWorker<P, F> {
    shared: Arc<Shared>,
    config: DispatchConfig,
    sink: P,
    fallback: F,
    stop: CancellationToken,
    sink_signalled: bool,
    fallback_signalled: bool,
}

impl<P: MessageSink, F: MessageSink> DispatchWorker<P, F> {
    pub(crate) fn new(
        shared: Arc<Shared>,
        config: DispatchConfig,
        sink: P,
        fallback: F,
        stop: CancellationToken,
    ) -> Self {
        Self {
            shared,
            config,
            sink,
            fallback,
            stop,
            sink_signalled: false,
            fallback_signalled: false,
        }
    }

    /// Run until stopped, then hand the sinks back
    ///
    /// A panic escaping the loop body ends dispatch for this run; it is
    /// logged and the sinks are still returned.
    #[instrument(name = "dispatch_worker_loop", skip(self), fields(service = %self.shared.name))]
    pub(crate) async fn run(mut self) -> WorkerExit<P, F> {
        info!(service = %self.shared.name, "Dispatch worker started");

        if let Err(panic) = AssertUnwindSafe(self.spin()).catch_unwind().await {
            error!(
                service = %self.shared.name,
                severity = "emergency",
                error = %panic_message(panic.as_ref()),
                "Dispatch loop leaked panic, worker exiting"
            );
        }

        info!(service = %self.shared.name, "Dispatch worker stopped");
        WorkerExit {
            sink: self.sink,
            fallback: self.fallback,
            sink_signalled: self.sink_signalled,
            fallback_signalled: self.fallback_signalled,
        }
    }

    async fn spin(&mut self) {
        let poll = Duration::from_millis(self.config.poll_interval_ms);
        let dump_every = Duration::from_millis(self.config.instrumentation_interval_ms);
        let mut last_dump = Instant::now();

        while !self.stop.is_cancelled() {
            let mut budget = self.config.initial_budget;
            for level in 0..self.shared.queues.levels() {
                if self.stop.is_cancelled() {
                    break;
                }
                self.write(level, Budget::Limited(budget.max(1))).await;
                budget /= 2;
            }

            tokio::select! {
                _ = self.stop.cancelled() => {}
                _ = tokio::time::timeout(poll, self.shared.wake.notified()) => {}
            }

            if self.config.instrumentation_enabled && last_dump.elapsed() > dump_every {
                self.dump_stats();
                last_dump = Instant::now();
            }
        }

        debug!(service = %self.shared.name, pending = self.shared.queues.total_len(), "Stop requested, final drain");
        self.sink_signalled = true;
        self.sink.signal_stop().await;
        self.fallback_signalled = true;
        self.fallback.signal_stop().await;

        for level in 0..self.shared.queues.levels() {
            self.write(level, Budget::Unlimited).await;
        }

        if self.config.instrumentation_enabled {
            self.dump_stats();
        }
    }

    /// Drain one queue under a budget
    ///
    /// A limited pass stops taking messages once stop is requested; the
    /// final drain takes the rest. `abort_timeout_ms == 0` leaves the final
    /// drain unbounded.
    async fn write(&mut self, level: usize, budget: Budget) {
        let abort_after = (self.config.abort_timeout_ms > 0)
            .then(|| Duration::from_millis(self.config.abort_timeout_ms));
        let started = Instant::now();
        let mut processed = 0usize;

        while budget.allows(processed) {
            if budget != Budget::Unlimited && self.stop.is_cancelled() {
                break;
            }

            let Some(msg) = self.shared.queues.try_dequeue(level) else {
                break;
            };

            let timed_out = abort_after.is_some_and(|limit| started.elapsed() > limit);
            if self.stop.is_cancelled() && timed_out {
                let dropped = self.shared.queues.clear(level) + 1;
                error!(
                    service = %self.shared.name,
                    sink = %self.sink.name(),
                    level,
                    dropped,
                    timeout_ms = self.config.abort_timeout_ms,
                    "Write aborted on service shutdown: timed out"
                );
                observability::record_shutdown_abort(&self.shared.name, dropped);
                break;
            }

            match offer(&mut self.sink, &msg).await {
                Delivery::Delivered => {
                    self.shared.stats.inc_sent();
                    observability::record_delivery(self.sink.name(), true);
                }
                failure => {
                    self.shared.stats.inc_send_errors();
                    observability::record_delivery(self.sink.name(), false);
                    log_failure(self.sink.name(), &msg, &failure);
                    self.write_fallback(&msg).await;
                }
            }

            processed += 1;
        }

        if processed > 0 {
            debug!(service = %self.shared.name, level, processed, "Queue pass complete");
            observability::record_queue_depth(&self.shared.name, level, self.shared.queues.len(level));
        }
    }

    /// Second and last chance for a message
    async fn write_fallback(&mut self, msg: &Message) {
        match offer(&mut self.fallback, msg).await {
            Delivery::Delivered => {
                self.shared.stats.inc_fallback_sent();
                observability::record_delivery(self.fallback.name(), true);
            }
            failure => {
                self.shared.stats.inc_fallback_errors();
                observability::record_delivery(self.fallback.name(), false);
                log_failure(self.fallback.name(), msg, &failure);
            }
        }
    }

    fn dump_stats(&self) {
        let snapshot = self.shared.stats.take_interval();
        info!(
            service = %self.shared.name,
            sent = snapshot.sent,
            send_errors = snapshot.send_errors,
            fallback_sent = snapshot.fallback_sent,
            fallback_errors = snapshot.fallback_errors,
            "Messaging stats"
        );
        observability::record_stats_dump(&self.shared.name, &snapshot);
    }
}

/// Offer a message to a sink, converting errors and panics into `Fault`
async fn offer<S: MessageSink>(sink: &mut S, msg: &Message) -> Delivery {
    match AssertUnwindSafe(sink.send_msg(msg)).catch_unwind().await {
        Ok(Ok(true)) => Delivery::Delivered,
        Ok(Ok(false)) => Delivery::Declined,
        Ok(Err(e)) => Delivery::Fault(e.to_string()),
        Err(panic) => Delivery::Fault(format!("panic: {}", panic_message(panic.as_ref()))),
    }
}

fn log_failure(sink: &str, msg: &Message, failure: &Delivery) {
    match failure {
        Delivery::Fault(e) => error!(
            sink,
            message_id = %msg.id,
            error = %e,
            "Sink send leaked error"
        ),
        _ => error!(
            sink,
            message_id = %msg.id,
            "Sending message on sink has not succeeded"
        ),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
