//! Pipeline statistics and metrics.

use std::time::Duration;

use contracts::StatsSnapshot;
use observability::MessagingMetricsAggregator;

/// Why the service was stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// The producer ran out of messages
    #[default]
    Completed,
    /// Ctrl+C or SIGTERM
    Signal,
    /// `--timeout` expired
    Timeout,
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Service name
    pub service: String,

    /// Messages handed to the messenger
    pub submitted: u64,

    /// Lifetime counters read after the final drain
    pub totals: StatsSnapshot,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Why the run ended
    pub stop_reason: StopReason,

    /// Per-sample counter aggregation
    pub metrics: MessagingMetricsAggregator,
}

impl PipelineStats {
    /// Messages processed per second
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.totals.processed() as f64 / secs
        } else {
            0.0
        }
    }

    /// Submitted messages that were never taken off a queue
    ///
    /// Non-zero only when the drain hit its abort timeout.
    pub fn dropped(&self) -> u64 {
        self.submitted.saturating_sub(self.totals.processed())
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Messenger Statistics: {} ===\n", self.service);

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Stop reason: {:?}", self.stop_reason);
        println!("   ├─ Submitted: {}", self.submitted);
        println!("   ├─ Dropped at shutdown: {}", self.dropped());
        println!("   └─ Throughput: {:.2} msg/s", self.throughput());

        println!("\nDelivery");
        println!("   ├─ Sent: {}", self.totals.sent);
        println!("   ├─ Send errors: {}", self.totals.send_errors);
        println!("   ├─ Fallback sent: {}", self.totals.fallback_sent);
        println!("   ├─ Fallback errors: {}", self.totals.fallback_errors);
        println!("   └─ Lost: {}", self.totals.lost());

        println!("\n{}", self.metrics.summary());
    }
}
