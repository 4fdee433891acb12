//! Delivery counters for observability

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::StatsSnapshot;

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    send_errors: AtomicU64,
    fallback_sent: AtomicU64,
    fallback_errors: AtomicU64,
}

impl Counters {
    fn load(&self) -> StatsSnapshot {
        StatsSnapshot {
            sent: self.sent.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            fallback_sent: self.fallback_sent.load(Ordering::Relaxed),
            fallback_errors: self.fallback_errors.load(Ordering::Relaxed),
        }
    }

    fn swap_zero(&self) -> StatsSnapshot {
        StatsSnapshot {
            sent: self.sent.swap(0, Ordering::Relaxed),
            send_errors: self.send_errors.swap(0, Ordering::Relaxed),
            fallback_sent: self.fallback_sent.swap(0, Ordering::Relaxed),
            fallback_errors: self.fallback_errors.swap(0, Ordering::Relaxed),
        }
    }
}

/// Delivery counters of one message service
///
/// Only the dispatch worker increments; the interval set is read-and-reset
/// by each stats dump, the lifetime set is never reset.
#[derive(Debug, Default)]
pub struct DispatchStats {
    interval: Counters,
    lifetime: Counters,
}

impl DispatchStats {
    /// Create new stats instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Primary sink delivered a message
    pub(crate) fn inc_sent(&self) {
        self.interval.sent.fetch_add(1, Ordering::Relaxed);
        self.lifetime.sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Primary sink declined or faulted
    pub(crate) fn inc_send_errors(&self) {
        self.interval.send_errors.fetch_add(1, Ordering::Relaxed);
        self.lifetime.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Fallback sink delivered a message
    pub(crate) fn inc_fallback_sent(&self) {
        self.interval.fallback_sent.fetch_add(1, Ordering::Relaxed);
        self.lifetime.fallback_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Fallback sink declined or faulted
    pub(crate) fn inc_fallback_errors(&self) {
        self.interval.fallback_errors.fetch_add(1, Ordering::Relaxed);
        self.lifetime.fallback_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Counters accumulated since the last dump, without resetting them
    pub fn interval(&self) -> StatsSnapshot {
        self.interval.load()
    }

    /// Read and reset the interval counters
    pub fn take_interval(&self) -> StatsSnapshot {
        self.interval.swap_zero()
    }

    /// Counters accumulated since the service was built
    pub fn totals(&self) -> StatsSnapshot {
        self.lifetime.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_interval_resets_only_interval() {
        let stats = DispatchStats::new();
        stats.inc_sent();
        stats.inc_sent();
        stats.inc_send_errors();
        stats.inc_fallback_errors();

        let taken = stats.take_interval();
        assert_eq!(taken.sent, 2);
        assert_eq!(taken.send_errors, 1);
        assert_eq!(taken.fallback_errors, 1);
        assert!(stats.interval().is_empty());

        let totals = stats.totals();
        assert_eq!(totals, taken);
    }

    #[test]
    fn test_concurrent_increments() {
        let stats = std::sync::Arc::new(DispatchStats::new());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let stats = std::sync::Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.inc_fallback_sent();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        assert_eq!(stats.totals().fallback_sent, 4000);
    }
}
