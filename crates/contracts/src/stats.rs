//! StatsSnapshot - dispatcher counters as seen by a stats dump

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Values of the four delivery counters at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Messages delivered by the primary sink
    pub sent: u64,
    /// Primary sink declines and faults
    pub send_errors: u64,
    /// Messages delivered by the fallback sink
    pub fallback_sent: u64,
    /// Fallback sink declines and faults
    pub fallback_errors: u64,
}

impl StatsSnapshot {
    /// Messages handed to the fallback sink
    pub fn fallback_attempts(&self) -> u64 {
        self.fallback_sent + self.fallback_errors
    }

    /// Messages taken off the queues
    pub fn processed(&self) -> u64 {
        self.sent + self.send_errors
    }

    /// Messages that reached no sink
    pub fn lost(&self) -> u64 {
        self.fallback_errors
    }

    /// True when every counter is zero
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Counter growth between an earlier reading and this one
    pub fn since(&self, earlier: &StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            sent: self.sent.saturating_sub(earlier.sent),
            send_errors: self.send_errors.saturating_sub(earlier.send_errors),
            fallback_sent: self.fallback_sent.saturating_sub(earlier.fallback_sent),
            fallback_errors: self.fallback_errors.saturating_sub(earlier.fallback_errors),
        }
    }
}

impl Add for StatsSnapshot {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            sent: self.sent + rhs.sent,
            send_errors: self.send_errors + rhs.send_errors,
            fallback_sent: self.fallback_sent + rhs.fallback_sent,
            fallback_errors: self.fallback_errors + rhs.fallback_errors,
        }
    }
}

impl AddAssign for StatsSnapshot {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}
