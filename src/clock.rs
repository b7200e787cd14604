//! Time sources for the coordinator and for target-instant counters.
//!
//! The coordinator samples "now" exactly once per cadence tick through a
//! [`Clock`], so tests (and deterministic consumers) can inject their own
//! source instead of the system clock.

use chrono::{DateTime, Duration, FixedOffset, Local};
use parking_lot::Mutex;

/// Source of the zoned "now" used when recomputing target-instant counters.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// The local system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock that only moves when told to.
///
/// Useful in tests and in hosts that drive time themselves (replays,
/// simulations).
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        ManualClock {
            now: Mutex::new(start),
        }
    }

    /// Replaces the current instant.
    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.now.lock() = now;
    }

    /// Moves the clock forward (or backward, with a negative duration).
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock()
    }
}
