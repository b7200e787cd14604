//! Serializable snapshots of counter state.
//!
//! The crate does not persist anything itself; an external persistence
//! collaborator serializes these types with any serde format and hands
//! them back on restore. Restoring re-runs the same validation used at
//! normal construction time and rejects a snapshot wholesale if its parts
//! disagree with each other ([`crate::error::CounterError::InconsistentState`]),
//! rather than partially trusting it.
//!
//! # Examples
//!
//! ```rust
//! use cronometri::calendar::{ClockDuration, DayAccountingModel};
//! use cronometri::counters::solo::SoloCounter;
//! use cronometri::counters::{CounterMode, DisplayStyle};
//! use cronometri::snapshot::SoloSnapshot;
//!
//! let timer = SoloCounter::new(
//!     CounterMode::Countdown,
//!     None,
//!     Some(ClockDuration::new(0, 10, 0).unwrap()),
//!     DayAccountingModel::Calendar365,
//!     DisplayStyle::default(),
//! )
//! .unwrap();
//!
//! let snapshot = SoloSnapshot::capture(&timer);
//! let json = serde_json::to_string(&snapshot).unwrap();
//!
//! let restored: SoloSnapshot = serde_json::from_str(&json).unwrap();
//! let timer = restored.restore(DisplayStyle::default()).unwrap();
//! assert_eq!(timer.display_text(), "0y 0mo 0d 00:10:00");
//! ```

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::calendar::{CalendarPeriod, ClockDuration, DayAccountingModel, SECONDS_PER_DAY};
use crate::counters::instance::InstanceCounter;
use crate::counters::solo::{RunState, SoloCounter};
use crate::counters::{CounterMode, DisplayStyle};
use crate::error::{CounterError, Result};

/// Persisted state of a stopwatch/countdown counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoloSnapshot {
    pub mode: CounterMode,
    pub model: DayAccountingModel,
    pub period_init: CalendarPeriod,
    pub duration_init: ClockDuration,
    pub period_passed: CalendarPeriod,
    pub duration_passed: ClockDuration,
    pub started: bool,
    pub overflowed: bool,
    pub positive: bool,
}

impl SoloSnapshot {
    /// Captures the current state of a live counter.
    pub fn capture(counter: &SoloCounter) -> Self {
        let (period_init, duration_init) = counter.initial();
        let (period_passed, duration_passed) = counter.passed();
        let run = counter.run_state();
        SoloSnapshot {
            mode: counter.mode(),
            model: counter.model(),
            period_init,
            duration_init,
            period_passed,
            duration_passed,
            started: run != RunState::NotStarted,
            overflowed: run == RunState::Overflowed,
            positive: counter.is_positive(),
        }
    }

    /// Rebuilds a counter, re-running construction-time validation plus
    /// the cross-field checks only a restore can violate.
    ///
    /// A previously started counter comes back paused; an overflowed one
    /// comes back overflowed (terminal until restart).
    pub fn restore(&self, style: DisplayStyle) -> Result<Arc<SoloCounter>> {
        if !matches!(self.mode, CounterMode::Stopwatch | CounterMode::Countdown) {
            return Err(CounterError::InconsistentState(format!(
                "mode {:?} is not a solo counter mode",
                self.mode
            )));
        }
        self.validate_parts()?;

        let run = if self.overflowed {
            RunState::Overflowed
        } else if self.started {
            RunState::Paused
        } else {
            RunState::NotStarted
        };
        Ok(SoloCounter::from_snapshot_parts(
            self.mode,
            self.model,
            self.period_init,
            self.duration_init,
            self.period_passed,
            self.duration_passed,
            run,
            self.positive,
            style,
        ))
    }

    fn validate_parts(&self) -> Result<()> {
        let inconsistent = |what: &str| CounterError::InconsistentState(what.to_string());

        for (label, period) in [("init", self.period_init), ("passed", self.period_passed)] {
            let normalized = period
                .normalize(self.model)
                .map_err(|e| CounterError::InconsistentState(format!("{label} period: {e}")))?;
            if normalized != period {
                return Err(CounterError::InconsistentState(format!(
                    "{label} period is not normalized"
                )));
            }
        }
        for duration in [self.duration_init, self.duration_passed] {
            ClockDuration::new(duration.hours, duration.minutes, duration.seconds)
                .map_err(|e| CounterError::InconsistentState(e.to_string()))?;
        }

        if self.mode == CounterMode::Countdown
            && self.period_init.is_zero()
            && self.duration_init.is_zero()
        {
            return Err(inconsistent("a countdown must start at one second or more"));
        }
        if self.mode == CounterMode::Stopwatch && !self.positive {
            return Err(inconsistent("a stopwatch can never be negative"));
        }
        if !self.started {
            if self.overflowed {
                return Err(inconsistent("overflowed but never started"));
            }
            if !self.positive {
                return Err(inconsistent("negative but never started"));
            }
            if self.period_passed != self.period_init || self.duration_passed != self.duration_init
            {
                return Err(inconsistent(
                    "never started but passed state differs from initial state",
                ));
            }
        }
        if self.overflowed {
            // The latch only trips when the next day rollover would not
            // normalize; anything else could still advance and must not
            // claim to be overflowed.
            if self.duration_passed.as_seconds() != SECONDS_PER_DAY - 1 {
                return Err(inconsistent(
                    "overflowed but the duration is not at the day boundary",
                ));
            }
            let next_day = CalendarPeriod {
                days: self.period_passed.days + 1,
                ..self.period_passed
            };
            if next_day.normalize(self.model).is_ok() {
                return Err(inconsistent(
                    "overflowed but the magnitudes could still advance",
                ));
            }
        }
        Ok(())
    }
}

/// Persisted state of a target-instant counter.
///
/// Only the target survives persistence; magnitudes and sign are derived
/// again on the first coordinated tick. The target's UTC offset is
/// re-cached on restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub mode: CounterMode,
    pub target: DateTime<FixedOffset>,
}

impl InstanceSnapshot {
    /// Captures the persistent state of a live counter.
    pub fn capture(counter: &InstanceCounter) -> Self {
        InstanceSnapshot {
            mode: counter.mode(),
            target: counter.target(),
        }
    }

    /// Rebuilds a counter, rejecting a mode that does not belong to a
    /// target-instant counter.
    pub fn restore(&self, style: DisplayStyle) -> Result<Arc<InstanceCounter>> {
        if !matches!(
            self.mode,
            CounterMode::ElapsedFrom | CounterMode::CountdownTill
        ) {
            return Err(CounterError::InconsistentState(format!(
                "mode {:?} is not an instance counter mode",
                self.mode
            )));
        }
        InstanceCounter::new(self.mode, self.target, style)
    }
}
