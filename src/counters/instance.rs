//! Target-instant counter: the difference between "now" and a fixed zoned
//! instant, decomposed into civil calendar units.
//!
//! Unlike [`super::solo::SoloCounter`] an instance counter never ticks on
//! its own; the [`crate::coordinator::Coordinator`] invokes
//! [`InstanceCounter::recompute`] once per cadence tick, handing every
//! registered counter the identical "now".

use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, Offset, Timelike};

use crate::calendar::gregorian_days_in_month;
use crate::counters::{CounterCore, CounterId, CounterMode, DisplayStyle, TimeUnitMagnitudes};
use crate::error::{CounterError, Result};
use crate::observers::CounterObserver;

/// A counter tracking the civil-calendar distance to a fixed target
/// instant.
///
/// Sign convention: for `CountdownTill`, positive means the target is in
/// the future; for `ElapsedFrom`, positive means the target is in the
/// past. A sign flip relative to the previous tick fires the zero-crossing
/// notification.
///
/// # Examples
///
/// ```rust
/// use chrono::DateTime;
/// use cronometri::counters::instance::InstanceCounter;
/// use cronometri::counters::{CounterMode, DisplayStyle};
///
/// let launch = DateTime::parse_from_rfc3339("2030-01-01T00:00:00+01:00").unwrap();
/// let counter =
///     InstanceCounter::new(CounterMode::CountdownTill, launch, DisplayStyle::default())
///         .unwrap();
///
/// let now = DateTime::parse_from_rfc3339("2029-12-31T23:59:50+01:00").unwrap();
/// counter.recompute(now);
/// assert_eq!(counter.display_text(), "0y 0mo 0d 00:00:10");
/// ```
pub struct InstanceCounter {
    core: CounterCore,
    target: DateTime<FixedOffset>,
    /// UTC offset of the target, cached at construction/restore so a
    /// DST-type shift of "now" is detectable per tick.
    target_offset_seconds: i32,
}

impl InstanceCounter {
    /// Creates a target-instant counter. `mode` must be `ElapsedFrom` or
    /// `CountdownTill`.
    pub fn new(
        mode: CounterMode,
        target: DateTime<FixedOffset>,
        style: DisplayStyle,
    ) -> Result<Arc<Self>> {
        if !matches!(mode, CounterMode::ElapsedFrom | CounterMode::CountdownTill) {
            return Err(CounterError::InvalidArgument(
                "instance counters support ElapsedFrom and CountdownTill modes only",
            ));
        }
        Ok(Arc::new(InstanceCounter {
            core: CounterCore::new(mode, style),
            target,
            target_offset_seconds: target.offset().fix().local_minus_utc(),
        }))
    }

    pub fn id(&self) -> CounterId {
        self.core.id()
    }

    pub fn mode(&self) -> CounterMode {
        self.core.mode()
    }

    /// The fixed target instant.
    pub fn target(&self) -> DateTime<FixedOffset> {
        self.target
    }

    pub fn display_text(&self) -> String {
        self.core.display_text()
    }

    pub fn magnitudes(&self) -> TimeUnitMagnitudes {
        self.core.magnitudes()
    }

    pub fn is_positive(&self) -> bool {
        self.core.is_positive()
    }

    /// Subscribes an observer to this counter's notifications.
    pub fn subscribe(&self, observer: Arc<dyn CounterObserver>) {
        self.core.subscribe(observer);
    }

    /// Recomputes the counter against `now`. The only mutator; invoked by
    /// the coordinator once per cadence tick.
    ///
    /// If the UTC offset of `now` differs from the target's cached offset
    /// (a DST-type shift), `now` is re-expressed in the target's offset
    /// first, so the reported units measure civil-calendar distance rather
    /// than raw instant distance.
    pub fn recompute(&self, now: DateTime<FixedOffset>) {
        let now = if now.offset().fix().local_minus_utc() != self.target_offset_seconds {
            now.with_timezone(self.target.offset())
        } else {
            now
        };

        let now_civil = now.naive_local();
        let target_civil = self.target.naive_local();
        let target_ahead = now_civil <= target_civil;
        let magnitudes = if target_ahead {
            civil_difference(now_civil, target_civil)
        } else {
            civil_difference(target_civil, now_civil)
        };
        let positive = match self.core.mode() {
            CounterMode::CountdownTill => target_ahead,
            // ElapsedFrom: positive while the target lies in the past.
            _ => !target_ahead,
        };

        self.core.publish(magnitudes, positive);
    }
}

/// Field-wise civil difference `later - earlier`, `earlier <= later`.
///
/// Borrows run through the fixed Gregorian table (February 28, no
/// leap-year special casing) so the month count is corrected for
/// day-of-month mismatch the same way period normalization does it.
fn civil_difference(earlier: NaiveDateTime, later: NaiveDateTime) -> TimeUnitMagnitudes {
    let mut seconds = later.second() as i64 - earlier.second() as i64;
    let mut minutes = later.minute() as i64 - earlier.minute() as i64;
    let mut hours = later.hour() as i64 - earlier.hour() as i64;
    let mut days = later.day() as i64 - earlier.day() as i64;
    let mut months = later.month() as i64 - earlier.month() as i64;
    let mut years = later.year() as i64 - earlier.year() as i64;

    if seconds < 0 {
        seconds += 60;
        minutes -= 1;
    }
    if minutes < 0 {
        minutes += 60;
        hours -= 1;
    }
    if hours < 0 {
        hours += 24;
        days -= 1;
    }
    // Day-of-month mismatch: borrow whole months off the table, walking
    // backwards from the month preceding `later`.
    let mut borrow_index = later.month() as i64 - 2; // month0 of the previous month
    while days < 0 {
        days += gregorian_days_in_month(borrow_index);
        borrow_index -= 1;
        months -= 1;
    }
    while months < 0 {
        months += 12;
        years -= 1;
    }

    TimeUnitMagnitudes {
        years,
        months,
        days,
        hours,
        minutes,
        seconds,
    }
}

impl std::fmt::Debug for InstanceCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceCounter")
            .field("id", &self.core.id())
            .field("mode", &self.core.mode())
            .field("target", &self.target)
            .field("text", &self.display_text())
            .finish()
    }
}
