//! Core module shared by every counter kind.
//!
//! A counter, whatever its kind, owns three things:
//!
//! 1. a fixed [`CounterMode`] chosen at construction,
//! 2. a read-only [`DisplayStyle`] supplied by the embedding application
//!    (which unit range to show and how unit names are rendered), and
//! 3. a [`CounterCore`] holding the latest [`TimeUnitMagnitudes`], the sign,
//!    the rendered display string and the observer registry.
//!
//! Building the display string is a pure function of magnitudes + sign +
//! style and is implemented exactly once, in [`DisplayStyle::render`]; the
//! concrete counter kinds only ever feed new magnitudes into their core.

pub mod instance;
pub mod solo;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::calendar::{CalendarPeriod, ClockDuration};
use crate::observers::{CounterObserver, ObserverRegistry};

/// Which concrete counter behavior applies.
///
/// Fixed per counter instance: `Stopwatch` and `Countdown` belong to
/// [`solo::SoloCounter`], `ElapsedFrom` and `CountdownTill` to
/// [`instance::InstanceCounter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CounterMode {
    /// Counts up from a starting amount.
    Stopwatch,
    /// Counts down to zero, then past it.
    Countdown,
    /// Tracks time elapsed since a fixed instant.
    ElapsedFrom,
    /// Tracks time remaining until a fixed instant.
    CountdownTill,
}

/// The six calendar/clock units a counter decomposes its value into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeUnit {
    Years,
    Months,
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl TimeUnit {
    /// All units, largest first.
    pub const ALL: [TimeUnit; 6] = [
        TimeUnit::Years,
        TimeUnit::Months,
        TimeUnit::Days,
        TimeUnit::Hours,
        TimeUnit::Minutes,
        TimeUnit::Seconds,
    ];
}

/// Per-unit non-negative magnitudes of a counter value.
///
/// The sign of the overall value is tracked separately (`is_positive`);
/// regenerated wholesale on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeUnitMagnitudes {
    pub years: i64,
    pub months: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl TimeUnitMagnitudes {
    /// Builds magnitudes from a period/duration pair.
    pub fn from_parts(period: CalendarPeriod, duration: ClockDuration) -> Self {
        TimeUnitMagnitudes {
            years: period.years,
            months: period.months,
            days: period.days,
            hours: duration.hours,
            minutes: duration.minutes,
            seconds: duration.seconds,
        }
    }

    /// Magnitude of a single unit.
    pub fn get(&self, unit: TimeUnit) -> i64 {
        match unit {
            TimeUnit::Years => self.years,
            TimeUnit::Months => self.months,
            TimeUnit::Days => self.days,
            TimeUnit::Hours => self.hours,
            TimeUnit::Minutes => self.minutes,
            TimeUnit::Seconds => self.seconds,
        }
    }

    /// Returns `true` if every unit is zero.
    pub fn is_zero(&self) -> bool {
        TimeUnit::ALL.iter().all(|&u| self.get(u) == 0)
    }
}

/// Global allocator for counter identities.
static NEXT_COUNTER_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity of a counter, used by the coordinator registry
/// and carried in every observer notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CounterId(u64);

impl CounterId {
    pub(crate) fn next() -> Self {
        CounterId(NEXT_COUNTER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for CounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Labels used when rendering the calendar units of a display string.
///
/// Supplied by the embedding application (typically from a locale bundle);
/// the core consumes them verbatim and never interprets them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitNames {
    pub years: String,
    pub months: String,
    pub days: String,
}

impl Default for UnitNames {
    fn default() -> Self {
        UnitNames {
            years: "y".to_string(),
            months: "mo".to_string(),
            days: "d".to_string(),
        }
    }
}

/// Read-only display configuration of a counter.
///
/// `leading_unit` selects the largest unit that appears in the rendered
/// string; calendar units above it are suppressed (their magnitudes are
/// still tracked and still participate in overflow detection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayStyle {
    pub leading_unit: TimeUnit,
    pub names: UnitNames,
}

impl Default for DisplayStyle {
    fn default() -> Self {
        DisplayStyle {
            leading_unit: TimeUnit::Years,
            names: UnitNames::default(),
        }
    }
}

impl DisplayStyle {
    /// Builds the display string for a value.
    ///
    /// Pure function of magnitudes + sign + style; the single rendering
    /// algorithm shared by every counter kind. Calendar units render as
    /// `N<name>`, the clock part as zero-padded `HH:MM:SS` (truncated to
    /// the leading unit), and a negative value carries a `-` prefix.
    pub fn render(&self, magnitudes: &TimeUnitMagnitudes, is_positive: bool) -> String {
        let mut out = String::new();
        if !is_positive {
            out.push('-');
        }
        let show = |unit: TimeUnit| unit >= self.leading_unit;

        if show(TimeUnit::Years) {
            out.push_str(&format!("{}{} ", magnitudes.years, self.names.years));
        }
        if show(TimeUnit::Months) {
            out.push_str(&format!("{}{} ", magnitudes.months, self.names.months));
        }
        if show(TimeUnit::Days) {
            out.push_str(&format!("{}{} ", magnitudes.days, self.names.days));
        }
        if show(TimeUnit::Hours) {
            out.push_str(&format!("{:02}:", magnitudes.hours));
        }
        if show(TimeUnit::Minutes) {
            out.push_str(&format!("{:02}:", magnitudes.minutes));
        }
        out.push_str(&format!("{:02}", magnitudes.seconds));
        out
    }
}

/// Latest published value of a counter.
#[derive(Debug, Clone)]
struct DisplayState {
    magnitudes: TimeUnitMagnitudes,
    is_positive: bool,
    text: String,
    /// Whether `is_positive` is a valid baseline for transition detection.
    /// False on a fresh core (the first publish never counts as a sign
    /// transition); true once published or armed to a known sign.
    primed: bool,
}

/// Display-state and notification core shared by all counter kinds.
///
/// Holds the latest magnitudes, sign and rendered text under one lock so a
/// failure mid-tick can never leave them out of sync, and fires the three
/// independently-subscribable notifications: text-changed (every publish),
/// zero-crossing (once per sign transition) and overflow (latched, solo
/// counters only).
pub(crate) struct CounterCore {
    id: CounterId,
    mode: CounterMode,
    style: DisplayStyle,
    observers: ObserverRegistry,
    display: Mutex<DisplayState>,
}

impl CounterCore {
    pub(crate) fn new(mode: CounterMode, style: DisplayStyle) -> Self {
        CounterCore {
            id: CounterId::next(),
            mode,
            style,
            observers: ObserverRegistry::new(),
            display: Mutex::new(DisplayState {
                magnitudes: TimeUnitMagnitudes::default(),
                is_positive: true,
                text: String::new(),
                primed: false,
            }),
        }
    }

    pub(crate) fn id(&self) -> CounterId {
        self.id
    }

    pub(crate) fn mode(&self) -> CounterMode {
        self.mode
    }

    pub(crate) fn subscribe(&self, observer: Arc<dyn CounterObserver>) {
        self.observers.subscribe(observer);
    }

    /// Publishes a freshly computed value: rebuilds the display string,
    /// fires text-changed, and fires zero-crossing if the sign flipped
    /// relative to the previously published value.
    pub(crate) fn publish(&self, magnitudes: TimeUnitMagnitudes, is_positive: bool) {
        let (text, crossed) = {
            let mut state = self.display.lock();
            let crossed = state.primed && state.is_positive != is_positive;
            state.magnitudes = magnitudes;
            state.is_positive = is_positive;
            state.text = self.style.render(&magnitudes, is_positive);
            state.primed = true;
            (state.text.clone(), crossed)
        };
        self.observers.notify_text_changed(self.id, &text);
        if crossed {
            self.observers.notify_zero_crossed(self.id, is_positive);
        }
    }

    /// Replaces the published value without treating the change as a sign
    /// transition. Used when a counter is (re)armed to its initial state;
    /// the armed sign becomes the baseline, so the next publish with a
    /// flipped sign is a real transition.
    pub(crate) fn rearm(&self, magnitudes: TimeUnitMagnitudes, is_positive: bool) {
        let text = {
            let mut state = self.display.lock();
            state.magnitudes = magnitudes;
            state.is_positive = is_positive;
            state.text = self.style.render(&magnitudes, is_positive);
            state.primed = true;
            state.text.clone()
        };
        self.observers.notify_text_changed(self.id, &text);
    }

    /// Fires the latched overflow notification.
    pub(crate) fn notify_overflow(&self) {
        self.observers.notify_overflowed(self.id);
    }

    pub(crate) fn display_text(&self) -> String {
        self.display.lock().text.clone()
    }

    pub(crate) fn magnitudes(&self) -> TimeUnitMagnitudes {
        self.display.lock().magnitudes
    }

    pub(crate) fn is_positive(&self) -> bool {
        self.display.lock().is_positive
    }
}

impl fmt::Debug for CounterCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.display.lock();
        f.debug_struct("CounterCore")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("text", &state.text)
            .field("is_positive", &state.is_positive)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observers::recording::RecordingObserver;

    fn mags(y: i64, mo: i64, d: i64, h: i64, mi: i64, s: i64) -> TimeUnitMagnitudes {
        TimeUnitMagnitudes {
            years: y,
            months: mo,
            days: d,
            hours: h,
            minutes: mi,
            seconds: s,
        }
    }

    #[test]
    fn test_counter_ids_are_unique() {
        let a = CounterId::next();
        let b = CounterId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_render_full_range() {
        let style = DisplayStyle::default();
        let text = style.render(&mags(1, 2, 3, 4, 5, 6), true);
        assert_eq!(text, "1y 2mo 3d 04:05:06");
    }

    #[test]
    fn test_render_negative_sign() {
        let style = DisplayStyle::default();
        let text = style.render(&mags(0, 0, 0, 0, 0, 7), false);
        assert_eq!(text, "-0y 0mo 0d 00:00:07");
    }

    #[test]
    fn test_render_leading_unit_truncates() {
        let style = DisplayStyle {
            leading_unit: TimeUnit::Hours,
            ..DisplayStyle::default()
        };
        assert_eq!(style.render(&mags(1, 2, 3, 4, 5, 6), true), "04:05:06");

        let style = DisplayStyle {
            leading_unit: TimeUnit::Minutes,
            ..DisplayStyle::default()
        };
        assert_eq!(style.render(&mags(0, 0, 0, 0, 12, 34), true), "12:34");

        let style = DisplayStyle {
            leading_unit: TimeUnit::Seconds,
            ..DisplayStyle::default()
        };
        assert_eq!(style.render(&mags(0, 0, 0, 0, 0, 9), true), "09");
    }

    #[test]
    fn test_render_custom_names() {
        let style = DisplayStyle {
            leading_unit: TimeUnit::Days,
            names: UnitNames {
                days: " giorni".to_string(),
                ..UnitNames::default()
            },
        };
        assert_eq!(style.render(&mags(0, 0, 5, 1, 2, 3), true), "5 giorni 01:02:03");
    }

    #[test]
    fn test_publish_fires_text_changed() {
        let core = CounterCore::new(CounterMode::Stopwatch, DisplayStyle::default());
        let observer = Arc::new(RecordingObserver::default());
        core.subscribe(observer.clone());

        core.publish(mags(0, 0, 0, 0, 0, 1), true);
        core.publish(mags(0, 0, 0, 0, 0, 2), true);

        assert_eq!(observer.texts().len(), 2);
        assert_eq!(observer.zero_crossings(), 0);
    }

    #[test]
    fn test_publish_fires_zero_crossing_once_per_flip() {
        let core = CounterCore::new(CounterMode::Countdown, DisplayStyle::default());
        let observer = Arc::new(RecordingObserver::default());
        core.subscribe(observer.clone());

        core.publish(mags(0, 0, 0, 0, 0, 1), true);
        core.publish(mags(0, 0, 0, 0, 0, 0), true);
        core.publish(mags(0, 0, 0, 0, 0, 2), false);
        core.publish(mags(0, 0, 0, 0, 0, 3), false);

        assert_eq!(observer.zero_crossings(), 1);
    }

    #[test]
    fn test_first_publish_is_not_a_crossing() {
        let core = CounterCore::new(CounterMode::CountdownTill, DisplayStyle::default());
        let observer = Arc::new(RecordingObserver::default());
        core.subscribe(observer.clone());

        // First computed value is already negative: no transition yet.
        core.publish(mags(0, 0, 0, 0, 0, 5), false);
        assert_eq!(observer.zero_crossings(), 0);

        core.publish(mags(0, 0, 0, 0, 0, 5), true);
        assert_eq!(observer.zero_crossings(), 1);
    }

    #[test]
    fn test_flip_from_armed_baseline_is_a_crossing() {
        // Arming establishes a sign baseline: the very next publish with
        // the opposite sign is a real transition, even before any tick.
        let core = CounterCore::new(CounterMode::Countdown, DisplayStyle::default());
        let observer = Arc::new(RecordingObserver::default());
        core.subscribe(observer.clone());

        core.rearm(mags(0, 0, 0, 0, 0, 3), true);
        assert_eq!(observer.zero_crossings(), 0);

        core.publish(mags(0, 0, 0, 0, 0, 7), false);
        assert_eq!(observer.zero_crossings(), 1);
    }

    #[test]
    fn test_rearm_resets_transition_tracking() {
        let core = CounterCore::new(CounterMode::Countdown, DisplayStyle::default());
        let observer = Arc::new(RecordingObserver::default());
        core.subscribe(observer.clone());

        core.publish(mags(0, 0, 0, 0, 0, 2), false);
        core.rearm(mags(0, 0, 0, 0, 0, 3), true);
        assert_eq!(observer.zero_crossings(), 0);

        // Next flip after the rearm counts again.
        core.publish(mags(0, 0, 0, 0, 0, 1), true);
        core.publish(mags(0, 0, 0, 0, 0, 2), false);
        assert_eq!(observer.zero_crossings(), 1);
    }
}
