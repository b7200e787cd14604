//! Self-contained stopwatch and countdown counter.
//!
//! A [`SoloCounter`] owns its whole life cycle: an immutable starting
//! amount, the live amount, an explicit run-state machine and an internal
//! one-per-second driver thread that only exists while the counter is
//! running. A countdown keeps ticking past zero: the sign flips once and
//! the magnitude grows again.
//!
//! # Run states
//!
//! ```text
//! NotStarted ──start──► Running ◄──start── Paused
//!                          │  └──pause──────►│
//!                          │                  │
//!                          └──(year limit)──► Overflowed   (terminal)
//!                                                  │
//!                            restart ◄─────────────┘
//! ```
//!
//! `Overflowed` is terminal until an explicit [`SoloCounter::restart`];
//! illegal transitions are simply absorbed as no-ops.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::calendar::{CalendarPeriod, ClockDuration, DayAccountingModel, SECONDS_PER_DAY};
use crate::counters::{CounterCore, CounterId, CounterMode, DisplayStyle, TimeUnitMagnitudes};
use crate::error::{CounterError, Result};
use crate::observers::CounterObserver;

/// One cadence period.
const CADENCE: Duration = Duration::from_secs(1);

/// Life-cycle state of a [`SoloCounter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Never started since construction or the last restart.
    NotStarted,
    /// The driver is ticking once per second.
    Running,
    /// Started at least once, currently not ticking.
    Paused,
    /// The year count hit the representable limit. Terminal until restart.
    Overflowed,
}

struct SoloState {
    period_passed: CalendarPeriod,
    duration_passed: ClockDuration,
    run: RunState,
    positive: bool,
    /// Bumped on every start/pause/restart; a driver whose epoch no longer
    /// matches winds down within one cadence period.
    epoch: u64,
}

enum TickOutcome {
    Published(TimeUnitMagnitudes, bool),
    Overflowed,
}

/// A stopwatch ([`CounterMode::Stopwatch`]) or countdown timer
/// ([`CounterMode::Countdown`]).
///
/// # Examples
///
/// ```rust
/// use cronometri::calendar::{ClockDuration, DayAccountingModel};
/// use cronometri::counters::solo::SoloCounter;
/// use cronometri::counters::{CounterMode, DisplayStyle};
///
/// let timer = SoloCounter::new(
///     CounterMode::Countdown,
///     None,
///     Some(ClockDuration::new(0, 5, 0).unwrap()),
///     DayAccountingModel::Fixed360,
///     DisplayStyle::default(),
/// )
/// .unwrap();
///
/// assert_eq!(timer.display_text(), "0y 0mo 0d 00:05:00");
/// timer.start(); // ticks once per second until paused
/// timer.pause();
/// ```
pub struct SoloCounter {
    core: CounterCore,
    model: DayAccountingModel,
    period_init: CalendarPeriod,
    duration_init: ClockDuration,
    state: Mutex<SoloState>,
    wakeup: Condvar,
}

impl SoloCounter {
    /// Creates a stopwatch or countdown counter.
    ///
    /// `mode` must be `Stopwatch` or `Countdown`. For a countdown at least
    /// one of `init_period`/`init_duration` must be given and the total
    /// must be one second or more. The initial period is normalized under
    /// `model`; normalization failures surface as [`CounterError::Overflow`].
    pub fn new(
        mode: CounterMode,
        init_period: Option<CalendarPeriod>,
        init_duration: Option<ClockDuration>,
        model: DayAccountingModel,
        style: DisplayStyle,
    ) -> Result<Arc<Self>> {
        if !matches!(mode, CounterMode::Stopwatch | CounterMode::Countdown) {
            return Err(CounterError::InvalidArgument(
                "solo counters support Stopwatch and Countdown modes only",
            ));
        }
        if mode == CounterMode::Countdown && init_period.is_none() && init_duration.is_none() {
            return Err(CounterError::InvalidArgument(
                "a countdown needs an initial period or duration",
            ));
        }
        let period_init = init_period.unwrap_or(CalendarPeriod::ZERO).normalize(model)?;
        let duration_init = init_duration.unwrap_or(ClockDuration::ZERO);
        if mode == CounterMode::Countdown && period_init.is_zero() && duration_init.is_zero() {
            return Err(CounterError::InvalidArgument(
                "a countdown must start at one second or more",
            ));
        }

        let counter = Arc::new(SoloCounter {
            core: CounterCore::new(mode, style),
            model,
            period_init,
            duration_init,
            state: Mutex::new(SoloState {
                period_passed: period_init,
                duration_passed: duration_init,
                run: RunState::NotStarted,
                positive: true,
                epoch: 0,
            }),
            wakeup: Condvar::new(),
        });
        counter.core.rearm(
            TimeUnitMagnitudes::from_parts(period_init, duration_init),
            true,
        );
        Ok(counter)
    }

    /// Rebuilds a counter from persisted state. Caller has already
    /// validated the parts; see [`crate::snapshot::SoloSnapshot::restore`].
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_snapshot_parts(
        mode: CounterMode,
        model: DayAccountingModel,
        period_init: CalendarPeriod,
        duration_init: ClockDuration,
        period_passed: CalendarPeriod,
        duration_passed: ClockDuration,
        run: RunState,
        positive: bool,
        style: DisplayStyle,
    ) -> Arc<Self> {
        let counter = Arc::new(SoloCounter {
            core: CounterCore::new(mode, style),
            model,
            period_init,
            duration_init,
            state: Mutex::new(SoloState {
                period_passed,
                duration_passed,
                run,
                positive,
                epoch: 0,
            }),
            wakeup: Condvar::new(),
        });
        counter.core.rearm(
            TimeUnitMagnitudes::from_parts(period_passed, duration_passed),
            positive,
        );
        counter
    }

    pub fn id(&self) -> CounterId {
        self.core.id()
    }

    pub fn mode(&self) -> CounterMode {
        self.core.mode()
    }

    pub fn model(&self) -> DayAccountingModel {
        self.model
    }

    pub fn run_state(&self) -> RunState {
        self.state.lock().run
    }

    /// The immutable starting amount.
    pub fn initial(&self) -> (CalendarPeriod, ClockDuration) {
        (self.period_init, self.duration_init)
    }

    /// The live amount.
    pub fn passed(&self) -> (CalendarPeriod, ClockDuration) {
        let s = self.state.lock();
        (s.period_passed, s.duration_passed)
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

    /// Starts ticking. A no-op if already running or overflowed.
    pub fn start(self: &Arc<Self>) {
        let mut s = self.state.lock();
        match s.run {
            RunState::NotStarted | RunState::Paused => {
                s.run = RunState::Running;
                s.epoch += 1;
                let epoch = s.epoch;
                let counter = Arc::clone(self);
                drop(s);
                std::thread::spawn(move || counter.drive(epoch));
            }
            RunState::Running | RunState::Overflowed => {}
        }
    }

    /// Stops ticking. A no-op if not running.
    pub fn pause(&self) {
        let mut s = self.state.lock();
        if s.run == RunState::Running {
            s.run = RunState::Paused;
            s.epoch += 1;
            self.wakeup.notify_all();
        }
    }

    /// Resets the live amount to the starting amount, clears the overflow
    /// latch and re-arms the not-yet-started display state. A no-op if the
    /// counter was never started.
    pub fn restart(&self) {
        let mags = {
            let mut s = self.state.lock();
            if s.run == RunState::NotStarted {
                return;
            }
            s.run = RunState::NotStarted;
            s.epoch += 1;
            s.period_passed = self.period_init;
            s.duration_passed = self.duration_init;
            s.positive = true;
            self.wakeup.notify_all();
            TimeUnitMagnitudes::from_parts(s.period_passed, s.duration_passed)
        };
        self.core.rearm(mags, true);
    }

    /// Manually corrects the live amount by `seconds`.
    ///
    /// In stopwatch mode (and in a countdown past zero) `add = true` grows
    /// the magnitude and `add = false` shrinks it, floored at zero. In a
    /// countdown before zero the rule inverts: adding shrinks the remaining
    /// time and may cross zero (flipping the sign and keeping the absolute
    /// remainder), subtracting grows it.
    ///
    /// Returns `false` and leaves every field untouched if the counter has
    /// overflowed or if the corrected period would not normalize.
    pub fn correct(&self, seconds: u64, add: bool) -> bool {
        let Ok(n) = i64::try_from(seconds) else {
            return false;
        };
        let outcome = {
            let mut s = self.state.lock();
            if s.run == RunState::Overflowed {
                return false;
            }
            let counting_up = self.core.mode() == CounterMode::Stopwatch || !s.positive;
            let total = s.period_passed.total_days(self.model) * SECONDS_PER_DAY
                + s.duration_passed.as_seconds();
            let (new_total, crossed) = if counting_up {
                if add {
                    (total + n, false)
                } else {
                    ((total - n).max(0), false)
                }
            } else if add {
                let t = total - n;
                if t < 0 {
                    (-t, true)
                } else {
                    (t, false)
                }
            } else {
                (total + n, false)
            };

            let raw = CalendarPeriod {
                years: 0,
                months: 0,
                days: new_total / SECONDS_PER_DAY,
            };
            let Ok(period) = raw.normalize(self.model) else {
                return false;
            };
            s.period_passed = period;
            s.duration_passed = ClockDuration::from_day_seconds(new_total % SECONDS_PER_DAY);
            if crossed {
                s.positive = false;
            }
            TickOutcome::Published(
                TimeUnitMagnitudes::from_parts(s.period_passed, s.duration_passed),
                s.positive,
            )
        };
        self.dispatch(outcome);
        true
    }

    /// Advances the counter by one second, as the driver does.
    #[cfg(test)]
    fn run_tick(&self) {
        let outcome = self.tick_locked(&mut self.state.lock());
        self.dispatch(outcome);
    }

    fn dispatch(&self, outcome: TickOutcome) {
        match outcome {
            TickOutcome::Published(mags, positive) => self.core.publish(mags, positive),
            TickOutcome::Overflowed => {
                warn!(id = %self.core.id(), "counter overflowed, driver stopped");
                self.core.notify_overflow();
            }
        }
    }

    /// One cadence tick. Caller holds the state lock; notifications are
    /// delivered by [`SoloCounter::dispatch`] after it is released.
    fn tick_locked(&self, s: &mut SoloState) -> TickOutcome {
        let counting_up = self.core.mode() == CounterMode::Stopwatch || !s.positive;
        if counting_up {
            let secs = s.duration_passed.as_seconds() + 1;
            if secs == SECONDS_PER_DAY {
                // Day rollover: fold the new day into the period.
                let grown = CalendarPeriod {
                    days: s.period_passed.days + 1,
                    ..s.period_passed
                };
                match grown.normalize(self.model) {
                    Ok(period) => {
                        s.period_passed = period;
                        s.duration_passed = ClockDuration::ZERO;
                    }
                    Err(_) => {
                        // Latch before the driver stops; the live amount
                        // keeps its pre-tick value.
                        s.run = RunState::Overflowed;
                        return TickOutcome::Overflowed;
                    }
                }
            } else {
                s.duration_passed = ClockDuration::from_day_seconds(secs);
            }
        } else {
            let secs = s.duration_passed.as_seconds();
            if secs > 0 {
                s.duration_passed = ClockDuration::from_day_seconds(secs - 1);
            } else {
                // 00:00:00 underflows to 23:59:59, borrowing one day.
                s.duration_passed = ClockDuration::from_day_seconds(SECONDS_PER_DAY - 1);
                let p = s.period_passed;
                if p.days > 0 {
                    s.period_passed = CalendarPeriod {
                        days: p.days - 1,
                        ..p
                    };
                } else if p.months > 0 || p.years > 0 {
                    // Day exhausted: borrow one month's worth of days.
                    let (years, months) = if p.months == 0 {
                        (p.years - 1, 11)
                    } else {
                        (p.years, p.months - 1)
                    };
                    s.period_passed = CalendarPeriod {
                        years,
                        months,
                        days: self.model.days_in_month(months) - 1,
                    };
                } else {
                    // Zero-crossing. The magnitude lands on the 2-second
                    // boundary compensation, covering the day borrowed
                    // earlier in this same tick.
                    s.positive = false;
                    s.period_passed = CalendarPeriod::ZERO;
                    s.duration_passed = ClockDuration::from_day_seconds(2);
                }
            }
        }
        TickOutcome::Published(
            TimeUnitMagnitudes::from_parts(s.period_passed, s.duration_passed),
            s.positive,
        )
    }

    fn drive(self: Arc<Self>, epoch: u64) {
        debug!(id = %self.core.id(), "driver started");
        let mut deadline = Instant::now() + CADENCE;
        loop {
            let mut s = self.state.lock();
            loop {
                if s.epoch != epoch || s.run != RunState::Running {
                    debug!(id = %self.core.id(), "driver superseded");
                    return;
                }
                if self.wakeup.wait_until(&mut s, deadline).timed_out() {
                    break;
                }
            }
            if s.epoch != epoch || s.run != RunState::Running {
                debug!(id = %self.core.id(), "driver superseded");
                return;
            }
            let outcome = self.tick_locked(&mut s);
            let stop = matches!(outcome, TickOutcome::Overflowed);
            drop(s);
            self.dispatch(outcome);
            if stop {
                return;
            }
            deadline += CADENCE;
        }
    }
}

impl std::fmt::Debug for SoloCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoloCounter")
            .field("id", &self.core.id())
            .field("mode", &self.core.mode())
            .field("model", &self.model)
            .field("run", &self.run_state())
            .field("text", &self.display_text())
            .finish()
    }
}
