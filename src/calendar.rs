//! Calendar period model: normalization of (years, months, days) under a
//! selectable day-accounting convention.
//!
//! Two conventions are supported:
//!
//! | Model | Month length | Year length |
//! |-------|--------------|-------------|
//! | [`DayAccountingModel::Fixed360`] | always 30 days | 360 days |
//! | [`DayAccountingModel::Calendar365`] | Gregorian table, February fixed at 28 | 365 days |
//!
//! Neither model applies leap-year adjustments; the `Calendar365` table is
//! deliberately fixed so that "one month" means the same thing on every
//! pass over the calendar.

use serde::{Deserialize, Serialize};

use crate::error::{CounterError, Result};

/// Largest year count a period may hold after normalization.
pub const MAX_YEARS: i64 = i32::MAX as i64;

/// Seconds in one civil day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Gregorian month lengths, February fixed at 28. Index 0 is January.
const GREGORIAN_MONTH_DAYS: [i64; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Convention used to decide how many days belong to a month when folding
/// raw day counts into months and years.
///
/// Immutable per counter instance, supplied at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayAccountingModel {
    /// Twelve months of exactly 30 days each.
    Fixed360,
    /// Real Gregorian month lengths with February fixed at 28 days; no
    /// leap-year adjustment.
    Calendar365,
}

impl DayAccountingModel {
    /// Number of days in the month at `month_index` (0 = January, taken
    /// modulo 12) under this model.
    pub fn days_in_month(self, month_index: i64) -> i64 {
        match self {
            DayAccountingModel::Fixed360 => 30,
            DayAccountingModel::Calendar365 => {
                GREGORIAN_MONTH_DAYS[month_index.rem_euclid(12) as usize]
            }
        }
    }

    /// Number of days accounted to one whole year under this model.
    pub fn days_per_year(self) -> i64 {
        match self {
            DayAccountingModel::Fixed360 => 360,
            DayAccountingModel::Calendar365 => 365,
        }
    }
}

/// Number of days in the Gregorian table month at `month_index` (0 = January,
/// modulo 12), February fixed at 28. Used by target-instant counters for the
/// day-of-month mismatch borrow.
pub(crate) fn gregorian_days_in_month(month_index: i64) -> i64 {
    GREGORIAN_MONTH_DAYS[month_index.rem_euclid(12) as usize]
}

/// A normalized (years, months, days) magnitude.
///
/// Components are non-negative; after [`CalendarPeriod::normalize`] the
/// months component is in `0..=11` and the days component is smaller than
/// the model's size for the current month. A period is replaced wholesale
/// on each tick, never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarPeriod {
    pub years: i64,
    pub months: i64,
    pub days: i64,
}

impl CalendarPeriod {
    /// The all-zero period.
    pub const ZERO: CalendarPeriod = CalendarPeriod {
        years: 0,
        months: 0,
        days: 0,
    };

    /// Creates a period from raw components, rejecting negative values.
    ///
    /// The result is not normalized; call [`CalendarPeriod::normalize`].
    pub fn new(years: i64, months: i64, days: i64) -> Result<Self> {
        let period = CalendarPeriod {
            years,
            months,
            days,
        };
        if period.has_negative_component() {
            return Err(CounterError::InvalidArgument(
                "period components must be non-negative",
            ));
        }
        Ok(period)
    }

    fn has_negative_component(&self) -> bool {
        self.years < 0 || self.months < 0 || self.days < 0
    }

    /// Returns `true` if every component is zero.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Folds the period into its canonical shape under `model`.
    ///
    /// Applies the 12-month carry first, then folds surplus days into
    /// months (and months into years) according to the model's month
    /// lengths. Fails with [`CounterError::InvalidArgument`] on negative
    /// input and with [`CounterError::Overflow`] if the resulting year
    /// count would exceed [`MAX_YEARS`].
    pub fn normalize(self, model: DayAccountingModel) -> Result<Self> {
        if self.has_negative_component() {
            return Err(CounterError::InvalidArgument(
                "period components must be non-negative",
            ));
        }

        let mut years = self.years + self.months / 12;
        let mut months = self.months % 12;
        let mut days = self.days;

        match model {
            DayAccountingModel::Fixed360 => {
                if days >= 30 {
                    months += days / 30;
                    days %= 30;
                    years += months / 12;
                    months %= 12;
                }
            }
            DayAccountingModel::Calendar365 => {
                // Peel whole 365-day chunks before walking the table, so
                // large day counts stay O(12).
                if days >= 365 {
                    years += days / 365;
                    days %= 365;
                }
                while days >= GREGORIAN_MONTH_DAYS[months as usize] {
                    days -= GREGORIAN_MONTH_DAYS[months as usize];
                    months += 1;
                    years += months / 12;
                    months %= 12;
                }
            }
        }

        if years > MAX_YEARS {
            return Err(CounterError::Overflow);
        }

        Ok(CalendarPeriod {
            years,
            months,
            days,
        })
    }

    /// Total day count of this period under `model`.
    ///
    /// For `Calendar365` the months component is read as the first
    /// `months` table entries, the inverse of the normalization walk.
    pub fn total_days(&self, model: DayAccountingModel) -> i64 {
        let month_days: i64 = (0..self.months).map(|m| model.days_in_month(m)).sum();
        self.years * model.days_per_year() + month_days + self.days
    }
}

/// The sub-day part of a magnitude: clock-ranged hours, minutes, seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockDuration {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl ClockDuration {
    /// The all-zero duration.
    pub const ZERO: ClockDuration = ClockDuration {
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    /// Creates a duration, rejecting components outside clock range
    /// (hours `0..=23`, minutes and seconds `0..=59`).
    pub fn new(hours: i64, minutes: i64, seconds: i64) -> Result<Self> {
        if !(0..24).contains(&hours) || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
            return Err(CounterError::InvalidArgument(
                "duration components out of clock range",
            ));
        }
        Ok(ClockDuration {
            hours,
            minutes,
            seconds,
        })
    }

    /// Builds a duration from a second count within one day.
    ///
    /// `day_seconds` must be in `0..SECONDS_PER_DAY`; callers fold whole
    /// days into the period component first.
    pub(crate) fn from_day_seconds(day_seconds: i64) -> Self {
        debug_assert!((0..SECONDS_PER_DAY).contains(&day_seconds));
        ClockDuration {
            hours: day_seconds / 3600,
            minutes: (day_seconds / 60) % 60,
            seconds: day_seconds % 60,
        }
    }

    /// This duration as a second count within one day.
    pub fn as_seconds(&self) -> i64 {
        self.hours * 3600 + self.minutes * 60 + self.seconds
    }

    /// Returns `true` if every component is zero.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_month_carry() {
        let p = CalendarPeriod::new(0, 26, 3).unwrap();
        let n = p.normalize(DayAccountingModel::Fixed360).unwrap();
        assert_eq!(n, CalendarPeriod::new(2, 2, 3).unwrap());
    }

    #[test]
    fn test_fixed360_day_fold() {
        let p = CalendarPeriod::new(0, 0, 95).unwrap();
        let n = p.normalize(DayAccountingModel::Fixed360).unwrap();
        assert_eq!(n, CalendarPeriod::new(0, 3, 5).unwrap());
    }

    #[test]
    fn test_fixed360_exact_month() {
        // 30 days is exactly one month; the day component must stay below
        // the month size.
        let p = CalendarPeriod::new(0, 0, 30).unwrap();
        let n = p.normalize(DayAccountingModel::Fixed360).unwrap();
        assert_eq!(n, CalendarPeriod::new(0, 1, 0).unwrap());
    }

    #[test]
    fn test_fixed360_year_from_days() {
        let p = CalendarPeriod::new(0, 0, 360).unwrap();
        let n = p.normalize(DayAccountingModel::Fixed360).unwrap();
        assert_eq!(n, CalendarPeriod::new(1, 0, 0).unwrap());
    }

    #[test]
    fn test_calendar365_table_walk() {
        // 31 (Jan) + 28 (Feb) + 1 leftover.
        let p = CalendarPeriod::new(0, 0, 60).unwrap();
        let n = p.normalize(DayAccountingModel::Calendar365).unwrap();
        assert_eq!(n, CalendarPeriod::new(0, 2, 1).unwrap());
    }

    #[test]
    fn test_calendar365_walk_starts_at_current_month() {
        // Starting from February, 28 days make exactly one month.
        let p = CalendarPeriod::new(0, 1, 28).unwrap();
        let n = p.normalize(DayAccountingModel::Calendar365).unwrap();
        assert_eq!(n, CalendarPeriod::new(0, 2, 0).unwrap());
    }

    #[test]
    fn test_calendar365_year_chunks() {
        let p = CalendarPeriod::new(0, 0, 365 * 3 + 40).unwrap();
        let n = p.normalize(DayAccountingModel::Calendar365).unwrap();
        assert_eq!(n, CalendarPeriod::new(3, 1, 9).unwrap());
    }

    #[test]
    fn test_negative_component_rejected() {
        assert_eq!(
            CalendarPeriod {
                years: 0,
                months: -1,
                days: 0
            }
            .normalize(DayAccountingModel::Fixed360),
            Err(CounterError::InvalidArgument(
                "period components must be non-negative"
            ))
        );
        assert!(CalendarPeriod::new(1, 2, -3).is_err());
    }

    #[test]
    fn test_overflow_rejected() {
        let p = CalendarPeriod::new(MAX_YEARS, 11, 30).unwrap();
        assert_eq!(
            p.normalize(DayAccountingModel::Fixed360),
            Err(CounterError::Overflow)
        );
    }

    #[test]
    fn test_max_years_accepted() {
        let p = CalendarPeriod::new(MAX_YEARS, 11, 29).unwrap();
        assert_eq!(p.normalize(DayAccountingModel::Fixed360).unwrap(), p);
    }

    #[test]
    fn test_total_days_roundtrip_fixed360() {
        let p = CalendarPeriod::new(2, 3, 7).unwrap();
        let days = p.total_days(DayAccountingModel::Fixed360);
        assert_eq!(days, 2 * 360 + 3 * 30 + 7);
        let back = CalendarPeriod::new(0, 0, days)
            .unwrap()
            .normalize(DayAccountingModel::Fixed360)
            .unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_total_days_roundtrip_calendar365() {
        let p = CalendarPeriod::new(1, 4, 12).unwrap();
        let days = p.total_days(DayAccountingModel::Calendar365);
        assert_eq!(days, 365 + 31 + 28 + 31 + 30 + 12);
        let back = CalendarPeriod::new(0, 0, days)
            .unwrap()
            .normalize(DayAccountingModel::Calendar365)
            .unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_duration_range_checks() {
        assert!(ClockDuration::new(23, 59, 59).is_ok());
        assert!(ClockDuration::new(24, 0, 0).is_err());
        assert!(ClockDuration::new(0, 60, 0).is_err());
        assert!(ClockDuration::new(0, 0, -1).is_err());
    }

    #[test]
    fn test_duration_seconds_roundtrip() {
        let d = ClockDuration::new(13, 7, 45).unwrap();
        assert_eq!(ClockDuration::from_day_seconds(d.as_seconds()), d);
        assert_eq!(ClockDuration::from_day_seconds(0), ClockDuration::ZERO);
        assert_eq!(
            ClockDuration::from_day_seconds(SECONDS_PER_DAY - 1),
            ClockDuration::new(23, 59, 59).unwrap()
        );
    }

    fn any_model() -> impl Strategy<Value = DayAccountingModel> {
        prop_oneof![
            Just(DayAccountingModel::Fixed360),
            Just(DayAccountingModel::Calendar365),
        ]
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(
            years in 0i64..10_000,
            months in 0i64..500,
            days in 0i64..20_000,
            model in any_model(),
        ) {
            let once = CalendarPeriod { years, months, days }.normalize(model).unwrap();
            let twice = once.normalize(model).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn normalize_result_in_range(
            years in 0i64..10_000,
            months in 0i64..500,
            days in 0i64..20_000,
            model in any_model(),
        ) {
            let n = CalendarPeriod { years, months, days }.normalize(model).unwrap();
            prop_assert!((0..12).contains(&n.months));
            prop_assert!(n.days >= 0);
            prop_assert!(n.days < model.days_in_month(n.months));
        }

        #[test]
        fn normalize_preserves_total_days(
            years in 0i64..10_000,
            months in 0i64..12,
            days in 0i64..20_000,
            model in any_model(),
        ) {
            // With months already in range, folding days must not change
            // the total day count.
            let p = CalendarPeriod { years, months, days };
            let n = p.normalize(model).unwrap();
            prop_assert_eq!(p.total_days(model), n.total_days(model));
        }
    }
}
