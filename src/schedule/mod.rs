//! Recurrence families, their parameters, and the immutable [`Schedule`] value
//! that generates concrete dates.

pub mod family;
pub mod generator;
pub mod params;
pub mod roll;

use chrono::{Duration, NaiveDate};
use serde_json::Value;

pub use family::RecurrenceFamily;
pub use generator::{normalize_biweekly_anchor, week_parity, Direction};
pub use params::{circular_gap, week_of_month, weekday_name, MonthDay, ScheduleParams};
pub use roll::RollPolicy;

use crate::errors::ScheduleError;
use generator::Generator;

/// Raw occurrences this far outside a range can still roll into it.
const ROLL_SLACK_DAYS: i64 = 7;
/// Hard stop for range generation.
const MAX_GENERATED_OCCURRENCES: usize = 20_000;
/// Hard stop for single-occurrence lookups.
const MAX_LOOKUP_STEPS: usize = 64;

/// One validated recurrence pattern. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Schedule {
    params: ScheduleParams,
    roll: RollPolicy,
    anchor: Option<NaiveDate>,
    generator: Generator,
}

impl Schedule {
    /// Validates params and roll policy; biweekly schedules require an anchor.
    pub fn new(
        params: ScheduleParams,
        roll_policy: i8,
        anchor: Option<NaiveDate>,
    ) -> Result<Self, ScheduleError> {
        let family = params.family();
        params.check()?;
        let roll = RollPolicy::new(roll_policy).ok_or_else(|| {
            ScheduleError::invalid(
                family,
                params.to_string(),
                format!("roll policy {roll_policy} must be between -2 and 2"),
            )
        })?;
        let generator = Generator::from_params(&params, anchor).ok_or_else(|| {
            ScheduleError::invalid(
                family,
                params.to_string(),
                "biweekly schedules require an anchor date",
            )
        })?;
        Ok(Self {
            anchor: normalized_anchor(&params, anchor),
            params,
            roll,
            generator,
        })
    }

    /// Sanitizes list-form params for `family` and builds the schedule.
    pub fn from_raw(
        family: RecurrenceFamily,
        raw: &Value,
        roll_policy: i8,
        anchor: Option<NaiveDate>,
    ) -> Result<Self, ScheduleError> {
        Self::new(ScheduleParams::sanitize(family, raw)?, roll_policy, anchor)
    }

    pub fn family(&self) -> RecurrenceFamily {
        self.params.family()
    }

    pub fn params(&self) -> &ScheduleParams {
        &self.params
    }

    pub fn roll_policy(&self) -> RollPolicy {
        self.roll
    }

    /// The normalized anchor (for biweekly schedules, a date on the scheduled weekday).
    pub fn anchor(&self) -> Option<NaiveDate> {
        self.anchor
    }

    /// Same pattern and roll policy, anchored at `anchor`.
    pub fn reanchored(&self, anchor: NaiveDate) -> Result<Self, ScheduleError> {
        Self::new(self.params.clone(), self.roll.value(), Some(anchor))
    }

    /// All rolled occurrences between `min` and `max`, ascending and de-duplicated.
    ///
    /// The roll policy is applied before the range test, so a raw date outside the
    /// range may still appear once rolled into it.
    pub fn between(
        &self,
        min: NaiveDate,
        max: NaiveDate,
        inclusive: bool,
    ) -> Result<Vec<NaiveDate>, ScheduleError> {
        if min > max {
            return Err(ScheduleError::InvalidRange { min, max });
        }
        let in_range = |date: NaiveDate| {
            if inclusive {
                min <= date && date <= max
            } else {
                min < date && date < max
            }
        };
        let limit = max + Duration::days(ROLL_SLACK_DAYS);
        let mut dates = Vec::new();
        let mut raw = self
            .generator
            .first_from(min - Duration::days(ROLL_SLACK_DAYS), Direction::Forward);
        let mut generated = 0usize;

        while let Some(current) = raw {
            if current > limit || generated >= MAX_GENERATED_OCCURRENCES {
                break;
            }
            let rolled = self.roll.apply(current);
            if in_range(rolled) {
                dates.push(rolled);
            }
            raw = self.generator.step(current, Direction::Forward);
            generated += 1;
        }

        dates.sort();
        dates.dedup();
        Ok(dates)
    }

    /// Nearest rolled occurrence after `date` (or on it when `inclusive`).
    pub fn after(&self, date: NaiveDate, inclusive: bool) -> Option<NaiveDate> {
        let mut raw = self
            .generator
            .first_from(date - Duration::days(ROLL_SLACK_DAYS), Direction::Forward);
        for _ in 0..MAX_LOOKUP_STEPS {
            let current = raw?;
            let rolled = self.roll.apply(current);
            if rolled > date || (inclusive && rolled == date) {
                return Some(rolled);
            }
            raw = self.generator.step(current, Direction::Forward);
        }
        None
    }

    /// Nearest rolled occurrence before `date` (or on it when `inclusive`).
    pub fn before(&self, date: NaiveDate, inclusive: bool) -> Option<NaiveDate> {
        let mut raw = self
            .generator
            .first_from(date + Duration::days(ROLL_SLACK_DAYS), Direction::Backward);
        for _ in 0..MAX_LOOKUP_STEPS {
            let current = raw?;
            let rolled = self.roll.apply(current);
            if rolled < date || (inclusive && rolled == date) {
                return Some(rolled);
            }
            raw = self.generator.step(current, Direction::Backward);
        }
        None
    }
}

/// Anchor as stored on a schedule: biweekly anchors move onto the scheduled weekday
/// within their own week, every other family keeps the anchor untouched.
pub fn normalized_anchor(params: &ScheduleParams, anchor: Option<NaiveDate>) -> Option<NaiveDate> {
    match params {
        ScheduleParams::Biweekly(weekday) => {
            anchor.map(|date| normalize_biweekly_anchor(*weekday, date))
        }
        _ => anchor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn biweekly_requires_anchor() {
        let err = Schedule::new(ScheduleParams::biweekly(Weekday::Fri), 0, None).unwrap_err();
        assert_eq!(err.reason(), Some("biweekly schedules require an anchor date"));
    }

    #[test]
    fn roll_policy_out_of_range_is_rejected() {
        let params = ScheduleParams::monthly(15).unwrap();
        assert!(Schedule::new(params.clone(), 3, None).is_err());
        assert!(Schedule::new(params, -2, None).is_ok());
    }

    #[test]
    fn inverted_range_is_an_error() {
        let schedule = Schedule::new(ScheduleParams::monthly(1).unwrap(), 0, None).unwrap();
        let err = schedule
            .between(date(2018, 2, 1), date(2018, 1, 1), true)
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidRange { .. }));
    }

    #[test]
    fn exclusive_range_drops_endpoints() {
        let schedule = Schedule::new(ScheduleParams::monthly(1).unwrap(), 0, None).unwrap();
        let inclusive = schedule
            .between(date(2018, 1, 1), date(2018, 3, 1), true)
            .unwrap();
        let exclusive = schedule
            .between(date(2018, 1, 1), date(2018, 3, 1), false)
            .unwrap();
        assert_eq!(inclusive, vec![date(2018, 1, 1), date(2018, 2, 1), date(2018, 3, 1)]);
        assert_eq!(exclusive, vec![date(2018, 2, 1)]);
    }

    #[test]
    fn last_day_handles_february() {
        let schedule = Schedule::new(ScheduleParams::monthly(-1).unwrap(), 0, None).unwrap();
        let dates = schedule
            .between(date(2019, 12, 1), date(2020, 3, 31), true)
            .unwrap();
        assert_eq!(
            dates,
            vec![date(2019, 12, 31), date(2020, 1, 31), date(2020, 2, 29), date(2020, 3, 31)]
        );
    }

    #[test]
    fn rolled_dates_can_enter_the_range() {
        // 2017-04-01 is a Saturday; a two-day following roll lands on Monday 04-03.
        let schedule = Schedule::new(ScheduleParams::monthly(1).unwrap(), 2, None).unwrap();
        let dates = schedule
            .between(date(2017, 4, 2), date(2017, 4, 30), true)
            .unwrap();
        assert_eq!(dates, vec![date(2017, 4, 3)]);
    }

    #[test]
    fn biweekly_keeps_anchor_parity() {
        let anchor = date(2018, 1, 5);
        let schedule =
            Schedule::new(ScheduleParams::biweekly(Weekday::Fri), 0, Some(anchor)).unwrap();
        let dates = schedule
            .between(date(2018, 1, 1), date(2018, 3, 1), true)
            .unwrap();
        assert_eq!(dates.first(), Some(&anchor));
        for pair in dates.windows(2) {
            assert_eq!((pair[1] - pair[0]).num_days(), 14);
        }
        assert!(dates.iter().all(|d| week_parity(*d) == week_parity(anchor)));
        assert!(dates.iter().all(|d| d.weekday() == Weekday::Fri));
    }

    #[test]
    fn biweekly_anchor_is_normalized_once() {
        let schedule =
            Schedule::new(ScheduleParams::biweekly(Weekday::Fri), 0, Some(date(2018, 1, 2)))
                .unwrap();
        assert_eq!(schedule.anchor(), Some(date(2018, 1, 5)));
        let moved = schedule.reanchored(date(2018, 1, 9)).unwrap();
        assert_eq!(moved.anchor(), Some(date(2018, 1, 12)));
        assert_eq!(schedule.anchor(), Some(date(2018, 1, 5)));
    }

    #[test]
    fn after_and_before_find_neighbours() {
        let schedule = Schedule::new(ScheduleParams::semi_monthly(15, -1).unwrap(), 0, None)
            .unwrap();
        assert_eq!(schedule.after(date(2018, 2, 15), false), Some(date(2018, 2, 28)));
        assert_eq!(schedule.after(date(2018, 2, 15), true), Some(date(2018, 2, 15)));
        assert_eq!(schedule.before(date(2018, 2, 15), false), Some(date(2018, 1, 31)));
        assert_eq!(schedule.before(date(2018, 2, 16), true), Some(date(2018, 2, 15)));
    }
}
