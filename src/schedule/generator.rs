//! Per-family date stepping.
//!
//! Each family has an initializer (`first_from`) that finds the nearest raw
//! occurrence on or past a date in a direction, and a stepper (`step`) that moves
//! from one raw occurrence to the next. Roll policies are applied by the caller.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use super::params::{MonthDay, ScheduleParams};
use crate::calendar::{nth_weekday_of_month, shift_month};

/// Bound on the biweekly parity scan.
const PARITY_SCAN_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn sign(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }

    fn months(self) -> i32 {
        self.sign() as i32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Generator {
    Monthly { day: MonthDay },
    SemiMonthly { days: [MonthDay; 2] },
    /// Weekdays sorted from Sunday.
    Weekly { weekdays: Vec<Weekday> },
    /// `origin` is the normalized anchor: a date on `weekday` in a parity-correct week.
    Biweekly { weekday: Weekday, origin: NaiveDate },
    WeekdayMonthly { week: u32, weekday: Weekday },
}

impl Generator {
    /// Returns `None` only for a biweekly schedule without an anchor.
    pub(crate) fn from_params(params: &ScheduleParams, anchor: Option<NaiveDate>) -> Option<Self> {
        let generator = match params {
            ScheduleParams::Monthly(day) => Generator::Monthly { day: *day },
            ScheduleParams::SemiMonthly(a, b) => Generator::SemiMonthly { days: [*a, *b] },
            ScheduleParams::Weekly(weekdays) => {
                let mut weekdays = weekdays.clone();
                weekdays.sort_by_key(|day| day.num_days_from_sunday());
                Generator::Weekly { weekdays }
            }
            ScheduleParams::Biweekly(weekday) => Generator::Biweekly {
                weekday: *weekday,
                origin: normalize_biweekly_anchor(*weekday, anchor?),
            },
            ScheduleParams::WeekdayMonthly { week, weekday } => Generator::WeekdayMonthly {
                week: *week,
                weekday: *weekday,
            },
        };
        Some(generator)
    }

    /// Nearest raw occurrence on or after (`Forward`) / on or before (`Backward`) `date`.
    pub(crate) fn first_from(&self, date: NaiveDate, direction: Direction) -> Option<NaiveDate> {
        match self {
            Generator::Monthly { .. } | Generator::WeekdayMonthly { .. } => {
                let current = self.in_month(date.year(), date.month())?;
                let reached = match direction {
                    Direction::Forward => current >= date,
                    Direction::Backward => current <= date,
                };
                if reached {
                    Some(current)
                } else {
                    let (year, month) = shift_month(date.year(), date.month(), direction.months());
                    self.in_month(year, month)
                }
            }
            Generator::SemiMonthly { days } => {
                let (year, month) = (date.year(), date.month());
                let (other_year, other_month) = shift_month(year, month, direction.months());
                let candidates = days
                    .iter()
                    .flat_map(|day| [day.resolve(year, month), day.resolve(other_year, other_month)])
                    .flatten();
                match direction {
                    Direction::Forward => candidates.filter(|c| *c >= date).min(),
                    Direction::Backward => candidates.filter(|c| *c <= date).max(),
                }
            }
            Generator::Weekly { weekdays } => (0..7)
                .map(|offset| date + Duration::days(offset * direction.sign()))
                .find(|day| weekdays.contains(&day.weekday())),
            Generator::Biweekly { weekday, origin } => {
                let parity = week_parity(*origin);
                (0..=PARITY_SCAN_DAYS)
                    .map(|offset| date + Duration::days(offset * direction.sign()))
                    .find(|day| day.weekday() == *weekday && week_parity(*day) == parity)
            }
        }
    }

    /// Next raw occurrence after `occurrence` in `direction`.
    pub(crate) fn step(&self, occurrence: NaiveDate, direction: Direction) -> Option<NaiveDate> {
        match self {
            Generator::Monthly { .. } | Generator::WeekdayMonthly { .. } => {
                let (year, month) =
                    shift_month(occurrence.year(), occurrence.month(), direction.months());
                self.in_month(year, month)
            }
            Generator::SemiMonthly { .. } => {
                self.first_from(occurrence + Duration::days(direction.sign()), direction)
            }
            Generator::Weekly { weekdays } => {
                Some(step_within_weeks(weekdays, occurrence, direction, 1))
            }
            Generator::Biweekly { .. } => Some(occurrence + Duration::weeks(2 * direction.sign())),
        }
    }

    fn in_month(&self, year: i32, month: u32) -> Option<NaiveDate> {
        match self {
            Generator::Monthly { day } => day.resolve(year, month),
            Generator::WeekdayMonthly { week, weekday } => {
                nth_weekday_of_month(year, month, *weekday, *week)
            }
            _ => None,
        }
    }
}

/// Advances to the next configured weekday in the same week, or wraps into the
/// first (or last) configured weekday `stride_weeks` later.
fn step_within_weeks(
    weekdays: &[Weekday],
    occurrence: NaiveDate,
    direction: Direction,
    stride_weeks: i64,
) -> NaiveDate {
    let current = occurrence.weekday().num_days_from_sunday() as i64;
    let indices = weekdays.iter().map(|day| day.num_days_from_sunday() as i64);
    let same_week = match direction {
        Direction::Forward => indices.clone().find(|idx| *idx > current),
        Direction::Backward => indices.clone().rev().find(|idx| *idx < current),
    };
    let delta = match (same_week, direction) {
        (Some(idx), _) => idx - current,
        (None, Direction::Forward) => {
            let first = indices.clone().next().unwrap_or(current);
            7 * stride_weeks - current + first
        }
        (None, Direction::Backward) => {
            let last = indices.clone().last().unwrap_or(current);
            -(7 * stride_weeks) - current + last
        }
    };
    occurrence + Duration::days(delta)
}

/// Parity of the Sunday-started week containing `date`.
///
/// The Unix epoch fell on a Thursday, so the count is shifted by three days to
/// make weeks start on Sunday.
pub fn week_parity(date: NaiveDate) -> i64 {
    let days = date.signed_duration_since(NaiveDate::default()).num_days();
    (days - 3).div_euclid(7).rem_euclid(2)
}

/// Moves a biweekly anchor onto `weekday` inside the anchor's own Sunday-started week.
pub fn normalize_biweekly_anchor(weekday: Weekday, anchor: NaiveDate) -> NaiveDate {
    let week_start = anchor - Duration::days(anchor.weekday().num_days_from_sunday() as i64);
    week_start + Duration::days(weekday.num_days_from_sunday() as i64)
}
