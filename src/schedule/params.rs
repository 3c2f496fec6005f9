//! Typed recurrence parameters and the sanitizer for loosely typed input.

use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::RecurrenceFamily;
use crate::calendar::days_in_month;
use crate::errors::ScheduleError;

/// Days around the month circle used for semi-monthly spacing.
pub const MONTH_CIRCLE_DAYS: i64 = 29;
/// Minimum circular distance between the two semi-monthly days.
pub const MIN_SEMI_MONTHLY_GAP: i64 = 7;
pub const MAX_MONTH_DAY: u32 = 28;
pub const MAX_WEEK_OF_MONTH: u32 = 4;

const DAY_DOMAIN_MESSAGE: &str = "day must be between 1 and 28, or -1 for the last day";
const GAP_MESSAGE: &str = "params must be at least 7 days apart";

/// A day of the month as used by monthly families: a fixed day or the month's last day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MonthDay {
    Day(u32),
    Last,
}

impl MonthDay {
    /// Builds a month day from its integer form (`-1` is the last day).
    pub fn from_value(value: i64) -> Option<MonthDay> {
        match value {
            -1 => Some(MonthDay::Last),
            1..=28 => Some(MonthDay::Day(value as u32)),
            _ => None,
        }
    }

    pub fn value(self) -> i64 {
        match self {
            MonthDay::Day(day) => day as i64,
            MonthDay::Last => -1,
        }
    }

    /// Concrete date for this day in the given month.
    pub fn resolve(self, year: i32, month: u32) -> Option<NaiveDate> {
        let day = match self {
            MonthDay::Day(day) => day.min(days_in_month(year, month)),
            MonthDay::Last => days_in_month(year, month),
        };
        NaiveDate::from_ymd_opt(year, month, day)
    }

    fn is_valid(self) -> bool {
        match self {
            MonthDay::Day(day) => (1..=MAX_MONTH_DAY).contains(&day),
            MonthDay::Last => true,
        }
    }
}

/// Circular distance between two month-day values, the last day sitting at position 0.
///
/// Out-of-domain values produce a negative wrap distance, so they never pass a gap check.
pub fn circular_gap(a: i64, b: i64) -> i64 {
    let position = |day: i64| if day == -1 { 0 } else { day };
    let forward = (position(a) - position(b)).abs();
    forward.min(MONTH_CIRCLE_DAYS - forward)
}

/// Family-specific parameters, validated before any date math runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScheduleParams {
    Monthly(MonthDay),
    SemiMonthly(MonthDay, MonthDay),
    Weekly(Vec<Weekday>),
    Biweekly(Weekday),
    WeekdayMonthly { week: u32, weekday: Weekday },
}

impl ScheduleParams {
    pub fn family(&self) -> RecurrenceFamily {
        match self {
            ScheduleParams::Monthly(_) => RecurrenceFamily::Monthly,
            ScheduleParams::SemiMonthly(..) => RecurrenceFamily::SemiMonthly,
            ScheduleParams::Weekly(_) => RecurrenceFamily::Weekly,
            ScheduleParams::Biweekly(_) => RecurrenceFamily::Biweekly,
            ScheduleParams::WeekdayMonthly { .. } => RecurrenceFamily::WeekdayMonthly,
        }
    }

    pub fn monthly(day: i64) -> Result<Self, ScheduleError> {
        let family = RecurrenceFamily::Monthly;
        let day = MonthDay::from_value(day)
            .ok_or_else(|| ScheduleError::invalid(family, format!("[{day}]"), DAY_DOMAIN_MESSAGE))?;
        Ok(ScheduleParams::Monthly(day))
    }

    /// Builds semi-monthly params; the pair is stored in calendar order, last day last.
    pub fn semi_monthly(first: i64, second: i64) -> Result<Self, ScheduleError> {
        let family = RecurrenceFamily::SemiMonthly;
        let rendered = format!("[{first},{second}]");
        if circular_gap(first, second) < MIN_SEMI_MONTHLY_GAP {
            return Err(ScheduleError::invalid(family, rendered, GAP_MESSAGE));
        }
        match (MonthDay::from_value(first), MonthDay::from_value(second)) {
            (Some(a), Some(b)) => Ok(ScheduleParams::SemiMonthly(a.min(b), a.max(b))),
            _ => Err(ScheduleError::invalid(family, rendered, DAY_DOMAIN_MESSAGE)),
        }
    }

    /// Builds weekly params as a de-duplicated set ordered from Sunday.
    pub fn weekly(weekdays: impl IntoIterator<Item = Weekday>) -> Result<Self, ScheduleError> {
        let mut weekdays: Vec<Weekday> = weekdays.into_iter().collect();
        weekdays.sort_by_key(|day| day.num_days_from_sunday());
        weekdays.dedup();
        if weekdays.is_empty() {
            return Err(ScheduleError::invalid(
                RecurrenceFamily::Weekly,
                "[]",
                "weekly schedules need at least one weekday",
            ));
        }
        Ok(ScheduleParams::Weekly(weekdays))
    }

    pub fn biweekly(weekday: Weekday) -> Self {
        ScheduleParams::Biweekly(weekday)
    }

    pub fn weekday_monthly(week: i64, weekday: Weekday) -> Result<Self, ScheduleError> {
        if !(1..=MAX_WEEK_OF_MONTH as i64).contains(&week) {
            return Err(ScheduleError::invalid(
                RecurrenceFamily::WeekdayMonthly,
                format!("[{week},\"{}\"]", weekday_name(weekday)),
                "week of month must be between 1 and 4",
            ));
        }
        Ok(ScheduleParams::WeekdayMonthly {
            week: week as u32,
            weekday,
        })
    }

    /// Parses the stored list form of params (for example `[15, -1]` or `[1, "friday"]`).
    pub fn sanitize(family: RecurrenceFamily, raw: &Value) -> Result<Self, ScheduleError> {
        let rendered = raw.to_string();
        let invalid = |reason: &str| ScheduleError::invalid(family, rendered.clone(), reason);
        let items = raw
            .as_array()
            .ok_or_else(|| invalid("params must be a list"))?;

        match family {
            RecurrenceFamily::Monthly => match items.as_slice() {
                [day] => {
                    let day = day.as_i64().ok_or_else(|| invalid(DAY_DOMAIN_MESSAGE))?;
                    Self::monthly(day).map_err(|_| invalid(DAY_DOMAIN_MESSAGE))
                }
                _ => Err(invalid("monthly schedules take exactly one day")),
            },
            RecurrenceFamily::SemiMonthly => match items.as_slice() {
                [first, second] => {
                    let first = first.as_i64().ok_or_else(|| invalid(DAY_DOMAIN_MESSAGE))?;
                    let second = second.as_i64().ok_or_else(|| invalid(DAY_DOMAIN_MESSAGE))?;
                    Self::semi_monthly(first, second).map_err(|err| {
                        invalid(err.reason().unwrap_or(DAY_DOMAIN_MESSAGE))
                    })
                }
                _ => Err(invalid("semi-monthly schedules take exactly two days")),
            },
            RecurrenceFamily::Weekly => {
                let weekdays = items
                    .iter()
                    .map(|item| parse_weekday_value(item).ok_or_else(|| invalid("unknown weekday")))
                    .collect::<Result<Vec<_>, _>>()?;
                Self::weekly(weekdays).map_err(|_| invalid("weekly schedules need at least one weekday"))
            }
            RecurrenceFamily::Biweekly => match items.as_slice() {
                [weekday] => parse_weekday_value(weekday)
                    .map(ScheduleParams::Biweekly)
                    .ok_or_else(|| invalid("unknown weekday")),
                _ => Err(invalid("biweekly schedules take exactly one weekday")),
            },
            RecurrenceFamily::WeekdayMonthly => match items.as_slice() {
                [week, weekday] => {
                    let week = week
                        .as_i64()
                        .ok_or_else(|| invalid("week of month must be between 1 and 4"))?;
                    let weekday =
                        parse_weekday_value(weekday).ok_or_else(|| invalid("unknown weekday"))?;
                    Self::weekday_monthly(week, weekday)
                        .map_err(|_| invalid("week of month must be between 1 and 4"))
                }
                _ => Err(invalid("weekday-monthly schedules take a week and a weekday")),
            },
        }
    }

    /// Re-checks domain rules for params assembled directly from the public variants.
    pub(crate) fn check(&self) -> Result<(), ScheduleError> {
        let family = self.family();
        let invalid = |reason: &str| ScheduleError::invalid(family, self.to_string(), reason);
        match self {
            ScheduleParams::Monthly(day) if !day.is_valid() => Err(invalid(DAY_DOMAIN_MESSAGE)),
            ScheduleParams::SemiMonthly(a, b) => {
                if circular_gap(a.value(), b.value()) < MIN_SEMI_MONTHLY_GAP {
                    Err(invalid(GAP_MESSAGE))
                } else if !a.is_valid() || !b.is_valid() {
                    Err(invalid(DAY_DOMAIN_MESSAGE))
                } else {
                    Ok(())
                }
            }
            ScheduleParams::Weekly(days) if days.is_empty() => {
                Err(invalid("weekly schedules need at least one weekday"))
            }
            ScheduleParams::WeekdayMonthly { week, .. }
                if !(1..=MAX_WEEK_OF_MONTH).contains(week) =>
            {
                Err(invalid("week of month must be between 1 and 4"))
            }
            _ => Ok(()),
        }
    }

    /// List form used for storage and display.
    pub fn to_value(&self) -> Value {
        match self {
            ScheduleParams::Monthly(day) => Value::from(vec![day.value()]),
            ScheduleParams::SemiMonthly(a, b) => Value::from(vec![a.value(), b.value()]),
            ScheduleParams::Weekly(days) => {
                Value::Array(days.iter().map(|day| Value::from(weekday_name(*day))).collect())
            }
            ScheduleParams::Biweekly(day) => Value::Array(vec![Value::from(weekday_name(*day))]),
            ScheduleParams::WeekdayMonthly { week, weekday } => Value::Array(vec![
                Value::from(*week),
                Value::from(weekday_name(*weekday)),
            ]),
        }
    }
}

impl fmt::Display for ScheduleParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl Serialize for ScheduleParams {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_value().serialize(serializer)
    }
}

/// Lowercase English weekday name.
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

fn parse_weekday_value(value: &Value) -> Option<Weekday> {
    value.as_str()?.trim().parse::<Weekday>().ok()
}

/// Week of month (1-based) for a date: days 1-7 are week 1, 29-31 are week 5.
pub fn week_of_month(date: NaiveDate) -> u32 {
    (date.day() - 1) / 7 + 1
}
