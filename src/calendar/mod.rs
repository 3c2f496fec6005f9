//! Banking-day calendar and month arithmetic shared by the schedule generator.
//!
//! A banking day is a Monday through Friday that is not a U.S. Federal Reserve
//! holiday. Fixed-date holidays that land on a Sunday are observed the following
//! Monday; Saturday holidays are not moved.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

const JUNETEENTH_FIRST_YEAR: i32 = 2022;
const MAX_ROLL_DAYS: usize = 14;

/// Returns `true` when `date` is a weekday and not an observed holiday.
pub fn is_banking_day(date: NaiveDate) -> bool {
    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    !is_holiday(date)
}

/// Returns `true` when `date` is an observed Federal Reserve holiday.
pub fn is_holiday(date: NaiveDate) -> bool {
    holidays(date.year()).contains(&date)
}

/// Observed Federal Reserve holidays for `year`, in calendar order.
pub fn holidays(year: i32) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(11);
    let fixed = |month: u32, day: u32| NaiveDate::from_ymd_opt(year, month, day).map(observed);

    days.extend(fixed(1, 1));
    days.extend(nth_weekday_of_month(year, 1, Weekday::Mon, 3));
    days.extend(nth_weekday_of_month(year, 2, Weekday::Mon, 3));
    days.extend(last_weekday_of_month(year, 5, Weekday::Mon));
    if year >= JUNETEENTH_FIRST_YEAR {
        days.extend(fixed(6, 19));
    }
    days.extend(fixed(7, 4));
    days.extend(nth_weekday_of_month(year, 9, Weekday::Mon, 1));
    days.extend(nth_weekday_of_month(year, 10, Weekday::Mon, 2));
    days.extend(fixed(11, 11));
    days.extend(nth_weekday_of_month(year, 11, Weekday::Thu, 4));
    days.extend(fixed(12, 25));
    days
}

/// Nearest banking day on or before `date`.
pub fn previous_banking_day(date: NaiveDate) -> NaiveDate {
    let mut current = date;
    for _ in 0..MAX_ROLL_DAYS {
        if is_banking_day(current) {
            return current;
        }
        current -= Duration::days(1);
    }
    date
}

/// Nearest banking day on or after `date`.
pub fn next_banking_day(date: NaiveDate) -> NaiveDate {
    let mut current = date;
    for _ in 0..MAX_ROLL_DAYS {
        if is_banking_day(current) {
            return current;
        }
        current += Duration::days(1);
    }
    date
}

/// First banking day reached by moving from `date` one day at a time, at most
/// `|days|` days, backward when `days` is negative. `date` itself is not considered.
pub fn banking_day_within(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    let step = Duration::days(days.signum());
    let mut current = date;
    for _ in 0..days.unsigned_abs() {
        current += step;
        if is_banking_day(current) {
            return Some(current);
        }
    }
    None
}

fn observed(date: NaiveDate) -> NaiveDate {
    if date.weekday() == Weekday::Sun {
        date + Duration::days(1)
    } else {
        date
    }
}

/// The `nth` (1-based) occurrence of `weekday` in the given month, if it exists.
pub fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, nth: u32) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, nth as u8)
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let last = NaiveDate::from_ymd_opt(year, month, days_in_month(year, month))?;
    let back = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
    Some(last - Duration::days(back as i64))
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };
    match NaiveDate::from_ymd_opt(next_year, next_month, 1) {
        Some(first_next) => (first_next - Duration::days(1)).day(),
        None => 28,
    }
}

/// Shifts a `(year, month)` pair by `months`, wrapping across years.
pub fn shift_month(year: i32, month: u32, months: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + months;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}
