#![allow(dead_code)]

use cadence_core::{Schedule, ScheduleParams};
use chrono::NaiveDate;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

/// Parses `YYYY-MM-DD` literals.
pub fn dates(values: &[&str]) -> Vec<NaiveDate> {
    values
        .iter()
        .map(|value| NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid test date"))
        .collect()
}

pub fn iso(dates: &[NaiveDate]) -> Vec<String> {
    dates
        .iter()
        .map(|date| date.format("%Y-%m-%d").to_string())
        .collect()
}

/// Paydays on the 5th and 20th, moved back a day when that lands on a banking day, from November 2017
/// through early May 2018.
pub fn semi_monthly_paydays() -> Vec<NaiveDate> {
    let params = ScheduleParams::semi_monthly(5, 20).expect("valid params");
    Schedule::new(params, -1, None)
        .expect("valid schedule")
        .between(date(2017, 11, 1), date(2018, 5, 10), true)
        .expect("valid range")
}
