use chrono::{NaiveDate, NaiveDateTime};

/// Sorts ascending and keeps one entry per calendar day.
pub fn normalize(dates: impl IntoIterator<Item = NaiveDate>) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = dates.into_iter().collect();
    dates.sort();
    dates.dedup();
    dates
}

/// Strips time-of-day before normalizing.
pub fn from_timestamps(timestamps: impl IntoIterator<Item = NaiveDateTime>) -> Vec<NaiveDate> {
    normalize(timestamps.into_iter().map(|ts| ts.date()))
}

/// The `count` most recent observations of an already normalized list.
pub fn most_recent(dates: &[NaiveDate], count: usize) -> &[NaiveDate] {
    &dates[dates.len().saturating_sub(count)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deduplicates_per_day_and_sorts() {
        let d = |day| NaiveDate::from_ymd_opt(2018, 1, day).unwrap();
        let stamps = vec![
            d(15).and_hms_opt(17, 30, 0).unwrap(),
            d(1).and_hms_opt(9, 0, 0).unwrap(),
            d(15).and_hms_opt(8, 0, 0).unwrap(),
        ];
        assert_eq!(from_timestamps(stamps), vec![d(1), d(15)]);
        assert_eq!(most_recent(&[d(1), d(2), d(3)], 2), &[d(2), d(3)]);
        assert_eq!(most_recent(&[d(1)], 5), &[d(1)]);
    }
}
