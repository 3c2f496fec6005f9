//! Candidate parameter extraction.
//!
//! Given a handful of recent observations, propose the most-supported parameter
//! sets for each family. Support is the number of observations consistent with a
//! parameter set.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Weekday};
use rand::Rng;

use super::clustering::ranked_partitions;
use super::observations::most_recent;
use crate::config::DetectionConfig;
use crate::schedule::{
    circular_gap, params::MIN_SEMI_MONTHLY_GAP, week_of_month, MonthDay, RecurrenceFamily,
    ScheduleParams,
};

/// A proposed parameter set and how many observations back it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub params: ScheduleParams,
    /// Biweekly candidates carry the most recent matching observation as anchor.
    pub anchor: Option<NaiveDate>,
    pub support: usize,
}

/// Ranked candidates for `family`, most supported first, capped per the config.
pub fn extract_candidates<R: Rng + ?Sized>(
    family: RecurrenceFamily,
    observations: &[NaiveDate],
    config: &DetectionConfig,
    rng: &mut R,
) -> Vec<Candidate> {
    let sample = most_recent(observations, config.candidate_sample);
    let limit = config.candidates_per_family;
    match family {
        RecurrenceFamily::Monthly => monthly_candidates(sample, limit),
        RecurrenceFamily::SemiMonthly => semi_monthly_candidates(sample, config, rng),
        RecurrenceFamily::Weekly => weekday_buckets(sample, limit)
            .into_iter()
            .map(|bucket| Candidate {
                params: ScheduleParams::Weekly(vec![bucket.key]),
                anchor: None,
                support: bucket.count,
            })
            .collect(),
        RecurrenceFamily::Biweekly => weekday_buckets(sample, limit)
            .into_iter()
            .map(|bucket| Candidate {
                params: ScheduleParams::Biweekly(bucket.key),
                anchor: Some(bucket.latest),
                support: bucket.count,
            })
            .collect(),
        RecurrenceFamily::WeekdayMonthly => {
            let keyed = sample.iter().filter_map(|date| {
                let week = week_of_month(*date);
                (week <= crate::schedule::params::MAX_WEEK_OF_MONTH)
                    .then(|| ((week, date.weekday()), *date))
            });
            ranked_buckets(keyed, limit)
                .into_iter()
                .map(|bucket| Candidate {
                    params: ScheduleParams::WeekdayMonthly {
                        week: bucket.key.0,
                        weekday: bucket.key.1,
                    },
                    anchor: None,
                    support: bucket.count,
                })
                .collect()
        }
    }
}

/// Monthly day key: days past the 28th, and February 28th, map to the last day.
pub fn month_day_key(date: NaiveDate) -> MonthDay {
    let day = date.day();
    if day > 28 || (date.month() == 2 && day == 28) {
        MonthDay::Last
    } else {
        MonthDay::Day(day)
    }
}

fn monthly_candidates(dates: &[NaiveDate], limit: usize) -> Vec<Candidate> {
    month_day_buckets(dates, limit)
        .into_iter()
        .map(|bucket| Candidate {
            params: ScheduleParams::Monthly(bucket.key),
            anchor: None,
            support: bucket.count,
        })
        .collect()
}

fn semi_monthly_candidates<R: Rng + ?Sized>(
    dates: &[NaiveDate],
    config: &DetectionConfig,
    rng: &mut R,
) -> Vec<Candidate> {
    let mut distinct: Vec<u32> = dates.iter().map(|date| date.day()).collect();
    distinct.sort_unstable();
    distinct.dedup();

    match distinct.len() {
        0 | 1 => Vec::new(),
        2 => {
            let clusters: [Vec<NaiveDate>; 2] = [0, 1].map(|idx| {
                dates
                    .iter()
                    .copied()
                    .filter(|date| date.day() == distinct[idx])
                    .collect()
            });
            pair_candidates(&clusters, config.candidates_per_family)
        }
        _ => {
            let days: Vec<u32> = dates.iter().map(|date| date.day()).collect();
            let partitions = ranked_partitions(
                &days,
                config.kmeans_restarts,
                config.kmeans_max_iterations,
                rng,
            );
            for partition in &partitions {
                let clusters: [Vec<NaiveDate>; 2] = [0, 1].map(|cluster| {
                    partition
                        .members(cluster)
                        .into_iter()
                        .map(|idx| dates[idx])
                        .collect()
                });
                let candidates = pair_candidates(&clusters, config.candidates_per_family);
                if !candidates.is_empty() {
                    return candidates;
                }
            }
            tracing::warn!(
                partitions = partitions.len(),
                "no semi-monthly split produced usable day pairs"
            );
            Vec::new()
        }
    }
}

/// Cross product of each cluster's likely days, summed support, spaced pairs only.
fn pair_candidates(clusters: &[Vec<NaiveDate>; 2], limit: usize) -> Vec<Candidate> {
    let left = month_day_buckets(&clusters[0], limit);
    let right = month_day_buckets(&clusters[1], limit);

    let mut pairs: Vec<Candidate> = Vec::new();
    for a in &left {
        for b in &right {
            if circular_gap(a.key.value(), b.key.value()) < MIN_SEMI_MONTHLY_GAP {
                continue;
            }
            let params = ScheduleParams::SemiMonthly(a.key.min(b.key), a.key.max(b.key));
            let support = a.count + b.count;
            match pairs.iter_mut().find(|c| c.params == params) {
                Some(existing) => existing.support = existing.support.max(support),
                None => pairs.push(Candidate {
                    params,
                    anchor: None,
                    support,
                }),
            }
        }
    }
    pairs.sort_by(|a, b| b.support.cmp(&a.support));
    pairs.truncate(limit);
    pairs
}

#[derive(Debug, Clone)]
struct Bucket<K> {
    key: K,
    count: usize,
    latest: NaiveDate,
}

fn month_day_buckets(dates: &[NaiveDate], limit: usize) -> Vec<Bucket<MonthDay>> {
    ranked_buckets(dates.iter().map(|date| (month_day_key(*date), *date)), limit)
}

fn weekday_buckets(dates: &[NaiveDate], limit: usize) -> Vec<Bucket<Weekday>> {
    ranked_buckets(dates.iter().map(|date| (date.weekday(), *date)), limit)
}

/// Counts keys and orders buckets by count, then by most recent sighting.
fn ranked_buckets<K, I>(keyed: I, limit: usize) -> Vec<Bucket<K>>
where
    K: Copy + Eq + std::hash::Hash,
    I: IntoIterator<Item = (K, NaiveDate)>,
{
    let mut buckets: HashMap<K, Bucket<K>> = HashMap::new();
    for (key, date) in keyed {
        let bucket = buckets.entry(key).or_insert(Bucket {
            key,
            count: 0,
            latest: date,
        });
        bucket.count += 1;
        bucket.latest = bucket.latest.max(date);
    }
    let mut ranked: Vec<Bucket<K>> = buckets.into_values().collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then(b.latest.cmp(&a.latest)));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn extract(family: RecurrenceFamily, dates: &[NaiveDate]) -> Vec<Candidate> {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        extract_candidates(family, dates, &DetectionConfig::default(), &mut rng)
    }

    #[test]
    fn month_end_days_collapse_to_last_day() {
        assert_eq!(month_day_key(date(2018, 1, 31)), MonthDay::Last);
        assert_eq!(month_day_key(date(2018, 4, 29)), MonthDay::Last);
        assert_eq!(month_day_key(date(2018, 2, 28)), MonthDay::Last);
        assert_eq!(month_day_key(date(2018, 3, 28)), MonthDay::Day(28));
    }

    #[test]
    fn monthly_buckets_rank_by_support() {
        let dates = [
            date(2018, 1, 15),
            date(2018, 2, 15),
            date(2018, 3, 14),
            date(2018, 4, 15),
            date(2018, 5, 31),
        ];
        let candidates = extract(RecurrenceFamily::Monthly, &dates);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].params, ScheduleParams::Monthly(MonthDay::Day(15)));
        assert_eq!(candidates[0].support, 3);
        // Ties fall back to the most recent sighting.
        assert_eq!(candidates[1].params, ScheduleParams::Monthly(MonthDay::Last));
        assert_eq!(candidates[2].params, ScheduleParams::Monthly(MonthDay::Day(14)));
    }

    #[test]
    fn biweekly_candidates_anchor_on_latest_sighting() {
        let dates = [date(2018, 1, 5), date(2018, 1, 19), date(2018, 2, 2)];
        let candidates = extract(RecurrenceFamily::Biweekly, &dates);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].params, ScheduleParams::Biweekly(Weekday::Fri));
        assert_eq!(candidates[0].anchor, Some(date(2018, 2, 2)));
        assert_eq!(candidates[0].support, 3);
    }

    #[test]
    fn weekday_monthly_skips_fifth_week() {
        let dates = [date(2018, 3, 2), date(2018, 3, 30), date(2018, 4, 6)];
        let candidates = extract(RecurrenceFamily::WeekdayMonthly, &dates);
        assert_eq!(candidates.len(), 1);
        assert_eq!(
            candidates[0].params,
            ScheduleParams::WeekdayMonthly {
                week: 1,
                weekday: Weekday::Fri
            }
        );
        assert_eq!(candidates[0].support, 2);
    }

    #[test]
    fn semi_monthly_two_distinct_days_skip_clustering() {
        let dates = [
            date(2019, 9, 13),
            date(2019, 9, 21),
            date(2019, 10, 13),
            date(2019, 10, 21),
            date(2019, 11, 13),
        ];
        let candidates = extract(RecurrenceFamily::SemiMonthly, &dates);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].params, ScheduleParams::semi_monthly(13, 21).unwrap());
        assert_eq!(candidates[0].support, 5);
    }

    #[test]
    fn semi_monthly_two_close_days_are_filtered() {
        let dates = [date(2019, 9, 13), date(2019, 9, 16), date(2019, 10, 13)];
        assert!(extract(RecurrenceFamily::SemiMonthly, &dates).is_empty());
    }

    #[test]
    fn semi_monthly_single_day_has_no_split() {
        let dates = [date(2019, 9, 13), date(2019, 10, 13), date(2019, 11, 13)];
        assert!(extract(RecurrenceFamily::SemiMonthly, &dates).is_empty());
    }

    #[test]
    fn semi_monthly_clusters_noisy_days() {
        let dates = [
            date(2018, 1, 1),
            date(2018, 1, 15),
            date(2018, 2, 2),
            date(2018, 2, 16),
            date(2018, 3, 1),
            date(2018, 3, 15),
        ];
        let candidates = extract(RecurrenceFamily::SemiMonthly, &dates);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].params, ScheduleParams::semi_monthly(1, 15).unwrap());
        assert_eq!(candidates[0].support, 4);
        assert!(candidates.iter().all(|c| c.support <= 4));
    }
}
