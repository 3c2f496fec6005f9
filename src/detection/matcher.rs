//! Fuzzy pairing of predicted dates with observations, and the two scores that
//! summarize a match.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use super::observations::normalize;
use crate::config::DetectionConfig;
use crate::errors::ScheduleError;
use crate::schedule::{RecurrenceFamily, RollPolicy, Schedule, ScheduleParams};

/// Difference reported for a prediction nothing matched.
pub const UNMATCHED_DIFFERENCE: i64 = -1;

/// A predicted date and the observation paired with it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchPair {
    pub predicted: NaiveDate,
    pub observed: Option<NaiveDate>,
    pub day_difference: i64,
}

impl MatchPair {
    fn matched(predicted: NaiveDate, observed: NaiveDate, difference: u32) -> Self {
        Self {
            predicted,
            observed: Some(observed),
            day_difference: difference as i64,
        }
    }

    fn unmatched(predicted: NaiveDate) -> Self {
        Self {
            predicted,
            observed: None,
            day_difference: UNMATCHED_DIFFERENCE,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.observed.is_some()
    }

    /// Absolute day difference for matched pairs.
    pub fn difference(&self) -> Option<u32> {
        self.observed.map(|_| self.day_difference as u32)
    }
}

/// Outcome of evaluating one schedule against a set of observations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub family: RecurrenceFamily,
    pub params: ScheduleParams,
    pub roll_policy: RollPolicy,
    pub anchor: Option<NaiveDate>,
    pub confidence_percent: u32,
    pub percentage_of_observed_matched: u32,
    pub match_score: f64,
    pub pairs: Vec<MatchPair>,
    pub unmatched_observed: Vec<NaiveDate>,
    pub match_count: usize,
    pub prediction_count: usize,
    pub observed_count: usize,
    /// Earliest observation that matched a prediction.
    pub reanchor_date: Option<NaiveDate>,
    #[serde(skip)]
    pub schedule: Schedule,
}

impl MatchResult {
    /// Recency-weighted score computed as if `horizon` predictions had been made.
    ///
    /// Positions beyond this result's own predictions contribute nothing but still
    /// count towards the weight total, which lets results with different
    /// prediction counts be compared.
    pub fn score_at_horizon(&self, horizon: usize, config: &DetectionConfig) -> f64 {
        recency_score(&self.pairs, self.unmatched_observed.len(), horizon, config)
    }

    /// The most recent prediction, if any.
    pub fn last_pair(&self) -> Option<&MatchPair> {
        self.pairs.last()
    }
}

/// Memoized predicted-date lists, owned by one top-level search.
#[derive(Debug, Default)]
pub struct GenerationCache {
    entries: HashMap<(Schedule, NaiveDate, NaiveDate), Vec<NaiveDate>>,
    hits: usize,
}

impl GenerationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn predictions(
        &mut self,
        schedule: &Schedule,
        min: NaiveDate,
        max: NaiveDate,
    ) -> Result<Vec<NaiveDate>, ScheduleError> {
        let key = (schedule.clone(), min, max);
        if let Some(dates) = self.entries.get(&key) {
            self.hits += 1;
            return Ok(dates.clone());
        }
        let dates = schedule.between(min, max, true)?;
        self.entries.insert(key, dates.clone());
        Ok(dates)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }
}

/// Evaluates `schedule` against `observed` as of `today`.
pub fn evaluate(
    schedule: &Schedule,
    observed: &[NaiveDate],
    today: NaiveDate,
    config: &DetectionConfig,
) -> Result<MatchResult, ScheduleError> {
    evaluate_with_cache(schedule, observed, today, config, None)
}

/// Same as [`evaluate`], reusing predicted dates from `cache` when given.
pub fn evaluate_with_cache(
    schedule: &Schedule,
    observed: &[NaiveDate],
    today: NaiveDate,
    config: &DetectionConfig,
    cache: Option<&mut GenerationCache>,
) -> Result<MatchResult, ScheduleError> {
    let observed = normalize(observed.iter().copied());
    let (first, last) = match (observed.first(), observed.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Ok(score(schedule, Vec::new(), Vec::new(), 0, config)),
    };

    let lead = Duration::days(config.lead_days as i64);
    let min = first - lead;
    // A transaction due within the lead window after the last one is not a miss yet.
    let max = today.max(last + lead);
    let predictions = match cache {
        Some(cache) => cache.predictions(schedule, min, max)?,
        None => schedule.between(min, max, true)?,
    };

    let (mut pairs, consumed) = pair_predictions(&predictions, &observed, config.fuzziness_days);
    if pairs
        .last()
        .is_some_and(|pair| pair.predicted == today && !pair.is_matched())
    {
        pairs.pop();
    }

    let unmatched_observed: Vec<NaiveDate> = observed
        .iter()
        .zip(&consumed)
        .filter(|(_, used)| !**used)
        .map(|(date, _)| *date)
        .collect();

    Ok(score(schedule, pairs, unmatched_observed, observed.len(), config))
}

/// Oldest prediction first, each takes the closest unconsumed observation within
/// the fuzziness window; ties go to the earlier observation.
fn pair_predictions(
    predictions: &[NaiveDate],
    observed: &[NaiveDate],
    fuzziness_days: u32,
) -> (Vec<MatchPair>, Vec<bool>) {
    let mut consumed = vec![false; observed.len()];
    let mut pairs = Vec::with_capacity(predictions.len());

    for predicted in predictions {
        let mut best: Option<(usize, u32)> = None;
        for (idx, date) in observed.iter().enumerate() {
            if consumed[idx] {
                continue;
            }
            let difference = (*date - *predicted).num_days().unsigned_abs();
            if difference > fuzziness_days as u64 {
                continue;
            }
            let difference = difference as u32;
            if best.map_or(true, |(_, current)| difference < current) {
                best = Some((idx, difference));
            }
        }
        match best {
            Some((idx, difference)) => {
                consumed[idx] = true;
                pairs.push(MatchPair::matched(*predicted, observed[idx], difference));
            }
            None => pairs.push(MatchPair::unmatched(*predicted)),
        }
    }

    (pairs, consumed)
}

fn score(
    schedule: &Schedule,
    pairs: Vec<MatchPair>,
    unmatched_observed: Vec<NaiveDate>,
    observed_count: usize,
    config: &DetectionConfig,
) -> MatchResult {
    let window = config.fuzziness_days as u64 + 1;
    let prediction_count = pairs.len();
    let match_count = pairs.iter().filter(|pair| pair.is_matched()).count();
    let closeness: u64 = pairs
        .iter()
        .filter_map(MatchPair::difference)
        .map(|difference| window.saturating_sub(difference as u64))
        .sum();

    let confidence_percent = ceil_percent(closeness, window * prediction_count as u64);
    let percentage_of_observed_matched = ceil_percent(match_count as u64, observed_count as u64);
    let match_score = recency_score(&pairs, unmatched_observed.len(), prediction_count, config);
    let reanchor_date = pairs.iter().filter_map(|pair| pair.observed).min();

    MatchResult {
        family: schedule.family(),
        params: schedule.params().clone(),
        roll_policy: schedule.roll_policy(),
        anchor: schedule.anchor(),
        confidence_percent,
        percentage_of_observed_matched,
        match_score,
        pairs,
        unmatched_observed,
        match_count,
        prediction_count,
        observed_count,
        reanchor_date,
        schedule: schedule.clone(),
    }
}

/// `ceil(100 * numerator / denominator)` in integer arithmetic; zero when empty.
fn ceil_percent(numerator: u64, denominator: u64) -> u32 {
    if denominator == 0 {
        return 0;
    }
    ((100 * numerator + denominator - 1) / denominator) as u32
}

/// How close a matched pair is, from 1.0 (same day) down to the window edge.
pub fn fuzziness_score(difference: u32, fuzziness_days: u32) -> f64 {
    let window = fuzziness_days as f64 + 1.0;
    ((window - difference as f64) / window).max(0.0)
}

/// Most recent pair first with weight `decay^i`: matches add their closeness,
/// misses subtract their weight. The weighted mean is then penalized by the
/// smallest weight per unexplained observation, floored at zero, rounded to 3 places.
fn recency_score(
    pairs: &[MatchPair],
    unmatched_observed: usize,
    horizon: usize,
    config: &DetectionConfig,
) -> f64 {
    let horizon = horizon.max(pairs.len());
    if horizon == 0 {
        return 0.0;
    }

    let mut total = 0.0;
    let mut weight_sum = 0.0;
    let mut weight = 1.0;
    let mut smallest = 1.0;
    let mut recent_first = pairs.iter().rev();
    for _ in 0..horizon {
        weight_sum += weight;
        smallest = weight;
        match recent_first.next().map(MatchPair::difference) {
            Some(Some(difference)) => {
                total += fuzziness_score(difference, config.fuzziness_days) * weight
            }
            Some(None) => total -= weight,
            None => {}
        }
        weight *= config.recency_decay;
    }

    let score = total / weight_sum - unmatched_observed as f64 * smallest;
    (score.max(0.0) * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly(day: i64) -> Schedule {
        Schedule::new(ScheduleParams::monthly(day).unwrap(), 0, None).unwrap()
    }

    #[test]
    fn fuzziness_scores_step_down_by_quarters() {
        assert_eq!(fuzziness_score(0, 3), 1.0);
        assert_eq!(fuzziness_score(1, 3), 0.75);
        assert_eq!(fuzziness_score(3, 3), 0.25);
    }

    #[test]
    fn perfect_monthly_match() {
        let observed = [date(2018, 1, 15), date(2018, 2, 15), date(2018, 3, 15)];
        let result = evaluate(&monthly(15), &observed, date(2018, 3, 20), &Default::default())
            .unwrap();
        assert_eq!(result.prediction_count, 3);
        assert_eq!(result.match_count, 3);
        assert_eq!(result.confidence_percent, 100);
        assert_eq!(result.percentage_of_observed_matched, 100);
        assert_eq!(result.match_score, 1.0);
        assert!(result.unmatched_observed.is_empty());
        assert_eq!(result.reanchor_date, Some(date(2018, 1, 15)));
    }

    #[test]
    fn late_observations_lower_confidence() {
        let observed = [date(2018, 1, 16), date(2018, 2, 15), date(2018, 3, 18)];
        let result = evaluate(&monthly(15), &observed, date(2018, 3, 20), &Default::default())
            .unwrap();
        // (0.75 + 1.0 + 0.25) / 3 = 0.667 -> 67%
        assert_eq!(result.confidence_percent, 67);
        assert_eq!(
            result.pairs.iter().map(|p| p.day_difference).collect::<Vec<_>>(),
            vec![1, 0, 3]
        );
    }

    #[test]
    fn missed_prediction_is_recorded_with_sentinel() {
        let observed = [date(2018, 1, 15), date(2018, 3, 15)];
        let result = evaluate(&monthly(15), &observed, date(2018, 3, 16), &Default::default())
            .unwrap();
        assert_eq!(result.prediction_count, 3);
        assert_eq!(result.match_count, 2);
        assert_eq!(result.pairs[1].observed, None);
        assert_eq!(result.pairs[1].day_difference, UNMATCHED_DIFFERENCE);
        assert_eq!(result.confidence_percent, 67);
        // weights 1, 0.9, 0.81: (1 - 0.9 + 0.81) / 2.71
        assert_eq!(result.match_score, 0.336);
    }

    #[test]
    fn prediction_due_today_is_not_penalized() {
        let observed = [date(2018, 1, 15), date(2018, 2, 15)];
        let today = date(2018, 3, 15);
        let result = evaluate(&monthly(15), &observed, today, &Default::default()).unwrap();
        assert_eq!(result.prediction_count, 2);
        assert_eq!(result.confidence_percent, 100);
    }

    #[test]
    fn unexplained_observations_reduce_score() {
        let observed = [date(2018, 1, 15), date(2018, 1, 25), date(2018, 2, 15)];
        let result = evaluate(&monthly(15), &observed, date(2018, 2, 16), &Default::default())
            .unwrap();
        assert_eq!(result.unmatched_observed, vec![date(2018, 1, 25)]);
        assert_eq!(result.percentage_of_observed_matched, 67);
        // 1.0 - 1 * 0.9
        assert_eq!(result.match_score, 0.1);
    }

    #[test]
    fn each_observation_is_consumed_once() {
        use chrono::Weekday;
        let weekly =
            Schedule::new(ScheduleParams::weekly([Weekday::Mon, Weekday::Thu]).unwrap(), 0, None)
                .unwrap();
        // Tuesday 2018-01-02 sits within 3 days of both Monday 01-01 and Thursday 01-04.
        let observed = [date(2018, 1, 2)];
        let result = evaluate(&weekly, &observed, date(2018, 1, 5), &Default::default()).unwrap();
        assert_eq!(result.prediction_count, 2);
        assert_eq!(result.match_count, 1);
        assert_eq!(result.pairs[0].observed, Some(date(2018, 1, 2)));
        assert_eq!(result.pairs[0].day_difference, 1);
        assert!(!result.pairs[1].is_matched());
    }

    #[test]
    fn horizon_padding_lowers_shorter_results() {
        let observed = [date(2018, 1, 15), date(2018, 2, 15)];
        let config = DetectionConfig::default();
        let result = evaluate(&monthly(15), &observed, date(2018, 2, 16), &config).unwrap();
        assert_eq!(result.score_at_horizon(2, &config), 1.0);
        // (1 + 0.9) / (1 + 0.9 + 0.81)
        assert_eq!(result.score_at_horizon(3, &config), 0.701);
    }

    #[test]
    fn cache_reuses_generated_dates() {
        let observed = [date(2018, 1, 15), date(2018, 2, 15)];
        let config = DetectionConfig::default();
        let mut cache = GenerationCache::new();
        let schedule = monthly(15);
        let a = evaluate_with_cache(&schedule, &observed, date(2018, 2, 16), &config, Some(&mut cache))
            .unwrap();
        let b = evaluate_with_cache(&schedule, &observed, date(2018, 2, 16), &config, Some(&mut cache))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn empty_observations_score_zero() {
        let result = evaluate(&monthly(15), &[], date(2018, 2, 16), &Default::default()).unwrap();
        assert_eq!(result.prediction_count, 0);
        assert_eq!(result.confidence_percent, 0);
        assert_eq!(result.match_score, 0.0);
    }
}
