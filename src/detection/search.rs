//! Windowed search over families, roll policies and candidate parameters.

use chrono::NaiveDate;
use rand::Rng;
use uuid::Uuid;

use super::candidates::extract_candidates;
use super::matcher::{evaluate_with_cache, GenerationCache, MatchResult};
use super::observations::{most_recent, normalize};
use super::validation::{rank, validate};
use crate::config::DetectionConfig;
use crate::errors::ScheduleError;
use crate::schedule::{RecurrenceFamily, RollPolicy, Schedule};

/// Caller choices for one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub today: NaiveDate,
    /// Require at least two matched occurrences instead of one.
    pub require_multiple_observations: bool,
    /// Give up as soon as a window produces no valid match.
    pub early_stop: bool,
}

impl SearchOptions {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            require_multiple_observations: true,
            early_stop: false,
        }
    }

    pub fn allow_single_observation(mut self) -> Self {
        self.require_multiple_observations = false;
        self
    }

    pub fn with_early_stop(mut self, early_stop: bool) -> Self {
        self.early_stop = early_stop;
        self
    }
}

pub type Combination = (RecurrenceFamily, RollPolicy);

/// One pass of the search over a window of the most recent observations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchIteration {
    pub window: usize,
    /// Family and roll policy pairs tried in this pass.
    pub combinations: Vec<Combination>,
    pub valid: usize,
}

/// Ranked results plus the windows that produced them.
#[derive(Debug, Clone, Default)]
pub struct SearchReport {
    pub results: Vec<MatchResult>,
    pub iterations: Vec<SearchIteration>,
}

/// A configured search, reusable across independent observation sets.
#[derive(Debug, Clone)]
pub struct ScheduleSearch {
    config: DetectionConfig,
    options: SearchOptions,
}

impl ScheduleSearch {
    pub fn new(options: SearchOptions) -> Self {
        Self::with_config(DetectionConfig::default(), options)
    }

    pub fn with_config(config: DetectionConfig, options: SearchOptions) -> Self {
        Self { config, options }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Ranked valid matches for `observed`, best first; empty when nothing validates.
    pub fn run(&self, observed: &[NaiveDate]) -> Result<Vec<MatchResult>, ScheduleError> {
        self.run_with_rng(observed, &mut rand::thread_rng())
    }

    /// Same as [`ScheduleSearch::run`] with a caller-supplied random source for clustering.
    pub fn run_with_rng<R: Rng + ?Sized>(
        &self,
        observed: &[NaiveDate],
        rng: &mut R,
    ) -> Result<Vec<MatchResult>, ScheduleError> {
        Ok(self.report_with_rng(observed, rng)?.results)
    }

    /// Runs the search and keeps a record of every window it evaluated.
    pub fn report_with_rng<R: Rng + ?Sized>(
        &self,
        observed: &[NaiveDate],
        rng: &mut R,
    ) -> Result<SearchReport, ScheduleError> {
        let span = tracing::debug_span!("schedule_search", search_id = %Uuid::new_v4());
        let _enter = span.enter();

        let observed = normalize(observed.iter().copied());
        let total = observed.len();
        if total == 0 {
            return Ok(SearchReport::default());
        }

        let mut cache = GenerationCache::new();
        let mut combinations: Vec<Combination> = RecurrenceFamily::ALL
            .iter()
            .flat_map(|family| RollPolicy::ALL.iter().map(move |roll| (*family, *roll)))
            .collect();
        let mut window = self.config.initial_window.min(total);
        let mut depth = 0;
        let mut found: Vec<MatchResult> = Vec::new();
        let mut iterations: Vec<SearchIteration> = Vec::new();

        loop {
            depth += 1;
            let recent = most_recent(&observed, window);
            let valid = self.evaluate_window(recent, &combinations, rng, &mut cache)?;
            tracing::debug!(
                depth,
                window,
                combinations = combinations.len(),
                valid = valid.len(),
                "search iteration"
            );

            let valid_count = valid.len();
            iterations.push(SearchIteration {
                window,
                combinations: combinations.clone(),
                valid: valid_count,
            });
            if valid_count > 0 {
                combinations = valid
                    .iter()
                    .map(|result| (result.family, result.roll_policy))
                    .fold(Vec::new(), |mut acc, combination| {
                        if !acc.contains(&combination) {
                            acc.push(combination);
                        }
                        acc
                    });
            }
            found.extend(valid);

            if valid_count == 1 {
                break;
            }
            if valid_count == 0 && self.options.early_stop {
                break;
            }
            if window >= total || depth >= self.config.max_search_depth {
                break;
            }
            window = if found.is_empty() {
                window + 1
            } else {
                window * 2
            }
            .min(total);
        }

        let ranked = rank(found, &self.config);
        match ranked.first() {
            Some(best) => tracing::info!(
                family = %best.family,
                params = %best.params,
                roll_policy = %best.roll_policy,
                confidence = best.confidence_percent,
                match_score = best.match_score,
                candidates = ranked.len(),
                cache_hits = cache.hits(),
                "best schedule selected"
            ),
            None => tracing::info!(observations = total, "no schedule validated"),
        }
        Ok(SearchReport {
            results: ranked,
            iterations,
        })
    }

    /// Evaluates every candidate of every remaining combination on `window`,
    /// returning the ones that validate.
    fn evaluate_window<R: Rng + ?Sized>(
        &self,
        window: &[NaiveDate],
        combinations: &[Combination],
        rng: &mut R,
        cache: &mut GenerationCache,
    ) -> Result<Vec<MatchResult>, ScheduleError> {
        let mut valid = Vec::new();
        for family in RecurrenceFamily::ALL {
            let rolls: Vec<RollPolicy> = combinations
                .iter()
                .filter(|(candidate_family, _)| *candidate_family == family)
                .map(|(_, roll)| *roll)
                .collect();
            if rolls.is_empty() {
                continue;
            }

            for candidate in extract_candidates(family, window, &self.config, rng) {
                for roll in &rolls {
                    let schedule =
                        Schedule::new(candidate.params.clone(), roll.value(), candidate.anchor)?;
                    let result = evaluate_with_cache(
                        &schedule,
                        window,
                        self.options.today,
                        &self.config,
                        Some(&mut *cache),
                    )?;
                    let outcome = validate(
                        &result,
                        self.options.require_multiple_observations,
                        &self.config,
                    );
                    if outcome.accepted {
                        valid.push(result);
                    }
                }
            }
        }
        Ok(valid)
    }
}

/// Runs a search with the default configuration and fresh randomness.
pub fn find_best(
    observed: &[NaiveDate],
    options: SearchOptions,
) -> Result<Vec<MatchResult>, ScheduleError> {
    ScheduleSearch::new(options).run(observed)
}
