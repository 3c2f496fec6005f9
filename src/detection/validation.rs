//! Acceptance rules for a match, ranking among valid matches, and re-validation of
//! a previously accepted schedule against fresh observations.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use super::matcher::{evaluate, MatchResult};
use super::observations::normalize;
use crate::config::DetectionConfig;
use crate::errors::{ScheduleError, ValidationFailure};
use crate::schedule::{week_parity, RecurrenceFamily, RollPolicy, Schedule, ScheduleParams};

/// Machine readable rejection category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    DifferentSchedule,
    NotEnoughHistory,
    StoppedOccurring,
}

impl ReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasonCode::DifferentSchedule => "different_schedule",
            ReasonCode::NotEnoughHistory => "not_enough_history",
            ReasonCode::StoppedOccurring => "stopped_occurring",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub accepted: bool,
    pub reason: Option<ReasonCode>,
    pub message: Option<String>,
    pub missed_date: Option<NaiveDate>,
}

impl ValidationOutcome {
    fn accepted() -> Self {
        Self {
            accepted: true,
            reason: None,
            message: None,
            missed_date: None,
        }
    }

    fn rejected(reason: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
            message: Some(message.into()),
            missed_date: None,
        }
    }

    /// `Ok(())` when accepted, the typed failure otherwise.
    pub fn into_result(self) -> Result<(), ValidationFailure> {
        match self.reason {
            Some(reason) if !self.accepted => Err(ValidationFailure {
                reason,
                message: self.message.unwrap_or_else(|| reason.to_string()),
                missed_date: self.missed_date,
            }),
            _ => Ok(()),
        }
    }
}

/// Applies the acceptance rules in order; the first failing rule decides.
pub fn validate(
    result: &MatchResult,
    require_multiple_observations: bool,
    config: &DetectionConfig,
) -> ValidationOutcome {
    if result.percentage_of_observed_matched <= config.min_observed_match_percent {
        return ValidationOutcome::rejected(
            ReasonCode::DifferentSchedule,
            format!(
                "Only {}% of the observed dates fit this {} schedule; they follow a different schedule",
                result.percentage_of_observed_matched, result.family
            ),
        );
    }

    let required_matches = if require_multiple_observations { 2 } else { 1 };
    let enough_matches = result.match_count >= required_matches;
    let enough_history = if result.observed_count < 4 {
        enough_matches
    } else {
        enough_matches || result.prediction_count > 2
    };
    if !enough_history {
        return ValidationOutcome::rejected(
            ReasonCode::NotEnoughHistory,
            format!(
                "Not enough history: {} matched occurrence(s), {} required",
                result.match_count, required_matches
            ),
        );
    }

    if result.confidence_percent < config.min_confidence_percent {
        return ValidationOutcome::rejected(
            ReasonCode::DifferentSchedule,
            format!(
                "Confidence {}% is below {}%; the dates follow a different schedule",
                result.confidence_percent, config.min_confidence_percent
            ),
        );
    }

    if let Some(last) = result.last_pair() {
        let recovered = last_observed(result).is_some_and(|date| date > last.predicted);
        if !last.is_matched() && !recovered {
            let mut outcome = ValidationOutcome::rejected(
                ReasonCode::StoppedOccurring,
                format!("Stopped occurring: nothing was observed around {}", last.predicted),
            );
            outcome.missed_date = Some(last.predicted);
            return outcome;
        }
    }

    ValidationOutcome::accepted()
}

fn last_observed(result: &MatchResult) -> Option<NaiveDate> {
    result
        .pairs
        .iter()
        .filter_map(|pair| pair.observed)
        .chain(result.unmatched_observed.iter().copied())
        .max()
}

/// Orders valid results best first and drops repeated schedules, keeping the
/// better ranked copy.
///
/// Each pair is compared at its own horizon (see [`compare`]), which is not a
/// total order across a whole list, so results are placed by insertion: a
/// result goes ahead of the first ranked result it beats.
pub fn rank(results: Vec<MatchResult>, config: &DetectionConfig) -> Vec<MatchResult> {
    let mut ordered: Vec<MatchResult> = Vec::with_capacity(results.len());
    for result in results {
        let position = ordered
            .iter()
            .position(|ranked| {
                compare(&result, ranked, config)
                    .then_with(|| result.anchor.cmp(&ranked.anchor))
                    == Ordering::Less
            })
            .unwrap_or(ordered.len());
        ordered.insert(position, result);
    }

    let mut ranked: Vec<MatchResult> = Vec::with_capacity(ordered.len());
    for result in ordered {
        if !ranked.iter().any(|kept| same_schedule(kept, &result)) {
            ranked.push(result);
        }
    }
    ranked
}

/// Same family, params and roll policy, and for biweekly the same week parity.
fn same_schedule(a: &MatchResult, b: &MatchResult) -> bool {
    a.family == b.family
        && a.params == b.params
        && a.roll_policy == b.roll_policy
        && a.anchor.map(week_parity) == b.anchor.map(week_parity)
}

/// Orders two results, scoring both at the larger of their prediction counts.
pub fn compare(a: &MatchResult, b: &MatchResult, config: &DetectionConfig) -> Ordering {
    let horizon = a.prediction_count.max(b.prediction_count);
    b.score_at_horizon(horizon, config)
        .total_cmp(&a.score_at_horizon(horizon, config))
        .then_with(|| tie_break(a, b))
}

/// More matches, then family preference, then roll policy preference.
fn tie_break(a: &MatchResult, b: &MatchResult) -> Ordering {
    b.match_count
        .cmp(&a.match_count)
        .then(a.family.preference_rank().cmp(&b.family.preference_rank()))
        .then(
            a.roll_policy
                .preference_rank()
                .cmp(&b.roll_policy.preference_rank()),
        )
}

/// Outcome of re-checking a schedule, with the match it was decided on.
#[derive(Debug, Clone)]
pub struct Revalidation {
    pub outcome: ValidationOutcome,
    pub result: MatchResult,
    /// Oldest observations dropped before the decision.
    pub dropped: usize,
}

/// Re-checks `schedule` against fresh observations.
///
/// Any rejection other than "stopped occurring" is retried without the oldest
/// observation, re-anchored on the earliest remaining one, until the floor from
/// the config is reached.
pub fn revalidate(
    schedule: &Schedule,
    observed: &[NaiveDate],
    today: NaiveDate,
    require_multiple_observations: bool,
    config: &DetectionConfig,
) -> Result<Revalidation, ScheduleError> {
    let mut observed = normalize(observed.iter().copied());
    let mut schedule = schedule.clone();
    let mut dropped = 0;

    loop {
        let result = evaluate(&schedule, &observed, today, config)?;
        let outcome = validate(&result, require_multiple_observations, config);
        let retry = !outcome.accepted
            && outcome.reason != Some(ReasonCode::StoppedOccurring)
            && observed.len() > config.revalidation_floor;
        if !retry {
            return Ok(Revalidation {
                outcome,
                result,
                dropped,
            });
        }

        observed.remove(0);
        dropped += 1;
        if let Some(earliest) = observed.first() {
            schedule = schedule.reanchored(*earliest)?;
        }
        tracing::debug!(
            family = %schedule.family(),
            reason = ?outcome.reason,
            remaining = observed.len(),
            "retrying validation without the oldest observation"
        );
    }
}

/// What a caller persists once a match is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedSchedule {
    pub family: RecurrenceFamily,
    pub params: ScheduleParams,
    pub roll_policy: RollPolicy,
    pub anchor: Option<NaiveDate>,
}

impl AcceptedSchedule {
    /// Rebuilds the schedule this record describes.
    pub fn to_schedule(&self) -> Result<Schedule, ScheduleError> {
        Schedule::new(self.params.clone(), self.roll_policy.value(), self.anchor)
    }
}

/// Persisted shape of `result`, anchored on its first matched observation.
pub fn accept(result: &MatchResult) -> AcceptedSchedule {
    let anchor = result
        .reanchor_date
        .map(|date| crate::schedule::normalized_anchor(&result.params, Some(date)))
        .unwrap_or(result.anchor);
    AcceptedSchedule {
        family: result.family,
        params: result.params.clone(),
        roll_policy: result.roll_policy,
        anchor,
    }
}
