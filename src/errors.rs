use std::io;

use chrono::NaiveDate;
use thiserror::Error;

use crate::detection::validation::ReasonCode;
use crate::schedule::RecurrenceFamily;

/// Errors raised while building or querying a [`crate::schedule::Schedule`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("Invalid {family} schedule {params}: {reason}")]
    InvalidSchedule {
        family: RecurrenceFamily,
        params: String,
        reason: String,
    },
    #[error("Invalid range: {min} is after {max}")]
    InvalidRange { min: NaiveDate, max: NaiveDate },
}

impl ScheduleError {
    pub(crate) fn invalid(
        family: RecurrenceFamily,
        params: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ScheduleError::InvalidSchedule {
            family,
            params: params.into(),
            reason: reason.into(),
        }
    }

    /// Human readable reason for construction failures, `None` for range errors.
    pub fn reason(&self) -> Option<&str> {
        match self {
            ScheduleError::InvalidSchedule { reason, .. } => Some(reason),
            ScheduleError::InvalidRange { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Business-rule rejection of a match, carried as an error for callers that prefer `?`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationFailure {
    pub reason: ReasonCode,
    pub message: String,
    pub missed_date: Option<NaiveDate>,
}
