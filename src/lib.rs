#![doc(test(attr(deny(warnings))))]

//! Cadence Core infers and validates recurring calendar schedules (paychecks,
//! bills) from noisy, partially observed sequences of transaction dates.
//!
//! The crate is a pure, synchronous engine: callers hand it calendar dates and a
//! "today" reference, and receive typed match results, validation outcomes, and
//! accepted schedule parameters to persist on their side.

pub mod calendar;
pub mod config;
pub mod detection;
pub mod errors;
pub mod schedule;
pub mod utils;

use std::sync::Once;

pub use config::DetectionConfig;
pub use detection::{
    find_best, AcceptedSchedule, GenerationCache, MatchPair, MatchResult, ReasonCode,
    ScheduleSearch, SearchOptions, ValidationOutcome,
};
pub use errors::{ConfigError, ScheduleError, ValidationFailure};
pub use schedule::{MonthDay, RecurrenceFamily, RollPolicy, Schedule, ScheduleParams};

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Cadence Core tracing initialized.");
    });
}
