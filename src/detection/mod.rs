//! Detection pipeline: observations feed candidate extraction, candidates become
//! schedules that the matcher scores, and the search keeps what validates.

pub mod candidates;
pub mod clustering;
pub mod matcher;
pub mod observations;
pub mod search;
pub mod validation;

pub use candidates::{extract_candidates, Candidate};
pub use matcher::{evaluate, evaluate_with_cache, GenerationCache, MatchPair, MatchResult};
pub use search::{find_best, Combination, ScheduleSearch, SearchIteration, SearchOptions, SearchReport};
pub use validation::{
    accept, rank, revalidate, validate, AcceptedSchedule, ReasonCode, Revalidation,
    ValidationOutcome,
};
