use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::{banking_day_within, is_banking_day};

/// How a generated date is moved off a non-banking day.
///
/// `0` leaves dates alone. Negative values roll back and positive values roll
/// forward, by at most as many days as the magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RollPolicy(i8);

impl RollPolicy {
    pub const NONE: RollPolicy = RollPolicy(0);
    pub const PRECEDING: RollPolicy = RollPolicy(-1);
    pub const FOLLOWING: RollPolicy = RollPolicy(1);
    pub const MODIFIED_PRECEDING: RollPolicy = RollPolicy(-2);
    pub const MODIFIED_FOLLOWING: RollPolicy = RollPolicy(2);

    /// Every policy, in ranking preference order.
    pub const ALL: [RollPolicy; 5] = [
        RollPolicy::PRECEDING,
        RollPolicy::NONE,
        RollPolicy::FOLLOWING,
        RollPolicy::MODIFIED_PRECEDING,
        RollPolicy::MODIFIED_FOLLOWING,
    ];

    pub fn new(value: i8) -> Option<RollPolicy> {
        if (-2..=2).contains(&value) {
            Some(RollPolicy(value))
        } else {
            None
        }
    }

    pub fn value(self) -> i8 {
        self.0
    }

    /// Tie-break rank used when ordering valid matches; lower is preferred.
    pub fn preference_rank(self) -> usize {
        RollPolicy::ALL
            .iter()
            .position(|policy| *policy == self)
            .unwrap_or(RollPolicy::ALL.len())
    }

    /// Moves `date` onto a banking day according to the policy.
    ///
    /// The sign picks the direction and the magnitude how many days the date may
    /// move. A date with no banking day within reach stays where it is.
    pub fn apply(self, date: NaiveDate) -> NaiveDate {
        if self.0 == 0 || is_banking_day(date) {
            return date;
        }
        banking_day_within(date, self.0 as i64).unwrap_or(date)
    }
}

impl Default for RollPolicy {
    fn default() -> Self {
        RollPolicy::NONE
    }
}

impl fmt::Display for RollPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
