use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Enumerates the supported recurrence patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceFamily {
    Monthly,
    SemiMonthly,
    Weekly,
    Biweekly,
    WeekdayMonthly,
}

impl RecurrenceFamily {
    pub const ALL: [RecurrenceFamily; 5] = [
        RecurrenceFamily::Monthly,
        RecurrenceFamily::SemiMonthly,
        RecurrenceFamily::Weekly,
        RecurrenceFamily::Biweekly,
        RecurrenceFamily::WeekdayMonthly,
    ];

    /// Tie-break rank used when ordering valid matches; lower is preferred.
    pub fn preference_rank(self) -> u8 {
        match self {
            RecurrenceFamily::Weekly | RecurrenceFamily::Biweekly => 0,
            RecurrenceFamily::Monthly | RecurrenceFamily::SemiMonthly => 1,
            RecurrenceFamily::WeekdayMonthly => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecurrenceFamily::Monthly => "monthly",
            RecurrenceFamily::SemiMonthly => "semi_monthly",
            RecurrenceFamily::Weekly => "weekly",
            RecurrenceFamily::Biweekly => "biweekly",
            RecurrenceFamily::WeekdayMonthly => "weekday_monthly",
        }
    }
}

impl fmt::Display for RecurrenceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurrenceFamily {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(&['-', ' '][..], "_");
        match normalized.as_str() {
            "monthly" => Ok(RecurrenceFamily::Monthly),
            "semi_monthly" | "semimonthly" => Ok(RecurrenceFamily::SemiMonthly),
            "weekly" => Ok(RecurrenceFamily::Weekly),
            "biweekly" | "bi_weekly" => Ok(RecurrenceFamily::Biweekly),
            "weekday_monthly" | "weekdaymonthly" => Ok(RecurrenceFamily::WeekdayMonthly),
            other => Err(format!("unknown recurrence family `{other}`")),
        }
    }
}
