//! Degree-of-success tiers and the rule that determines them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The four outcome tiers a check can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegreeOfSuccess {
    /// Beat the DC by 10 or more (or upgraded by a natural 20).
    CriticalSuccess,
    /// Met or beat the DC.
    Success,
    /// Missed the DC by less than 10.
    Failure,
    /// Missed the DC by 10 or more (or downgraded by a natural 1).
    CriticalFailure,
}

impl DegreeOfSuccess {
    /// Determines the tier for a d20 check: the total against the DC with
    /// the ±10 critical margins, then the natural-1/natural-20 one-step
    /// shift.
    #[must_use]
    pub fn from_check(natural: u32, total: i32, dc: i32) -> Self {
        let by_margin = if total >= dc + 10 {
            Self::CriticalSuccess
        } else if total >= dc {
            Self::Success
        } else if total > dc - 10 {
            Self::Failure
        } else {
            Self::CriticalFailure
        };
        match natural {
            1 => by_margin.degraded(),
            20 => by_margin.upgraded(),
            _ => by_margin,
        }
    }

    /// One step better, saturating at critical success.
    #[must_use]
    pub fn upgraded(self) -> Self {
        match self {
            Self::CriticalSuccess | Self::Success => Self::CriticalSuccess,
            Self::Failure => Self::Success,
            Self::CriticalFailure => Self::Failure,
        }
    }

    /// One step worse, saturating at critical failure.
    #[must_use]
    pub fn degraded(self) -> Self {
        match self {
            Self::CriticalSuccess => Self::Success,
            Self::Success => Self::Failure,
            Self::Failure | Self::CriticalFailure => Self::CriticalFailure,
        }
    }

    /// Whether this tier counts as a success.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::CriticalSuccess | Self::Success)
    }
}

impl fmt::Display for DegreeOfSuccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CriticalSuccess => "critical success",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::CriticalFailure => "critical failure",
        };
        f.write_str(label)
    }
}
