//! Check kinds and execution identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rng::DeterministicRng;

/// The three kinds of check the engine executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// A kingdom activity chosen by a participant.
    Action,
    /// A triggered random event.
    Event,
    /// A triggered unrest incident.
    Incident,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Action => "action",
            Self::Event => "event",
            Self::Incident => "incident",
        };
        f.write_str(label)
    }
}

/// Unique token identifying one attempt at resolving a check.
///
/// Format: `turn{N}-{check-id}-{6 hex digits}`, so identifiers sort by
/// turn and remain readable in logs and audit entries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// Generates a fresh identifier for one attempt at `check_id` on the
    /// given turn.
    pub fn generate(turn: u32, check_id: &str, rng: &mut dyn DeterministicRng) -> Self {
        let suffix = rng.next_u32_range(0, 0x00ff_ffff);
        Self(format!("turn{turn}-{check_id}-{suffix:06x}"))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExecutionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for ExecutionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
