//! The pipeline context: one in-flight check execution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use stronghold_core::check::{CheckKind, ExecutionId};
use stronghold_core::error::EngineError;
use stronghold_core::outcome::DegreeOfSuccess;
use stronghold_core::resource::Resource;
use stronghold_store::document::{
    ActorSheet, ChosenSkill, ExecutionRecord, ExecutionStatus, OutcomePreview, PausedAt,
    RollState,
};

/// The caller-supplied inputs for starting one check execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSeed {
    /// Initiating participant.
    pub initiator: String,
    /// Skill to attempt the check with.
    pub skill: String,
    /// The acting character.
    pub actor: ActorSheet,
    /// Roll twice, keep higher.
    #[serde(default)]
    pub fortune: bool,
}

/// The result of the final mutation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// The completed execution.
    pub execution_id: ExecutionId,
    /// Check identifier.
    pub check_id: String,
    /// Final outcome tier.
    pub degree: DegreeOfSuccess,
    /// Resource deltas applied by the automatic phase.
    pub applied_deltas: BTreeMap<Resource, i64>,
    /// Messages from the effect table and the custom mutation hook.
    pub messages: Vec<String>,
}

/// The unit of work carried through all nine pipeline steps.
///
/// Invariant: once `user_confirmed` is set, `resolution` is never cleared
/// until step 9 completes.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Unique per-attempt identifier. Immutable.
    pub execution_id: ExecutionId,
    /// Check kind. Immutable.
    pub kind: CheckKind,
    /// Check identifier. Immutable.
    pub check_id: String,
    /// Initiating participant. Immutable.
    pub initiator: String,
    /// Turn the execution started on.
    pub turn: u32,
    /// Queue entry holding the lock for this execution.
    pub queue_id: Option<String>,
    /// The pipeline step last completed (0 before step 1).
    pub step: u8,
    /// Selected skill and actor.
    pub skill: Option<ChosenSkill>,
    /// Roll twice, keep higher.
    pub fortune: bool,
    /// Pre-roll selections.
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Most recent roll result.
    pub roll: Option<RollState>,
    /// Outcome preview derived from the roll.
    pub preview: Option<OutcomePreview>,
    /// Whether the user confirmed applying the outcome.
    pub user_confirmed: bool,
    /// Post-roll selections (dice results, choices, map picks).
    pub resolution: BTreeMap<String, serde_json::Value>,
}

impl PipelineContext {
    /// Creates a fresh context at step 0.
    #[must_use]
    pub fn new(
        execution_id: ExecutionId,
        kind: CheckKind,
        check_id: impl Into<String>,
        turn: u32,
        seed: ExecutionSeed,
    ) -> Self {
        Self {
            execution_id,
            kind,
            check_id: check_id.into(),
            initiator: seed.initiator,
            turn,
            queue_id: None,
            step: 0,
            skill: Some(ChosenSkill {
                skill: seed.skill,
                actor: seed.actor,
            }),
            fortune: seed.fortune,
            metadata: BTreeMap::new(),
            roll: None,
            preview: None,
            user_confirmed: false,
            resolution: BTreeMap::new(),
        }
    }

    /// The persisted form of this context.
    #[must_use]
    pub fn to_record(&self, status: ExecutionStatus, paused_at: Option<PausedAt>) -> ExecutionRecord {
        ExecutionRecord {
            execution_id: self.execution_id.clone(),
            kind: self.kind,
            check_id: self.check_id.clone(),
            initiator: self.initiator.clone(),
            turn: self.turn,
            queue_id: self.queue_id.clone(),
            status,
            step: self.step,
            paused_at,
            skill: self.skill.clone(),
            fortune: self.fortune,
            metadata: self.metadata.clone(),
            roll: self.roll.clone(),
            preview: self.preview.clone(),
            user_confirmed: self.user_confirmed,
            resolution: self.resolution.clone(),
            error: None,
        }
    }

    /// Reconstructs a context from its persisted record, used to resume a
    /// `paused_at: apply` execution with no step re-runs.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` for a record that was never
    /// suspended at the apply point (a `paused_at: roll` record cannot be
    /// resumed automatically).
    pub fn from_record(record: &ExecutionRecord) -> Result<Self, EngineError> {
        match record.paused_at {
            Some(PausedAt::Apply) => Ok(Self {
                execution_id: record.execution_id.clone(),
                kind: record.kind,
                check_id: record.check_id.clone(),
                initiator: record.initiator.clone(),
                turn: record.turn,
                queue_id: record.queue_id.clone(),
                step: record.step,
                skill: record.skill.clone(),
                fortune: record.fortune,
                metadata: record.metadata.clone(),
                roll: record.roll.clone(),
                preview: record.preview.clone(),
                user_confirmed: record.user_confirmed,
                resolution: record.resolution.clone(),
            }),
            Some(PausedAt::Roll) => Err(EngineError::Validation(format!(
                "{} is paused at its roll and cannot auto-resume; contact an operator",
                record.execution_id
            ))),
            None => Err(EngineError::Validation(format!(
                "{} is not suspended",
                record.execution_id
            ))),
        }
    }
}
