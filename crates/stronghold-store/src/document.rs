//! The persisted session document schema.
//!
//! Everything the engine durably tracks lives in one `SessionDocument`:
//! kingdom state consumed by the modifier collector, in-flight execution
//! records, the orchestration queue, reroll-modifier storage, and the
//! audit log. The whole document round-trips through JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stronghold_core::check::{CheckKind, ExecutionId};
use stronghold_core::modifier::Modifier;
use stronghold_core::outcome::DegreeOfSuccess;
use stronghold_core::resource::Resource;

/// The acting character's roll-relevant statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSheet {
    /// Display name of the actor.
    pub name: String,
    /// Character level.
    pub level: i32,
    /// Ability modifier for the chosen skill.
    pub ability_modifier: i32,
    /// Proficiency rank (0 untrained, 1 trained … 4 legendary).
    pub proficiency_rank: u8,
}

impl ActorSheet {
    /// The proficiency bonus: rank × 2 + level when trained, 0 untrained.
    #[must_use]
    pub fn proficiency_bonus(&self) -> i32 {
        if self.proficiency_rank == 0 {
            0
        } else {
            i32::from(self.proficiency_rank) * 2 + self.level
        }
    }
}

/// The skill and actor selected for a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChosenSkill {
    /// Skill identifier (e.g. `agriculture`).
    pub skill: String,
    /// The acting character.
    pub actor: ActorSheet,
}

/// The persisted result of the most recent roll for an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollState {
    /// Skill rolled.
    pub skill: String,
    /// Difficulty class rolled against.
    pub dc: i32,
    /// Natural die result.
    pub natural: u32,
    /// Die plus all applied modifiers.
    pub total: i32,
    /// Outcome tier.
    pub degree: DegreeOfSuccess,
    /// The modifier list actually used by the roll subsystem.
    pub modifiers: Vec<Modifier>,
}

/// The preview shown to the user before they confirm applying an outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomePreview {
    /// Static resource deltas the outcome will apply.
    pub deltas: BTreeMap<Resource, i64>,
    /// Short descriptive badges (outcome tier, check kind, flags).
    pub badges: Vec<String>,
    /// Warnings about inputs still required before confirmation.
    pub warnings: Vec<String>,
    /// Flavor text from the outcome table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Status of a persisted execution record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Rolled and previewed, not yet confirmed.
    Pending,
    /// Confirmed by the user; final mutation in flight. The record is
    /// removed at cleanup, so a resolved record only outlives a crash.
    Resolved,
    /// A step failed; `error` carries the reason.
    Failed,
}

/// Which suspension point an interrupted execution stopped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PausedAt {
    /// Waiting on the roll subsystem. Not automatically resumable.
    Roll,
    /// Waiting on the confirm-apply action. Resumable from the record.
    Apply,
}

/// The durably stored subset of a pipeline context, written before every
/// suspension so the engine can resume after a reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Unique per-attempt identifier.
    pub execution_id: ExecutionId,
    /// Check kind.
    pub kind: CheckKind,
    /// Check identifier in the registry.
    pub check_id: String,
    /// Initiating participant.
    pub initiator: String,
    /// Turn the execution started on.
    pub turn: u32,
    /// The queue entry holding the lock for this execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<String>,
    /// Record status.
    pub status: ExecutionStatus,
    /// The pipeline step last completed (1–9).
    pub step: u8,
    /// Suspension marker, if suspended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<PausedAt>,
    /// Selected skill and actor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<ChosenSkill>,
    /// Whether the roll uses "roll twice, keep higher".
    #[serde(default)]
    pub fortune: bool,
    /// Pre-roll selections.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Most recent roll result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll: Option<RollState>,
    /// Outcome preview derived from the roll.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<OutcomePreview>,
    /// Whether the user confirmed applying the outcome.
    #[serde(default)]
    pub user_confirmed: bool,
    /// Post-roll selections (dice results, choices, map picks).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resolution: BTreeMap<String, serde_json::Value>,
    /// Error text when `status` is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Status of an orchestration queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// Waiting for the lock.
    Queued,
    /// Holds the lock and is actively stepping.
    Executing,
    /// Holds the lock, suspended at a suspension point.
    Paused,
    /// Finished; kept for ordering history.
    Completed,
}

/// One entry in the orchestration queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedExecution {
    /// Queue entry identifier (the lock token).
    pub queue_id: String,
    /// Check kind.
    pub kind: CheckKind,
    /// Check identifier.
    pub check_id: String,
    /// Initiating participant.
    pub initiator: String,
    /// Enqueue timestamp, for diagnostics.
    pub enqueued_at: DateTime<Utc>,
    /// Entry status. At most one entry is `Executing` or `Paused`.
    pub status: QueueStatus,
}

impl QueuedExecution {
    /// Whether this entry currently holds the single-holder lock.
    #[must_use]
    pub fn holds_lock(&self) -> bool {
        matches!(self.status, QueueStatus::Executing | QueueStatus::Paused)
    }
}

/// The modifier list used on an execution's most recent roll, persisted so
/// a paid reroll can reconstruct the same bonuses. Scoped to a turn;
/// entries from earlier turns are stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRollMeta {
    /// Turn the roll happened on.
    pub turn: u32,
    /// Modifiers used, minus character-derived kinds.
    pub modifiers: Vec<Modifier>,
}

/// One line of the session audit log, appended at pipeline cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the execution completed.
    pub at: DateTime<Utc>,
    /// The completed execution.
    pub execution_id: ExecutionId,
    /// Check identifier.
    pub check_id: String,
    /// Final outcome tier.
    pub degree: DegreeOfSuccess,
    /// Human-readable summary.
    pub message: String,
}

/// An item bonus granted by a built structure to a specific skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureBonus {
    /// Structure name (the modifier label).
    pub structure: String,
    /// Skill the bonus applies to.
    pub skill: String,
    /// Bonus value.
    pub value: i32,
}

/// A circumstance bonus from another participant aiding a specific check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AidEntry {
    /// Check the aid was pledged for.
    pub check_id: String,
    /// Who is aiding.
    pub provider: String,
    /// Bonus value.
    pub value: i32,
}

/// Kingdom state read by the modifier collector and mutated by step 8.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KingdomState {
    /// Resource stockpiles, fame, unrest, and XP.
    #[serde(default)]
    pub resources: BTreeMap<Resource, i64>,
    /// Item bonuses from built structures.
    #[serde(default)]
    pub structures: Vec<StructureBonus>,
    /// Aid pledges for upcoming checks.
    #[serde(default)]
    pub aid: Vec<AidEntry>,
    /// Player-added modifiers that apply to every check.
    #[serde(default)]
    pub custom_modifiers: Vec<Modifier>,
    /// Identifiers of ongoing (not yet ended) events.
    #[serde(default)]
    pub ongoing_events: Vec<String>,
}

impl KingdomState {
    /// Current amount of a resource (0 when untracked).
    #[must_use]
    pub fn resource(&self, resource: Resource) -> i64 {
        self.resources.get(&resource).copied().unwrap_or(0)
    }

    /// Applies a delta to a resource, clamping the result at zero.
    /// No stockpile (and no unrest) goes negative.
    pub fn apply_delta(&mut self, resource: Resource, delta: i64) {
        let entry = self.resources.entry(resource).or_insert(0);
        *entry = (*entry + delta).max(0);
    }
}

/// The one shared document per session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDocument {
    /// Current kingdom turn number.
    pub turn: u32,
    /// Kingdom state.
    #[serde(default)]
    pub kingdom: KingdomState,
    /// In-flight execution records, keyed by execution identifier.
    #[serde(default)]
    pub executions: BTreeMap<ExecutionId, ExecutionRecord>,
    /// The orchestration queue, in enqueue order.
    #[serde(default)]
    pub queue: Vec<QueuedExecution>,
    /// Reroll-modifier storage, keyed by execution identifier.
    #[serde(default)]
    pub reroll: BTreeMap<ExecutionId, StoredRollMeta>,
    /// Completed-execution audit log.
    #[serde(default)]
    pub audit: Vec<AuditEntry>,
}

impl SessionDocument {
    /// The queue entry currently holding the lock, if any.
    #[must_use]
    pub fn lock_holder(&self) -> Option<&QueuedExecution> {
        self.queue.iter().find(|entry| entry.holds_lock())
    }

    /// The first entry still waiting its turn, i.e. the head of the live
    /// queue once completed entries are skipped.
    #[must_use]
    pub fn queue_head(&self) -> Option<&QueuedExecution> {
        self.queue
            .iter()
            .find(|entry| entry.status != QueueStatus::Completed)
    }
}
