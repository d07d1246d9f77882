//! Declarative check definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use stronghold_core::check::CheckKind;
use stronghold_core::outcome::DegreeOfSuccess;
use stronghold_core::resource::Resource;

use crate::hooks::CheckHooks;

/// A skill a check can be attempted with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillOption {
    /// Skill identifier (e.g. `agriculture`).
    pub skill: String,
    /// Adjustment on top of the check's base DC for this skill.
    #[serde(default)]
    pub dc_adjustment: i32,
}

/// A non-resource command a check outcome issues against the kingdom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameCommand {
    /// Start (or keep) an ongoing event.
    AddOngoingEvent {
        /// Event check identifier.
        event: String,
    },
    /// Pledge aid toward a future check.
    AddAid {
        /// The check being aided.
        check_id: String,
        /// Who is aiding.
        provider: String,
        /// Circumstance bonus value.
        value: i32,
    },
    /// Tear down a structure (its bonus disappears with it).
    RemoveStructure {
        /// Structure name.
        structure: String,
    },
}

/// What one outcome tier does when applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeEffect {
    /// Static resource deltas.
    #[serde(default)]
    pub deltas: BTreeMap<Resource, i64>,
    /// Dice-based resource deltas. The formula is rolled by the user
    /// during outcome interactions; a leading `-` makes the rolled value
    /// a loss.
    #[serde(default)]
    pub dice: BTreeMap<Resource, String>,
    /// Non-resource game commands.
    #[serde(default)]
    pub commands: Vec<GameCommand>,
    /// For events: whether this outcome ends the ongoing event.
    #[serde(default)]
    pub ends_event: bool,
    /// Flavor text shown in the preview.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn default_true() -> bool {
    true
}

/// A check's full declarative definition, immutable for the process
/// lifetime once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckDefinition {
    /// Registry identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Check kind.
    pub kind: CheckKind,
    /// Base difficulty class.
    pub dc: i32,
    /// Skills the check may be attempted with.
    pub skills: Vec<SkillOption>,
    /// Effect table per outcome tier.
    #[serde(default)]
    pub outcomes: BTreeMap<DegreeOfSuccess, OutcomeEffect>,
    /// Whether step 8 runs the automatic resource phase.
    #[serde(default = "default_true")]
    pub automatic_apply: bool,
    /// Interaction hooks, registered in code after loading.
    #[serde(skip, default)]
    pub hooks: CheckHooks,
}

impl CheckDefinition {
    /// The effect table entry for a tier, if the definition declares one.
    #[must_use]
    pub fn effect(&self, degree: DegreeOfSuccess) -> Option<&OutcomeEffect> {
        self.outcomes.get(&degree)
    }

    /// The DC for attempting this check with `skill`, if offered.
    #[must_use]
    pub fn dc_for(&self, skill: &str) -> Option<i32> {
        self.skills
            .iter()
            .find(|option| option.skill == skill)
            .map(|option| self.dc + option.dc_adjustment)
    }
}
