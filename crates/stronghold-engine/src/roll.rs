//! The roll subsystem: a single die roll against a difficulty class.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use stronghold_core::error::EngineError;
use stronghold_core::modifier::{Modifier, ModifierKind, applied_total};
use stronghold_core::outcome::DegreeOfSuccess;
use stronghold_core::rng::DeterministicRng;
use stronghold_store::document::ActorSheet;

/// One check to roll.
#[derive(Debug, Clone)]
pub struct RollRequest {
    /// Display label, for logging.
    pub label: String,
    /// Skill being rolled.
    pub skill: String,
    /// The acting character.
    pub actor: ActorSheet,
    /// Difficulty class.
    pub dc: i32,
    /// Situational modifiers from the collector (and reroll merge).
    pub modifiers: Vec<Modifier>,
    /// Roll twice, keep the higher die.
    pub roll_twice_keep_higher: bool,
}

/// The completed roll.
#[derive(Debug, Clone)]
pub struct RollOutcome {
    /// Natural die result.
    pub natural: u32,
    /// Die plus all applied modifiers.
    pub total: i32,
    /// Difficulty class rolled against.
    pub dc: i32,
    /// Outcome tier.
    pub degree: DegreeOfSuccess,
    /// The final modifier list actually used, character-derived entries
    /// included.
    pub modifiers_used: Vec<Modifier>,
}

/// Executes a single die-roll-against-difficulty check. Resolves exactly
/// once per request.
#[async_trait]
pub trait RollSubsystem: Send + Sync {
    /// Performs the roll.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::RollFailure` (or an infrastructure error)
    /// when the roll cannot be completed; the attempt is then
    /// unrecoverable.
    async fn perform(&self, request: RollRequest) -> Result<RollOutcome, EngineError>;
}

/// Production d20 roller.
///
/// Character-derived modifiers (ability, proficiency) are recomputed from
/// the actor sheet on every roll rather than taken from the request; the
/// reroll store never persists them for the same reason.
pub struct D20Roller {
    rng: Arc<Mutex<dyn DeterministicRng + Send>>,
}

impl D20Roller {
    /// Creates a roller over the given RNG.
    #[must_use]
    pub fn new(rng: Arc<Mutex<dyn DeterministicRng + Send>>) -> Self {
        Self { rng }
    }
}

#[async_trait]
impl RollSubsystem for D20Roller {
    async fn perform(&self, request: RollRequest) -> Result<RollOutcome, EngineError> {
        let mut modifiers_used = vec![
            Modifier::new("Ability", request.actor.ability_modifier, ModifierKind::Ability),
            Modifier::new(
                "Proficiency",
                request.actor.proficiency_bonus(),
                ModifierKind::Proficiency,
            ),
        ];
        modifiers_used.extend(request.modifiers);

        // Lock the RNG only for the synchronous rolls — never across an await.
        let natural = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|e| EngineError::Infrastructure(format!("RNG mutex poisoned: {e}")))?;
            let first = rng.next_u32_range(1, 20);
            if request.roll_twice_keep_higher {
                first.max(rng.next_u32_range(1, 20))
            } else {
                first
            }
        };

        #[allow(clippy::cast_possible_wrap)]
        let total = natural as i32 + applied_total(&modifiers_used);
        let degree = DegreeOfSuccess::from_check(natural, total, request.dc);

        debug!(
            label = %request.label,
            skill = %request.skill,
            natural,
            total,
            dc = request.dc,
            degree = %degree,
            "check rolled"
        );

        Ok(RollOutcome {
            natural,
            total,
            dc: request.dc,
            degree,
            modifiers_used,
        })
    }
}
