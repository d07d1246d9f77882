//! Shared fixtures for the engine integration tests. Not every test
//! binary uses every helper.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::Utc;

use stronghold_core::rng::{DeterministicRng, ThreadRngAdapter};
use stronghold_engine::{CheckCoordinator, D20Roller, ExecutionSeed};
use stronghold_registry::PipelineRegistry;
use stronghold_store::document::ActorSheet;
use stronghold_store::SessionStore;
use stronghold_test_support::{FixedClock, SequenceRng};

/// A coordinator over the builtin registry with a scripted d20 sequence.
pub fn coordinator(store: Arc<dyn SessionStore>, rolls: Vec<u32>) -> CheckCoordinator {
    coordinator_with_registry(store, rolls, PipelineRegistry::builtin().unwrap())
}

/// A coordinator over a caller-assembled registry (for tests that attach
/// hooks) with a scripted d20 sequence.
pub fn coordinator_with_registry(
    store: Arc<dyn SessionStore>,
    rolls: Vec<u32>,
    registry: PipelineRegistry,
) -> CheckCoordinator {
    let roller = Arc::new(D20Roller::new(Arc::new(Mutex::new(SequenceRng::new(rolls)))));
    let id_rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(ThreadRngAdapter));
    CheckCoordinator::new(
        store,
        Arc::new(registry),
        roller,
        id_rng,
        Arc::new(FixedClock(Utc::now())),
    )
}

/// A level-4 actor with +3 ability and trained proficiency: a flat +9 on
/// every roll, so expected totals are easy to read in assertions.
pub fn seed(initiator: &str, skill: &str) -> ExecutionSeed {
    ExecutionSeed {
        initiator: initiator.to_owned(),
        skill: skill.to_owned(),
        actor: ActorSheet {
            name: "Regent".to_owned(),
            level: 4,
            ability_modifier: 3,
            proficiency_rank: 1,
        },
        fortune: false,
    }
}
