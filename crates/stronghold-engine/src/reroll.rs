//! Reroll state: the modifier list used on a check's most recent roll,
//! persisted per execution so a paid reroll reconstructs the same bonuses.

use std::sync::Arc;

use tracing::{debug, warn};

use stronghold_core::check::ExecutionId;
use stronghold_core::error::EngineError;
use stronghold_core::modifier::Modifier;
use stronghold_store::document::StoredRollMeta;
use stronghold_store::SessionStore;

/// Merges the stored modifier list from a previous attempt into the fresh
/// collector output for a reroll.
///
/// Fresh modifiers whose label matches a stored one are forced enabled
/// (the player had them on last time). Stored modifiers with no fresh
/// counterpart — custom, player-added entries — are appended enabled.
/// Merging twice with no new custom modifiers is a fixed point.
#[must_use]
pub fn merge_rerolled(fresh: Vec<Modifier>, stored: &[Modifier]) -> Vec<Modifier> {
    let mut merged: Vec<Modifier> = fresh
        .into_iter()
        .map(|mut modifier| {
            if stored.iter().any(|s| s.label == modifier.label) {
                modifier.enabled = true;
                modifier.ignored = false;
            }
            modifier
        })
        .collect();

    for stored_modifier in stored {
        if !merged.iter().any(|m| m.label == stored_modifier.label) {
            let mut carried = stored_modifier.clone();
            carried.enabled = true;
            carried.ignored = false;
            merged.push(carried);
        }
    }

    merged
}

/// Persists per-execution roll modifiers in the session document, scoped
/// to the turn they were rolled on.
#[derive(Clone)]
pub struct RerollStore {
    store: Arc<dyn SessionStore>,
}

impl RerollStore {
    /// Creates a reroll store over the session store.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Stores the modifier list used on a roll. Character-derived
    /// modifiers (ability, proficiency) are dropped: the roll subsystem
    /// recomputes them from the acting character every time, and
    /// persisting them would double-count or go stale.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure error if the document cannot be updated.
    pub async fn save(
        &self,
        execution_id: &ExecutionId,
        turn: u32,
        modifiers: &[Modifier],
    ) -> Result<(), EngineError> {
        let persisted: Vec<Modifier> = modifiers
            .iter()
            .filter(|m| !m.kind.is_character_derived())
            .cloned()
            .collect();
        debug!(execution_id = %execution_id, count = persisted.len(), "storing roll modifiers");

        let id = execution_id.clone();
        self.store
            .update(Box::new(move |doc| {
                doc.reroll.insert(
                    id,
                    StoredRollMeta {
                        turn,
                        modifiers: persisted,
                    },
                );
                Ok(())
            }))
            .await?;
        Ok(())
    }

    /// Fetches the stored modifier list for an execution. A turn mismatch
    /// is logged but not rejected: the stale list is still the best
    /// reconstruction available.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure error if the document cannot be read.
    pub async fn load(
        &self,
        execution_id: &ExecutionId,
        current_turn: u32,
    ) -> Result<Option<Vec<Modifier>>, EngineError> {
        let doc = self.store.snapshot().await?;
        Ok(doc.reroll.get(execution_id).map(|meta| {
            if meta.turn != current_turn {
                warn!(
                    execution_id = %execution_id,
                    stored_turn = meta.turn,
                    current_turn,
                    "stored roll modifiers are from another turn"
                );
            }
            meta.modifiers.clone()
        }))
    }

    /// Discards all stored entries. Called at every turn boundary to keep
    /// the storage from growing without bound.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure error if the document cannot be updated.
    pub async fn clear_all(&self) -> Result<(), EngineError> {
        self.store
            .update(Box::new(|doc| {
                doc.reroll.clear();
                Ok(())
            }))
            .await?;
        Ok(())
    }
}
