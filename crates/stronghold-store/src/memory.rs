//! In-memory `SessionStore` with watch-based propagation.

use std::sync::RwLock;

use async_trait::async_trait;
use tokio::sync::watch;

use stronghold_core::error::EngineError;

use crate::document::SessionDocument;
use crate::store::{Mutator, SessionStore};

/// An in-memory session store. Updates run under a single write lock, so
/// every mutator observes the result of every earlier one; a watch channel
/// notifies all observers after each update.
#[derive(Debug)]
pub struct MemoryStore {
    document: RwLock<SessionDocument>,
    version: watch::Sender<u64>,
}

impl MemoryStore {
    /// Creates a store holding the given initial document.
    #[must_use]
    pub fn new(initial: SessionDocument) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            document: RwLock::new(initial),
            version,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(SessionDocument::default())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn snapshot(&self) -> Result<SessionDocument, EngineError> {
        let guard = self
            .document
            .read()
            .map_err(|e| EngineError::Infrastructure(format!("session lock poisoned: {e}")))?;
        Ok(guard.clone())
    }

    async fn update(&self, mutator: Mutator) -> Result<SessionDocument, EngineError> {
        let outcome;
        let snapshot;
        {
            let mut guard = self
                .document
                .write()
                .map_err(|e| EngineError::Infrastructure(format!("session lock poisoned: {e}")))?;
            outcome = mutator(&mut guard);
            snapshot = guard.clone();
        }
        // Notify even when the mutator failed: partial mutations are kept
        // (roll forward) and observers must see them.
        self.version.send_modify(|v| *v += 1);
        outcome.map(|()| snapshot)
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stronghold_core::resource::Resource;

    #[tokio::test]
    async fn test_update_is_read_after_write_consistent() {
        let store = MemoryStore::default();

        let updated = store
            .update(Box::new(|doc| {
                doc.kingdom.apply_delta(Resource::Lumber, 4);
                Ok(())
            }))
            .await
            .unwrap();
        assert_eq!(updated.kingdom.resource(Resource::Lumber), 4);

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.kingdom.resource(Resource::Lumber), 4);
    }

    #[tokio::test]
    async fn test_update_notifies_subscribers() {
        let store = MemoryStore::default();
        let mut rx = store.subscribe();
        let before = *rx.borrow_and_update();

        store.update(Box::new(|_| Ok(()))).await.unwrap();

        rx.changed().await.unwrap();
        assert!(*rx.borrow() > before);
    }

    #[tokio::test]
    async fn test_failed_mutator_keeps_partial_mutations() {
        let store = MemoryStore::default();

        let result = store
            .update(Box::new(|doc| {
                doc.kingdom.apply_delta(Resource::Ore, 2);
                Err(EngineError::ExecutionFailure("mine collapsed".to_owned()))
            }))
            .await;
        assert!(matches!(result, Err(EngineError::ExecutionFailure(_))));

        // Roll forward: the delta applied before the failure survives.
        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.kingdom.resource(Resource::Ore), 2);
    }
}
