//! The orchestration queue: FIFO ordering plus a single-holder lock.
//!
//! Every execution enqueues before step 1 and acquires the lock before
//! stepping. The lock is held across suspension points, so a check paused
//! at its preview still blocks everyone behind it. At most one entry is
//! ever `Executing` or `Paused`.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, instrument};
use uuid::Uuid;

use stronghold_core::check::CheckKind;
use stronghold_core::clock::Clock;
use stronghold_core::error::EngineError;
use stronghold_store::document::{QueueStatus, QueuedExecution};
use stronghold_store::SessionStore;

/// Fallback poll interval for lock acquisition. Acquisition primarily
/// waits on store change notifications; the poll only covers a missed
/// wakeup, it is not a busy loop.
const ACQUIRE_POLL: Duration = Duration::from_millis(250);

/// FIFO execution queue over the session store.
#[derive(Clone)]
pub struct OrchestrationQueue {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
}

impl OrchestrationQueue {
    /// Creates a queue over the session store.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Appends a new entry and returns its queue identifier (the lock
    /// token).
    ///
    /// # Errors
    ///
    /// Returns an infrastructure error if the document cannot be updated.
    pub async fn enqueue(
        &self,
        kind: CheckKind,
        check_id: &str,
        initiator: &str,
    ) -> Result<String, EngineError> {
        let queue_id = Uuid::new_v4().to_string();
        let entry = QueuedExecution {
            queue_id: queue_id.clone(),
            kind,
            check_id: check_id.to_owned(),
            initiator: initiator.to_owned(),
            enqueued_at: self.clock.now(),
            status: QueueStatus::Queued,
        };

        debug!(queue_id = %queue_id, check_id, initiator, "enqueued");
        self.store
            .update(Box::new(move |doc| {
                doc.queue.push(entry);
                Ok(())
            }))
            .await?;
        Ok(queue_id)
    }

    /// Waits until the entry is at the head of the live queue and no
    /// other entry holds the lock, then claims it. The claim happens
    /// inside a store update, so two concurrent acquirers can never both
    /// succeed.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` if the entry is missing from the
    /// queue, or an infrastructure error from the store.
    #[instrument(skip(self))]
    pub async fn acquire(&self, queue_id: &str) -> Result<(), EngineError> {
        let mut changes = self.store.subscribe();

        loop {
            if self.try_claim(queue_id).await? {
                debug!(queue_id, "lock acquired");
                return Ok(());
            }

            // Wait for the next document change; the poll timeout covers a
            // notification lost between the failed claim and this await.
            let _ = timeout(ACQUIRE_POLL, changes.changed()).await;
        }
    }

    async fn try_claim(&self, queue_id: &str) -> Result<bool, EngineError> {
        let id = queue_id.to_owned();
        let doc = self
            .store
            .update(Box::new(move |doc| {
                if !doc.queue.iter().any(|e| e.queue_id == id) {
                    return Err(EngineError::Validation(format!(
                        "queue entry {id} does not exist"
                    )));
                }
                let claimable = doc.lock_holder().is_none()
                    && doc.queue_head().is_some_and(|head| head.queue_id == id);
                if claimable
                    && let Some(entry) = doc.queue.iter_mut().find(|e| e.queue_id == id)
                {
                    entry.status = QueueStatus::Executing;
                }
                Ok(())
            }))
            .await?;

        Ok(doc
            .queue
            .iter()
            .any(|e| e.queue_id == queue_id && e.status == QueueStatus::Executing))
    }

    /// Marks the holding entry paused. The lock stays held.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` if the entry does not hold the
    /// lock.
    pub async fn pause(&self, queue_id: &str) -> Result<(), EngineError> {
        self.transition(queue_id, QueueStatus::Executing, QueueStatus::Paused)
            .await
    }

    /// Marks a paused entry executing again.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` if the entry is not paused.
    pub async fn resume(&self, queue_id: &str) -> Result<(), EngineError> {
        self.transition(queue_id, QueueStatus::Paused, QueueStatus::Executing)
            .await
    }

    /// Releases the lock, letting the next queued entry claim it. Called
    /// at pipeline cleanup and on every failure path so a failed check
    /// never deadlocks the queue.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` if the entry never held the lock.
    pub async fn release(&self, queue_id: &str) -> Result<(), EngineError> {
        let id = queue_id.to_owned();
        self.store
            .update(Box::new(move |doc| {
                let entry = doc
                    .queue
                    .iter_mut()
                    .find(|e| e.queue_id == id)
                    .ok_or_else(|| {
                        EngineError::Validation(format!("queue entry {id} does not exist"))
                    })?;
                if !entry.holds_lock() {
                    return Err(EngineError::Validation(format!(
                        "queue entry {id} does not hold the lock"
                    )));
                }
                entry.status = QueueStatus::Completed;
                Ok(())
            }))
            .await?;
        debug!(queue_id, "lock released");
        Ok(())
    }

    async fn transition(
        &self,
        queue_id: &str,
        from: QueueStatus,
        to: QueueStatus,
    ) -> Result<(), EngineError> {
        let id = queue_id.to_owned();
        self.store
            .update(Box::new(move |doc| {
                let entry = doc
                    .queue
                    .iter_mut()
                    .find(|e| e.queue_id == id)
                    .ok_or_else(|| {
                        EngineError::Validation(format!("queue entry {id} does not exist"))
                    })?;
                if entry.status != from {
                    return Err(EngineError::Validation(format!(
                        "queue entry {id} is not in the expected state"
                    )));
                }
                entry.status = to;
                Ok(())
            }))
            .await?;
        Ok(())
    }
}
