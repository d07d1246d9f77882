//! Session store abstraction.

use async_trait::async_trait;
use tokio::sync::watch;

use stronghold_core::error::EngineError;

use crate::document::SessionDocument;

/// A mutation applied atomically to the session document.
///
/// A mutator may fail, but the engine's propagation policy is roll
/// forward, never rollback: mutations made before the error are kept and
/// propagated to observers along with the error.
pub type Mutator = Box<dyn FnOnce(&mut SessionDocument) -> Result<(), EngineError> + Send>;

/// Durable holder of the one shared session document.
///
/// Implementations must be read-after-write consistent for the writer and
/// must notify all subscribers on every update.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns a snapshot of the current document.
    async fn snapshot(&self) -> Result<SessionDocument, EngineError>;

    /// Applies a mutator atomically and returns the resulting document.
    ///
    /// # Errors
    ///
    /// Returns the mutator's error (with its partial mutations retained),
    /// or `EngineError::Infrastructure` if the document cannot be accessed.
    async fn update(&self, mutator: Mutator) -> Result<SessionDocument, EngineError>;

    /// Subscribe to update notifications. The channel carries a document
    /// version counter; receivers treat any change as "re-read the
    /// document".
    fn subscribe(&self) -> watch::Receiver<u64>;
}
