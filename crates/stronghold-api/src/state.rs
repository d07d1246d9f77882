//! Shared application state.

use std::sync::Arc;

use stronghold_engine::CheckCoordinator;
use stronghold_registry::PipelineRegistry;
use stronghold_store::SessionStore;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The session document store.
    pub store: Arc<dyn SessionStore>,
    /// The check definition registry.
    pub registry: Arc<PipelineRegistry>,
    /// The pipeline coordinator.
    pub coordinator: Arc<CheckCoordinator>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        registry: Arc<PipelineRegistry>,
        coordinator: Arc<CheckCoordinator>,
    ) -> Self {
        Self {
            store,
            registry,
            coordinator,
        }
    }
}
