//! Stronghold API server entry point.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use stronghold_api::error::AppError;
use stronghold_api::routes;
use stronghold_api::state::AppState;
use stronghold_core::clock::UtcClock;
use stronghold_core::rng::{DeterministicRng, ThreadRngAdapter};
use stronghold_engine::{CheckCoordinator, D20Roller};
use stronghold_registry::PipelineRegistry;
use stronghold_store::MemoryStore;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Stronghold API server");

    // Read configuration from environment.
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?;

    // Load check definitions: a YAML file when CHECKS_FILE is set, the
    // builtin set otherwise.
    let registry = match std::env::var("CHECKS_FILE") {
        Ok(path) => {
            let yaml = std::fs::read_to_string(&path)
                .map_err(|e| AppError::Config(format!("cannot read {path}: {e}")))?;
            PipelineRegistry::from_yaml(&yaml)
                .map_err(|e| AppError::Config(format!("invalid check definitions: {e}")))?
        }
        Err(_) => PipelineRegistry::builtin()
            .map_err(|e| AppError::Config(format!("builtin check definitions: {e}")))?,
    };
    let registry = Arc::new(registry);

    let store = Arc::new(MemoryStore::default());
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(ThreadRngAdapter));
    let roller = Arc::new(D20Roller::new(rng.clone()));
    let coordinator = Arc::new(CheckCoordinator::new(
        store.clone(),
        registry.clone(),
        roller,
        rng,
        Arc::new(UtcClock),
    ));
    // Rebuild suspended executions from their records (a no-op for a
    // fresh in-memory store).
    match coordinator.resume_all().await {
        Ok(resumed) if !resumed.is_empty() => {
            tracing::info!(count = resumed.len(), "resumed suspended executions");
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "could not resume suspended executions"),
    }

    let app_state = AppState::new(store, registry, coordinator);

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/checks", routes::checks::router())
        .nest("/api/v1/session", routes::session::router())
        .nest("/api/v1/turns", routes::turns::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
