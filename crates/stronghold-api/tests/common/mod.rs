//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use stronghold_api::routes;
use stronghold_api::state::AppState;
use stronghold_core::clock::Clock;
use stronghold_core::rng::{DeterministicRng, ThreadRngAdapter};
use stronghold_engine::{CheckCoordinator, D20Roller};
use stronghold_registry::PipelineRegistry;
use stronghold_store::MemoryStore;
use stronghold_test_support::{FixedClock, SequenceRng};

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Build the full app router over an in-memory store with a scripted d20
/// sequence. Uses the same route structure as `main.rs`.
pub fn build_test_app(store: Arc<MemoryStore>, rolls: Vec<u32>) -> Router {
    let registry = Arc::new(PipelineRegistry::builtin().unwrap());
    let roller = Arc::new(D20Roller::new(Arc::new(Mutex::new(SequenceRng::new(rolls)))));
    // Execution-id suffixes do not need to be deterministic.
    let id_rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(ThreadRngAdapter));
    let coordinator = Arc::new(CheckCoordinator::new(
        store.clone(),
        registry.clone(),
        roller,
        id_rng,
        fixed_clock(),
    ));
    let app_state = AppState::new(store, registry, coordinator);

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/checks", routes::checks::router())
        .nest("/api/v1/session", routes::session::router())
        .nest("/api/v1/turns", routes::turns::router())
        .with_state(app_state)
}

/// Request body for starting a check with the standard test actor: +3
/// ability, trained at level 4 — a flat +9 on every roll.
pub fn execute_body(initiator: &str, skill: &str) -> serde_json::Value {
    serde_json::json!({
        "initiator": initiator,
        "skill": skill,
        "actor": {
            "name": "Regent",
            "level": 4,
            "ability_modifier": 3,
            "proficiency_rank": 1,
        },
    })
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
