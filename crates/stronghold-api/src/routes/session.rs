//! Routes for observing and adjusting the shared session document.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::get, routing::post};
use serde::Deserialize;
use tracing::{info, instrument};

use stronghold_core::modifier::{Modifier, ModifierKind, ModifierSource};
use stronghold_store::SessionDocument;
use stronghold_store::document::AuditEntry;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /modifiers.
#[derive(Debug, Deserialize)]
pub struct AddModifierRequest {
    /// Display label. Also the merge key on a reroll.
    pub label: String,
    /// Bonus or penalty value.
    pub value: i32,
    /// Modifier kind.
    pub kind: ModifierKind,
}

/// GET /
async fn snapshot(State(state): State<AppState>) -> Result<Json<SessionDocument>, ApiError> {
    let doc = state.store.snapshot().await?;
    Ok(Json(doc))
}

/// GET /audit
async fn audit_log(State(state): State<AppState>) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    let doc = state.store.snapshot().await?;
    Ok(Json(doc.audit))
}

/// POST /modifiers
///
/// Adds a player-supplied modifier that applies to every subsequent
/// check until removed.
#[instrument(skip(state, request), fields(label = %request.label))]
async fn add_modifier(
    State(state): State<AppState>,
    Json(request): Json<AddModifierRequest>,
) -> Result<StatusCode, ApiError> {
    info!(value = request.value, "adding custom modifier");
    let modifier = Modifier::new(request.label, request.value, request.kind)
        .with_source(ModifierSource::Custom);
    state
        .store
        .update(Box::new(move |doc| {
            doc.kingdom.custom_modifiers.push(modifier);
            Ok(())
        }))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for the session document.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(snapshot))
        .route("/audit", get(audit_log))
        .route("/modifiers", post(add_modifier))
}
