//! Routes for turn management.

use axum::extract::State;
use axum::{Json, Router, routing::post};
use serde::Serialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;

/// Response body for POST /advance.
#[derive(Debug, Serialize)]
pub struct TurnResponse {
    /// The new current turn.
    pub turn: u32,
}

/// POST /advance
///
/// Moves the session to the next kingdom turn and discards turn-scoped
/// state (stored reroll modifiers).
#[instrument(skip(state))]
async fn advance_turn(State(state): State<AppState>) -> Result<Json<TurnResponse>, ApiError> {
    let turn = state.coordinator.advance_turn().await?;
    Ok(Json(TurnResponse { turn }))
}

/// Returns the router for turn management.
pub fn router() -> Router<AppState> {
    Router::new().route("/advance", post(advance_turn))
}
