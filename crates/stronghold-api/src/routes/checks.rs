//! Routes for check execution: listing definitions, starting executions,
//! and driving the confirm-apply suspension point.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use stronghold_core::check::{CheckKind, ExecutionId};
use stronghold_core::error::EngineError;
use stronghold_engine::{ExecutionReport, ExecutionSeed, PendingApproval};
use stronghold_registry::SkillOption;
use stronghold_store::document::{ActorSheet, ExecutionRecord};

use crate::error::ApiError;
use crate::state::AppState;

/// One entry in the check catalog.
#[derive(Debug, Serialize)]
pub struct CheckSummary {
    /// Registry identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Check kind.
    pub kind: CheckKind,
    /// Base difficulty class.
    pub dc: i32,
    /// Skills the check may be attempted with.
    pub skills: Vec<SkillOption>,
}

/// Request body for POST /{check_id}/execute.
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    /// Initiating participant.
    pub initiator: String,
    /// Skill to attempt the check with.
    pub skill: String,
    /// The acting character.
    pub actor: ActorSheet,
    /// Roll twice, keep higher.
    #[serde(default)]
    pub fortune: bool,
}

/// Request body for POST /executions/{execution_id}/input.
#[derive(Debug, Deserialize)]
pub struct InputRequest {
    /// Resolution-data key (e.g. `dice:food`).
    pub key: String,
    /// The supplied value.
    pub value: serde_json::Value,
}

/// GET /
async fn list_checks(State(state): State<AppState>) -> Json<Vec<CheckSummary>> {
    let mut checks: Vec<CheckSummary> = state
        .registry
        .iter()
        .map(|definition| CheckSummary {
            id: definition.id.clone(),
            name: definition.name.clone(),
            kind: definition.kind,
            dc: definition.dc,
            skills: definition.skills.clone(),
        })
        .collect();
    checks.sort_by(|a, b| a.id.cmp(&b.id));
    Json(checks)
}

/// POST /{check_id}/execute
///
/// Runs the pipeline to the confirm-apply suspension point. The response
/// is the approval state for the preview surface; the request does not
/// return until the execution has acquired the queue lock and rolled.
#[instrument(skip(state, request), fields(check_id = %check_id, initiator = %request.initiator))]
async fn execute_check(
    State(state): State<AppState>,
    Path(check_id): Path<String>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<PendingApproval>, ApiError> {
    info!("starting check execution");
    let seed = ExecutionSeed {
        initiator: request.initiator,
        skill: request.skill,
        actor: request.actor,
        fortune: request.fortune,
    };
    let approval = state.coordinator.execute(&check_id, seed).await?;
    Ok(Json(approval))
}

/// GET /executions/{execution_id}
///
/// Returns the persisted record for a suspended or failed execution.
async fn get_execution(
    State(state): State<AppState>,
    Path(execution_id): Path<String>,
) -> Result<Json<ExecutionRecord>, ApiError> {
    let id = ExecutionId::from(execution_id);
    let doc = state.store.snapshot().await?;
    doc.executions
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError(EngineError::ExecutionNotFound(id)))
}

/// POST /executions/{execution_id}/input
#[instrument(skip(state, request), fields(execution_id = %execution_id, key = %request.key))]
async fn provide_input(
    State(state): State<AppState>,
    Path(execution_id): Path<String>,
    Json(request): Json<InputRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .coordinator
        .provide_input(&ExecutionId::from(execution_id), &request.key, request.value)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /executions/{execution_id}/confirm
#[instrument(skip(state), fields(execution_id = %execution_id))]
async fn confirm_apply(
    State(state): State<AppState>,
    Path(execution_id): Path<String>,
) -> Result<Json<ExecutionReport>, ApiError> {
    let report = state
        .coordinator
        .confirm_apply(&ExecutionId::from(execution_id))
        .await?;
    info!(degree = %report.degree, "outcome applied");
    Ok(Json(report))
}

/// POST /executions/{execution_id}/reroll
#[instrument(skip(state), fields(execution_id = %execution_id))]
async fn reroll(
    State(state): State<AppState>,
    Path(execution_id): Path<String>,
) -> Result<Json<PendingApproval>, ApiError> {
    let approval = state
        .coordinator
        .reroll(&ExecutionId::from(execution_id))
        .await?;
    Ok(Json(approval))
}

/// POST /executions/{execution_id}/resume
#[instrument(skip(state), fields(execution_id = %execution_id))]
async fn resume_paused(
    State(state): State<AppState>,
    Path(execution_id): Path<String>,
) -> Result<Json<PendingApproval>, ApiError> {
    let approval = state
        .coordinator
        .resume_paused(&ExecutionId::from(execution_id))
        .await?;
    Ok(Json(approval))
}

/// Returns the router for check execution.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_checks))
        .route("/{check_id}/execute", post(execute_check))
        .route("/executions/{execution_id}", get(get_execution))
        .route("/executions/{execution_id}/input", post(provide_input))
        .route("/executions/{execution_id}/confirm", post(confirm_apply))
        .route("/executions/{execution_id}/reroll", post(reroll))
        .route("/executions/{execution_id}/resume", post(resume_paused))
}
