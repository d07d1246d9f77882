//! Integration tests for the check execution routes.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use stronghold_store::MemoryStore;

use common::{build_test_app, execute_body, get_json, post_json};

#[tokio::test]
async fn test_catalog_lists_builtin_checks() {
    let app = build_test_app(Arc::new(MemoryStore::default()), vec![]);

    let (status, json) = get_json(app, "/api/v1/checks").await;

    assert_eq!(status, StatusCode::OK);
    let checks = json.as_array().unwrap();
    assert!(checks.len() >= 6);
    assert!(checks.iter().any(|c| c["id"] == "harvest-crops"));
    let harvest = checks.iter().find(|c| c["id"] == "harvest-crops").unwrap();
    assert_eq!(harvest["dc"], 16);
    assert_eq!(harvest["kind"], "action");
}

#[tokio::test]
async fn test_execute_then_confirm_applies_the_outcome() {
    let store = Arc::new(MemoryStore::default());
    // Die 10 + 9 = 19 vs DC 16 — success.
    let app = build_test_app(store, vec![10]);

    let (status, approval) = post_json(
        app.clone(),
        "/api/v1/checks/harvest-crops/execute",
        &execute_body("anna", "agriculture"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approval["degree"], "success");
    assert_eq!(approval["preview"]["deltas"]["food"], 2);
    let execution_id = approval["execution_id"].as_str().unwrap().to_owned();

    let (status, report) = post_json(
        app.clone(),
        &format!("/api/v1/checks/executions/{execution_id}/confirm"),
        &serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["applied_deltas"]["food"], 2);

    let (_, doc) = get_json(app.clone(), "/api/v1/session").await;
    assert_eq!(doc["kingdom"]["resources"]["food"], 2);
    assert_eq!(doc["audit"].as_array().unwrap().len(), 1);

    let (_, audit) = get_json(app, "/api/v1/session/audit").await;
    assert_eq!(audit[0]["check_id"], "harvest-crops");
}

#[tokio::test]
async fn test_unknown_check_returns_404() {
    let app = build_test_app(Arc::new(MemoryStore::default()), vec![]);

    let (status, json) = post_json(
        app,
        "/api/v1/checks/claim-the-moon/execute",
        &execute_body("anna", "agriculture"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "check_not_found");
}

#[tokio::test]
async fn test_unoffered_skill_returns_400() {
    let app = build_test_app(Arc::new(MemoryStore::default()), vec![]);

    let (status, json) = post_json(
        app,
        "/api/v1/checks/harvest-crops/execute",
        &execute_body("anna", "warfare"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn test_confirm_is_blocked_until_inputs_arrive() {
    let store = Arc::new(MemoryStore::default());
    // Natural 1 — critical failure with a dice sub-effect.
    let app = build_test_app(store, vec![1]);

    let (_, approval) = post_json(
        app.clone(),
        "/api/v1/checks/harvest-crops/execute",
        &execute_body("anna", "agriculture"),
    )
    .await;
    assert_eq!(approval["degree"], "critical_failure");
    assert_eq!(approval["required_inputs"][0], "dice:food");
    let execution_id = approval["execution_id"].as_str().unwrap().to_owned();

    let (status, json) = post_json(
        app.clone(),
        &format!("/api/v1/checks/executions/{execution_id}/confirm"),
        &serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "interaction_incomplete");

    let (status, _) = post_json(
        app.clone(),
        &format!("/api/v1/checks/executions/{execution_id}/input"),
        &serde_json::json!({ "key": "dice:food", "value": 3 }),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, report) = post_json(
        app,
        &format!("/api/v1/checks/executions/{execution_id}/confirm"),
        &serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["applied_deltas"]["food"], -3);
}

#[tokio::test]
async fn test_reroll_replaces_the_pending_outcome() {
    let store = Arc::new(MemoryStore::default());
    // Die 2 + 9 = 11 — failure; reroll die 18 + 9 = 27 — critical success.
    let app = build_test_app(store, vec![2, 18]);

    let (_, approval) = post_json(
        app.clone(),
        "/api/v1/checks/harvest-crops/execute",
        &execute_body("anna", "agriculture"),
    )
    .await;
    assert_eq!(approval["degree"], "failure");
    let execution_id = approval["execution_id"].as_str().unwrap().to_owned();

    let (status, rerolled) = post_json(
        app,
        &format!("/api/v1/checks/executions/{execution_id}/reroll"),
        &serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rerolled["degree"], "critical_success");
    assert_eq!(rerolled["execution_id"], approval["execution_id"]);
}

#[tokio::test]
async fn test_suspended_execution_record_is_queryable() {
    let store = Arc::new(MemoryStore::default());
    let app = build_test_app(store, vec![10]);

    let (_, approval) = post_json(
        app.clone(),
        "/api/v1/checks/harvest-crops/execute",
        &execute_body("anna", "agriculture"),
    )
    .await;
    let execution_id = approval["execution_id"].as_str().unwrap().to_owned();

    let (status, record) =
        get_json(app, &format!("/api/v1/checks/executions/{execution_id}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["status"], "pending");
    assert_eq!(record["paused_at"], "apply");
    assert_eq!(record["roll"]["degree"], "success");
}

#[tokio::test]
async fn test_resume_of_unknown_execution_returns_404() {
    let app = build_test_app(Arc::new(MemoryStore::default()), vec![]);

    let (status, json) = post_json(
        app,
        "/api/v1/checks/executions/turn0-squatters-000000/resume",
        &serde_json::json!({}),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "execution_not_found");
}
