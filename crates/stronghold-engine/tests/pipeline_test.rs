//! End-to-end pipeline tests: execute, suspend, confirm, apply.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use stronghold_core::error::EngineError;
use stronghold_core::outcome::DegreeOfSuccess;
use stronghold_core::resource::Resource;
use stronghold_registry::{CheckHooks, ExecuteHook, HookContext, PipelineRegistry, RequirementsHook};
use stronghold_store::document::{ExecutionStatus, QueueStatus};
use stronghold_store::{MemoryStore, Mutator, SessionDocument, SessionStore};

use common::{coordinator, coordinator_with_registry, seed};

#[tokio::test]
async fn test_success_applies_deltas_and_audits() {
    let store = Arc::new(MemoryStore::default());
    // Die 10 + 9 = 19 vs DC 16 — success.
    let engine = coordinator(store.clone(), vec![10]);

    let approval = engine
        .execute("harvest-crops", seed("anna", "agriculture"))
        .await
        .unwrap();
    assert_eq!(approval.degree, DegreeOfSuccess::Success);
    assert_eq!(approval.preview.deltas.get(&Resource::Food), Some(&2));
    assert!(approval.required_inputs.is_empty());

    // Suspended: the record is persisted, the queue entry holds the lock.
    let doc = store.snapshot().await.unwrap();
    assert_eq!(doc.executions.len(), 1);
    assert!(doc.lock_holder().is_some());

    let report = engine.confirm_apply(&approval.execution_id).await.unwrap();
    assert_eq!(report.applied_deltas.get(&Resource::Food), Some(&2));

    let doc = store.snapshot().await.unwrap();
    assert_eq!(doc.kingdom.resource(Resource::Food), 2);
    assert!(doc.executions.is_empty());
    assert!(doc.reroll.is_empty());
    assert_eq!(doc.audit.len(), 1);
    assert_eq!(doc.queue[0].status, QueueStatus::Completed);
    assert!(doc.lock_holder().is_none());
}

#[tokio::test]
async fn test_critical_success_awards_fame() {
    let store = Arc::new(MemoryStore::default());
    let engine = coordinator(store.clone(), vec![20]);

    let approval = engine
        .execute("harvest-crops", seed("anna", "agriculture"))
        .await
        .unwrap();
    assert_eq!(approval.degree, DegreeOfSuccess::CriticalSuccess);

    engine.confirm_apply(&approval.execution_id).await.unwrap();

    let doc = store.snapshot().await.unwrap();
    assert_eq!(doc.kingdom.resource(Resource::Food), 4);
    assert_eq!(doc.kingdom.resource(Resource::Fame), 1);
}

#[tokio::test]
async fn test_dice_outcome_blocks_confirmation_until_supplied() {
    let store = Arc::new(MemoryStore::default());
    store
        .update(Box::new(|doc| {
            doc.kingdom.resources.insert(Resource::Food, 5);
            Ok(())
        }))
        .await
        .unwrap();
    // Natural 1: 1 + 9 = 10 vs DC 16 — failure, degraded to critical.
    let engine = coordinator(store.clone(), vec![1]);

    let approval = engine
        .execute("harvest-crops", seed("anna", "agriculture"))
        .await
        .unwrap();
    assert_eq!(approval.degree, DegreeOfSuccess::CriticalFailure);
    assert_eq!(approval.required_inputs, vec!["dice:food".to_owned()]);
    assert!(approval
        .preview
        .warnings
        .iter()
        .any(|w| w.contains("dice:food")));

    let err = engine.confirm_apply(&approval.execution_id).await.unwrap_err();
    assert!(matches!(err, EngineError::InteractionIncomplete { .. }));

    engine
        .provide_input(&approval.execution_id, "dice:food", serde_json::json!(3))
        .await
        .unwrap();
    let report = engine.confirm_apply(&approval.execution_id).await.unwrap();
    assert_eq!(report.applied_deltas.get(&Resource::Food), Some(&-3));

    let doc = store.snapshot().await.unwrap();
    assert_eq!(doc.kingdom.resource(Resource::Food), 2);
}

/// Delays every update so overlapping writers actually interleave.
struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

#[async_trait]
impl SessionStore for SlowStore {
    async fn snapshot(&self) -> Result<SessionDocument, EngineError> {
        self.inner.snapshot().await
    }

    async fn update(&self, mutator: Mutator) -> Result<SessionDocument, EngineError> {
        tokio::time::sleep(self.delay).await;
        self.inner.update(mutator).await
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.subscribe()
    }
}

#[tokio::test]
async fn test_concurrent_inputs_are_both_kept() {
    let store = Arc::new(SlowStore {
        inner: MemoryStore::default(),
        delay: Duration::from_millis(30),
    });
    let engine = Arc::new(coordinator(store.clone(), vec![1]));

    let approval = engine
        .execute("harvest-crops", seed("anna", "agriculture"))
        .await
        .unwrap();
    let id = approval.execution_id.clone();

    // Two inputs for the same suspended execution land while each other's
    // persist is still in flight; neither may overwrite the other.
    let dice = {
        let engine = engine.clone();
        let id = id.clone();
        tokio::spawn(async move {
            engine
                .provide_input(&id, "dice:food", serde_json::json!(3))
                .await
        })
    };
    let choice = {
        let engine = engine.clone();
        let id = id.clone();
        tokio::spawn(async move {
            engine
                .provide_input(&id, "choice:field", serde_json::json!("north"))
                .await
        })
    };
    dice.await.unwrap().unwrap();
    choice.await.unwrap().unwrap();

    let doc = store.snapshot().await.unwrap();
    let record = doc.executions.get(&id).unwrap();
    assert!(record.resolution.contains_key("dice:food"));
    assert!(record.resolution.contains_key("choice:field"));

    let report = engine.confirm_apply(&id).await.unwrap();
    assert_eq!(report.applied_deltas.get(&Resource::Food), Some(&-3));
}

#[tokio::test]
async fn test_unknown_check_is_rejected() {
    let engine = coordinator(Arc::new(MemoryStore::default()), vec![]);
    let err = engine
        .execute("claim-the-moon", seed("anna", "agriculture"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CheckNotFound(_)));
}

#[tokio::test]
async fn test_unoffered_skill_is_rejected() {
    let engine = coordinator(Arc::new(MemoryStore::default()), vec![]);
    let err = engine
        .execute("harvest-crops", seed("anna", "warfare"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

struct ClosedRoutes;

impl RequirementsHook for ClosedRoutes {
    fn check(&self, _doc: &SessionDocument) -> Result<(), String> {
        Err("trade routes are closed".to_owned())
    }
}

#[tokio::test]
async fn test_requirements_failure_persists_nothing() {
    let store = Arc::new(MemoryStore::default());
    let mut registry = PipelineRegistry::builtin().unwrap();
    registry
        .register_hooks(
            "trade-commodities",
            CheckHooks::default().with_requirements(Arc::new(ClosedRoutes)),
        )
        .unwrap();
    let engine = coordinator_with_registry(store.clone(), vec![], registry);

    let err = engine
        .execute("trade-commodities", seed("ben", "trade"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::RequirementsNotMet(_)));

    // Fail closed: no record, and the queue entry is released so the next
    // execution is not blocked.
    let doc = store.snapshot().await.unwrap();
    assert!(doc.executions.is_empty());
    assert!(doc.lock_holder().is_none());
    assert_eq!(doc.queue[0].status, QueueStatus::Completed);
}

struct GroundSplits;

impl ExecuteHook for GroundSplits {
    fn apply(
        &self,
        doc: &mut SessionDocument,
        _ctx: &HookContext<'_>,
    ) -> Result<Vec<String>, String> {
        doc.kingdom.apply_delta(Resource::Unrest, 2);
        Err("the ground splits".to_owned())
    }
}

#[tokio::test]
async fn test_execute_hook_failure_rolls_forward() {
    let store = Arc::new(MemoryStore::default());
    let mut registry = PipelineRegistry::builtin().unwrap();
    registry
        .register_hooks(
            "harvest-crops",
            CheckHooks::default().with_execute(Arc::new(GroundSplits)),
        )
        .unwrap();
    let engine = coordinator_with_registry(store.clone(), vec![10], registry);

    let approval = engine
        .execute("harvest-crops", seed("anna", "agriculture"))
        .await
        .unwrap();
    let err = engine.confirm_apply(&approval.execution_id).await.unwrap_err();
    assert!(matches!(err, EngineError::ExecutionFailure(_)));

    // Mutations made before the failure are kept, the record carries the
    // error, and the lock is released.
    let doc = store.snapshot().await.unwrap();
    assert_eq!(doc.kingdom.resource(Resource::Food), 2);
    assert_eq!(doc.kingdom.resource(Resource::Unrest), 2);
    let record = doc.executions.get(&approval.execution_id).unwrap();
    assert_eq!(record.status, ExecutionStatus::Failed);
    assert!(record.error.as_deref().unwrap().contains("the ground splits"));
    assert!(doc.lock_holder().is_none());
}

#[tokio::test]
async fn test_event_success_ends_the_ongoing_event() {
    let store = Arc::new(MemoryStore::default());
    store
        .update(Box::new(|doc| {
            doc.kingdom.ongoing_events.push("crop-failure".to_owned());
            Ok(())
        }))
        .await
        .unwrap();
    let engine = coordinator(store.clone(), vec![10]);

    let approval = engine
        .execute("crop-failure", seed("gm", "agriculture"))
        .await
        .unwrap();
    assert_eq!(approval.degree, DegreeOfSuccess::Success);
    assert!(approval.preview.badges.contains(&"ends event".to_owned()));

    engine.confirm_apply(&approval.execution_id).await.unwrap();

    let doc = store.snapshot().await.unwrap();
    assert!(doc.kingdom.ongoing_events.is_empty());
}

#[tokio::test]
async fn test_event_critical_failure_spawns_followup_event() {
    let store = Arc::new(MemoryStore::default());
    store
        .update(Box::new(|doc| {
            doc.kingdom.resources.insert(Resource::Food, 10);
            doc.kingdom.ongoing_events.push("crop-failure".to_owned());
            Ok(())
        }))
        .await
        .unwrap();
    let engine = coordinator(store.clone(), vec![1]);

    let approval = engine
        .execute("crop-failure", seed("gm", "agriculture"))
        .await
        .unwrap();
    assert_eq!(approval.degree, DegreeOfSuccess::CriticalFailure);

    engine.confirm_apply(&approval.execution_id).await.unwrap();

    let doc = store.snapshot().await.unwrap();
    assert_eq!(doc.kingdom.resource(Resource::Food), 6);
    assert_eq!(doc.kingdom.resource(Resource::Unrest), 1);
    // The command started the follow-up event; the failed check itself
    // does not end.
    assert!(doc.kingdom.ongoing_events.contains(&"food-shortage".to_owned()));
    assert!(doc.kingdom.ongoing_events.contains(&"crop-failure".to_owned()));
}
