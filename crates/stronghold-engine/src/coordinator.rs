//! The pipeline coordinator: drives a check through all nine steps.
//!
//! `execute` runs steps 1 through 6 and suspends at the confirm-apply
//! point; `confirm_apply` runs steps 7 through 9. The suspension is
//! persisted, so a confirm can arrive after a process restart. Error
//! propagation rolls forward, never back: a failure marks the record
//! `Failed`, keeps any mutations already made, and releases the queue
//! lock.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex as StdMutex};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use stronghold_core::check::ExecutionId;
use stronghold_core::clock::Clock;
use stronghold_core::error::EngineError;
use stronghold_core::outcome::DegreeOfSuccess;
use stronghold_core::resource::Resource;
use stronghold_core::rng::DeterministicRng;
use stronghold_registry::{CheckDefinition, GameCommand, HookContext, PipelineRegistry};
use stronghold_store::document::{
    AuditEntry, ExecutionStatus, OutcomePreview, PausedAt, RollState,
};
use stronghold_store::{SessionDocument, SessionStore};

use crate::context::{ExecutionReport, ExecutionSeed, PipelineContext};
use crate::modifiers;
use crate::queue::OrchestrationQueue;
use crate::reroll::{merge_rerolled, RerollStore};
use crate::roll::{RollRequest, RollSubsystem};

/// The state handed back when an execution suspends at the confirm-apply
/// point: everything the approval surface needs to render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingApproval {
    /// The suspended execution.
    pub execution_id: ExecutionId,
    /// Check identifier.
    pub check_id: String,
    /// Outcome tier of the roll.
    pub degree: DegreeOfSuccess,
    /// The outcome preview.
    pub preview: OutcomePreview,
    /// Resolution-data keys that must be supplied before confirmation.
    pub required_inputs: Vec<String>,
}

/// Orchestrates check executions over the shared session document.
pub struct CheckCoordinator {
    store: Arc<dyn SessionStore>,
    registry: Arc<PipelineRegistry>,
    queue: OrchestrationQueue,
    reroll: RerollStore,
    roller: Arc<dyn RollSubsystem>,
    rng: Arc<StdMutex<dyn DeterministicRng + Send>>,
    clock: Arc<dyn Clock>,
    /// In-flight contexts suspended at the confirm-apply point. An entry
    /// missing here (process restart) is rebuilt from its record.
    pending: Mutex<HashMap<ExecutionId, PipelineContext>>,
}

impl CheckCoordinator {
    /// Creates a coordinator over the given store, registry, and roll
    /// subsystem.
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        registry: Arc<PipelineRegistry>,
        roller: Arc<dyn RollSubsystem>,
        rng: Arc<StdMutex<dyn DeterministicRng + Send>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let queue = OrchestrationQueue::new(store.clone(), clock.clone());
        let reroll = RerollStore::new(store.clone());
        Self {
            store,
            registry,
            queue,
            reroll,
            roller,
            rng,
            clock,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a check execution: enqueues it, waits for the lock, runs
    /// steps 1 through 6, and suspends at the confirm-apply point.
    ///
    /// # Errors
    ///
    /// `EngineError::CheckNotFound` for an unknown check,
    /// `EngineError::Validation` for a skill the check does not offer,
    /// `EngineError::RequirementsNotMet` when step 1 fails (nothing is
    /// persisted in that case), or the failure of any later step (the
    /// record is then marked `Failed` and the lock released).
    #[instrument(skip(self, seed), fields(check_id, initiator = %seed.initiator))]
    pub async fn execute(
        &self,
        check_id: &str,
        seed: ExecutionSeed,
    ) -> Result<PendingApproval, EngineError> {
        let definition = self.registry.get(check_id)?.clone();
        if definition.dc_for(&seed.skill).is_none() {
            return Err(EngineError::Validation(format!(
                "{} cannot be attempted with {}",
                definition.id, seed.skill
            )));
        }

        let turn = self.store.snapshot().await?.turn;
        let execution_id = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|e| EngineError::Infrastructure(format!("RNG mutex poisoned: {e}")))?;
            ExecutionId::generate(turn, check_id, &mut *rng)
        };

        let mut ctx = PipelineContext::new(
            execution_id,
            definition.kind,
            check_id,
            turn,
            seed,
        );

        let queue_id = self
            .queue
            .enqueue(definition.kind, check_id, &ctx.initiator)
            .await?;
        self.queue.acquire(&queue_id).await?;
        ctx.queue_id = Some(queue_id);

        self.run_to_suspension(ctx, &definition, false).await
    }

    /// Steps 1 and 2, then hands off to the roll phase.
    async fn run_to_suspension(
        &self,
        mut ctx: PipelineContext,
        definition: &CheckDefinition,
        is_reroll: bool,
    ) -> Result<PendingApproval, EngineError> {
        let doc = self.store.snapshot().await?;

        // Step 1 — requirements, fail closed. Nothing has been persisted
        // for this execution yet, so a failure leaves only a completed
        // queue entry behind.
        if let Some(requirements) = &definition.hooks.requirements
            && let Err(reason) = requirements.check(&doc)
        {
            self.release_queue(&ctx).await;
            return Err(EngineError::RequirementsNotMet(reason));
        }
        ctx.step = 1;

        // Step 2 — pre-roll interactions populate the metadata bag.
        for hook in &definition.hooks.pre_roll {
            match hook.run(&doc) {
                Ok(entries) => ctx.metadata.extend(entries),
                Err(reason) => {
                    self.release_queue(&ctx).await;
                    return Err(EngineError::InteractionIncomplete {
                        execution_id: ctx.execution_id.clone(),
                        missing: reason,
                    });
                }
            }
        }
        ctx.step = 2;

        self.run_roll_to_suspension(ctx, definition, is_reroll).await
    }

    /// Steps 3 through 6: roll, preview, outcome interactions, suspend.
    async fn run_roll_to_suspension(
        &self,
        mut ctx: PipelineContext,
        definition: &CheckDefinition,
        is_reroll: bool,
    ) -> Result<PendingApproval, EngineError> {
        let doc = self.store.snapshot().await?;
        let chosen = ctx.skill.clone().ok_or_else(|| {
            EngineError::Validation(format!("{} has no chosen skill", ctx.execution_id))
        })?;
        let dc = definition.dc_for(&chosen.skill).ok_or_else(|| {
            EngineError::Validation(format!(
                "{} cannot be attempted with {}",
                definition.id, chosen.skill
            ))
        })?;

        let mut situational = modifiers::collect(&doc, definition, &chosen.skill);
        if is_reroll
            && let Some(stored) = self.reroll.load(&ctx.execution_id, ctx.turn).await?
        {
            situational = merge_rerolled(situational, &stored);
        }

        // The roll awaits an external subsystem, so the suspension point
        // is persisted first: an interruption here leaves a resumable
        // record for an operator rather than a vanished execution.
        self.persist(&ctx, ExecutionStatus::Pending, Some(PausedAt::Roll))
            .await?;

        let outcome = match self
            .roller
            .perform(RollRequest {
                label: definition.name.clone(),
                skill: chosen.skill.clone(),
                actor: chosen.actor.clone(),
                dc,
                modifiers: situational,
                roll_twice_keep_higher: ctx.fortune,
            })
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => return Err(self.fail(&mut ctx, err).await),
        };

        if !is_reroll {
            self.reroll
                .save(&ctx.execution_id, ctx.turn, &outcome.modifiers_used)
                .await?;
        }

        ctx.roll = Some(RollState {
            skill: chosen.skill.clone(),
            dc,
            natural: outcome.natural,
            total: outcome.total,
            degree: outcome.degree,
            modifiers: outcome.modifiers_used,
        });
        ctx.step = 3;

        // Step 4 — outcome preview.
        let mut preview = build_preview(definition, outcome.degree);
        ctx.step = 4;

        // Step 5 — outcome interactions decorate the preview; required
        // inputs become warnings until supplied.
        if let Some(outcome_hook) = &definition.hooks.outcome {
            outcome_hook.decorate(outcome.degree, &mut preview);
        }
        let required = required_inputs(definition, outcome.degree);
        for key in &required {
            if !ctx.resolution.contains_key(key) {
                preview.warnings.push(format!("awaiting input: {key}"));
            }
        }
        ctx.preview = Some(preview.clone());
        ctx.step = 5;

        // Step 6 — suspend at the confirm-apply point.
        if let Some(queue_id) = ctx.queue_id.clone() {
            self.queue.pause(&queue_id).await?;
        }
        self.persist(&ctx, ExecutionStatus::Pending, Some(PausedAt::Apply))
            .await?;

        info!(
            execution_id = %ctx.execution_id,
            check_id = %ctx.check_id,
            degree = %outcome.degree,
            "awaiting outcome confirmation"
        );

        let approval = PendingApproval {
            execution_id: ctx.execution_id.clone(),
            check_id: ctx.check_id.clone(),
            degree: outcome.degree,
            preview,
            required_inputs: required,
        };
        self.pending.lock().await.insert(ctx.execution_id.clone(), ctx);
        Ok(approval)
    }

    /// Supplies one resolution-data entry (a rolled die, a choice, a map
    /// pick) for a suspended execution.
    ///
    /// # Errors
    ///
    /// `EngineError::ExecutionNotFound` if nothing is suspended under the
    /// identifier.
    pub async fn provide_input(
        &self,
        execution_id: &ExecutionId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), EngineError> {
        // Mutated in place under the map lock, and persisted before the
        // lock is dropped: a concurrent input for the same execution must
        // observe this one, not race it through the record fallback.
        let mut pending = self.pending.lock().await;
        let ctx = match pending.entry(execution_id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let doc = self.store.snapshot().await?;
                let record = doc
                    .executions
                    .get(execution_id)
                    .ok_or_else(|| EngineError::ExecutionNotFound(execution_id.clone()))?;
                entry.insert(PipelineContext::from_record(record)?)
            }
        };
        ctx.resolution.insert(key.to_owned(), value);
        if let Some(preview) = &mut ctx.preview {
            preview
                .warnings
                .retain(|warning| warning != &format!("awaiting input: {key}"));
        }
        self.persist(ctx, ExecutionStatus::Pending, Some(PausedAt::Apply))
            .await?;
        Ok(())
    }

    /// Confirms a suspended execution and runs steps 7 through 9.
    ///
    /// # Errors
    ///
    /// `EngineError::InteractionIncomplete` while required inputs are
    /// missing (the execution stays suspended),
    /// `EngineError::ExecutionNotFound` for an unknown identifier, or
    /// `EngineError::ExecutionFailure` when the mutation step fails (the
    /// record is marked `Failed`, partial mutations are kept, the lock is
    /// released).
    #[instrument(skip(self), fields(execution_id = %execution_id))]
    pub async fn confirm_apply(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<ExecutionReport, EngineError> {
        let mut ctx = self.take_pending(execution_id).await?;
        let definition = self.registry.get(&ctx.check_id)?.clone();
        let degree = ctx
            .roll
            .as_ref()
            .map(|roll| roll.degree)
            .ok_or_else(|| {
                EngineError::Validation(format!("{execution_id} has no roll result"))
            })?;

        // Steps 5 and 7 gate confirmation on their declared inputs.
        let missing: Vec<String> = required_inputs(&definition, degree)
            .into_iter()
            .filter(|key| !ctx.resolution.contains_key(key))
            .collect();
        if !missing.is_empty() {
            let err = EngineError::InteractionIncomplete {
                execution_id: execution_id.clone(),
                missing: missing.join(", "),
            };
            self.pending.lock().await.insert(execution_id.clone(), ctx);
            return Err(err);
        }

        ctx.user_confirmed = true;
        if let Some(queue_id) = ctx.queue_id.clone() {
            self.queue.resume(&queue_id).await?;
        }
        ctx.step = 7;
        self.persist(&ctx, ExecutionStatus::Resolved, None).await?;

        // Step 8 — the mutation step.
        let report = match self.apply_outcome(&ctx, &definition, degree).await {
            Ok(report) => report,
            Err(err) => return Err(self.fail(&mut ctx, err).await),
        };
        ctx.step = 8;

        // Step 9 — cleanup: audit, drop the record, release the lock.
        self.cleanup(&ctx, &report).await?;
        Ok(report)
    }

    /// Rerolls a suspended, unconfirmed execution: the previous roll and
    /// preview are discarded and steps 3 through 6 run again with the
    /// stored modifier list merged in.
    ///
    /// # Errors
    ///
    /// `EngineError::ExecutionNotFound` for an unknown identifier, or
    /// `EngineError::Validation` once the outcome has been confirmed.
    #[instrument(skip(self), fields(execution_id = %execution_id))]
    pub async fn reroll(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<PendingApproval, EngineError> {
        let mut ctx = self.take_pending(execution_id).await?;
        if ctx.user_confirmed {
            let err = EngineError::Validation(format!(
                "{execution_id} is already confirmed and cannot be rerolled"
            ));
            self.pending.lock().await.insert(execution_id.clone(), ctx);
            return Err(err);
        }
        let definition = self.registry.get(&ctx.check_id)?.clone();

        ctx.roll = None;
        ctx.preview = None;
        ctx.resolution.clear();
        if let Some(queue_id) = ctx.queue_id.clone() {
            self.queue.resume(&queue_id).await?;
        }

        self.run_roll_to_suspension(ctx, &definition, true).await
    }

    /// Rebuilds the in-memory context for an execution suspended at the
    /// confirm-apply point, after a process restart.
    ///
    /// # Errors
    ///
    /// `EngineError::ExecutionNotFound` for an unknown identifier, or
    /// `EngineError::Validation` for a record paused at its roll (those
    /// need operator intervention).
    pub async fn resume_paused(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<PendingApproval, EngineError> {
        let ctx = self.take_pending(execution_id).await?;
        let degree = ctx.roll.as_ref().map(|roll| roll.degree).ok_or_else(|| {
            EngineError::Validation(format!("{execution_id} has no roll result"))
        })?;
        let definition = self.registry.get(&ctx.check_id)?.clone();

        let approval = PendingApproval {
            execution_id: ctx.execution_id.clone(),
            check_id: ctx.check_id.clone(),
            degree,
            preview: ctx.preview.clone().unwrap_or_default(),
            required_inputs: required_inputs(&definition, degree),
        };
        self.pending.lock().await.insert(execution_id.clone(), ctx);
        Ok(approval)
    }

    /// Rebuilds pending contexts for every record suspended at the
    /// confirm-apply point, typically at startup over a persistent store.
    /// Records paused at their roll cannot be auto-resumed and are logged
    /// for operator attention.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure error if the document cannot be read.
    pub async fn resume_all(&self) -> Result<Vec<PendingApproval>, EngineError> {
        let doc = self.store.snapshot().await?;
        let mut resumed = Vec::new();
        for (id, record) in &doc.executions {
            match record.paused_at {
                Some(PausedAt::Apply) => resumed.push(self.resume_paused(id).await?),
                Some(PausedAt::Roll) => {
                    warn!(execution_id = %id, "paused at roll; needs operator intervention");
                }
                None => {}
            }
        }
        Ok(resumed)
    }

    /// Advances to the next kingdom turn. Stored reroll modifiers are
    /// turn-scoped and discarded at the boundary.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure error if the document cannot be updated.
    pub async fn advance_turn(&self) -> Result<u32, EngineError> {
        let doc = self
            .store
            .update(Box::new(|doc| {
                doc.turn += 1;
                doc.reroll.clear();
                Ok(())
            }))
            .await?;
        info!(turn = doc.turn, "turn advanced");
        Ok(doc.turn)
    }

    /// Pops a suspended context, falling back to its persisted record.
    async fn take_pending(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<PipelineContext, EngineError> {
        if let Some(ctx) = self.pending.lock().await.remove(execution_id) {
            return Ok(ctx);
        }
        let doc = self.store.snapshot().await?;
        let record = doc
            .executions
            .get(execution_id)
            .ok_or_else(|| EngineError::ExecutionNotFound(execution_id.clone()))?;
        PipelineContext::from_record(record)
    }

    /// Persists the context's current state as its execution record.
    async fn persist(
        &self,
        ctx: &PipelineContext,
        status: ExecutionStatus,
        paused_at: Option<PausedAt>,
    ) -> Result<(), EngineError> {
        let record = ctx.to_record(status, paused_at);
        let id = ctx.execution_id.clone();
        self.store
            .update(Box::new(move |doc| {
                doc.executions.insert(id, record);
                Ok(())
            }))
            .await?;
        Ok(())
    }

    /// Step 8: the automatic phase (static deltas, dice results, fame on
    /// a critical success, game commands, event endings) followed by the
    /// definition's custom mutation hook, all in one atomic update.
    async fn apply_outcome(
        &self,
        ctx: &PipelineContext,
        definition: &CheckDefinition,
        degree: DegreeOfSuccess,
    ) -> Result<ExecutionReport, EngineError> {
        let effect = definition.effect(degree).cloned().unwrap_or_default();
        let mut planned: BTreeMap<Resource, i64> = BTreeMap::new();
        let mut messages = Vec::new();

        if definition.automatic_apply {
            planned = effect.deltas.clone();
            for (resource, formula) in &effect.dice {
                let key = format!("dice:{}", resource.as_key());
                let rolled = ctx
                    .resolution
                    .get(&key)
                    .and_then(serde_json::Value::as_i64)
                    .ok_or_else(|| {
                        EngineError::ExecutionFailure(format!(
                            "missing dice result for {formula} ({key})"
                        ))
                    })?;
                let delta = if formula.starts_with('-') {
                    -rolled.abs()
                } else {
                    rolled.abs()
                };
                *planned.entry(*resource).or_insert(0) += delta;
            }
            if degree == DegreeOfSuccess::CriticalSuccess {
                *planned.entry(Resource::Fame).or_insert(0) += 1;
            }
        }
        if let Some(message) = &effect.message {
            messages.push(message.clone());
        }

        let hooks = definition.hooks.clone();
        let hook_messages: Arc<StdMutex<Vec<String>>> = Arc::new(StdMutex::new(Vec::new()));
        let deltas = planned.clone();
        let commands = effect.commands.clone();
        let ends_event = effect.ends_event;
        let check_id = ctx.check_id.clone();
        let execution_id = ctx.execution_id.clone();
        let metadata = ctx.metadata.clone();
        let resolution = ctx.resolution.clone();
        let cell = hook_messages.clone();

        self.store
            .update(Box::new(move |doc| {
                for (resource, delta) in &deltas {
                    doc.kingdom.apply_delta(*resource, *delta);
                }
                for command in &commands {
                    apply_command(doc, command);
                }
                if ends_event {
                    doc.kingdom.ongoing_events.retain(|event| event != &check_id);
                }

                if let Some(execute) = &hooks.execute {
                    let hook_ctx = HookContext {
                        execution_id: &execution_id,
                        degree,
                        metadata: &metadata,
                        resolution: &resolution,
                    };
                    // Mutations made before a hook error are kept.
                    let produced = execute
                        .apply(doc, &hook_ctx)
                        .map_err(EngineError::ExecutionFailure)?;
                    if let Ok(mut cell) = cell.lock() {
                        cell.extend(produced);
                    }
                }
                Ok(())
            }))
            .await?;

        if let Ok(mut cell) = hook_messages.lock() {
            messages.append(&mut cell);
        }

        Ok(ExecutionReport {
            execution_id: ctx.execution_id.clone(),
            check_id: ctx.check_id.clone(),
            degree,
            applied_deltas: planned,
            messages,
        })
    }

    /// Step 9: audit entry, record removal, lock release.
    async fn cleanup(
        &self,
        ctx: &PipelineContext,
        report: &ExecutionReport,
    ) -> Result<(), EngineError> {
        let entry = AuditEntry {
            at: self.clock.now(),
            execution_id: ctx.execution_id.clone(),
            check_id: ctx.check_id.clone(),
            degree: report.degree,
            message: report.messages.first().cloned().unwrap_or_else(|| {
                format!("{} resolved: {}", ctx.check_id, report.degree)
            }),
        };
        let id = ctx.execution_id.clone();
        self.store
            .update(Box::new(move |doc| {
                doc.executions.remove(&id);
                doc.reroll.remove(&id);
                doc.audit.push(entry);
                Ok(())
            }))
            .await?;

        if let Some(queue_id) = &ctx.queue_id {
            self.queue.release(queue_id).await?;
        }
        info!(
            execution_id = %ctx.execution_id,
            check_id = %ctx.check_id,
            degree = %report.degree,
            "execution completed"
        );
        Ok(())
    }

    /// Failure path for steps with a persisted record: mark it `Failed`,
    /// keep whatever was already mutated, release the lock, hand the
    /// original error back.
    async fn fail(&self, ctx: &mut PipelineContext, err: EngineError) -> EngineError {
        warn!(
            execution_id = %ctx.execution_id,
            error = %err,
            "execution failed"
        );
        let mut record = ctx.to_record(ExecutionStatus::Failed, None);
        record.error = Some(err.to_string());
        let id = ctx.execution_id.clone();
        let persisted = self
            .store
            .update(Box::new(move |doc| {
                doc.executions.insert(id, record);
                Ok(())
            }))
            .await;
        if let Err(store_err) = persisted {
            warn!(error = %store_err, "failed to persist failure record");
        }
        self.release_queue(ctx).await;
        err
    }

    async fn release_queue(&self, ctx: &PipelineContext) {
        if let Some(queue_id) = &ctx.queue_id
            && let Err(err) = self.queue.release(queue_id).await
        {
            warn!(queue_id, error = %err, "failed to release queue entry");
        }
    }
}

/// Builds the step-4 preview from the definition's effect table.
fn build_preview(definition: &CheckDefinition, degree: DegreeOfSuccess) -> OutcomePreview {
    let effect = definition.effect(degree).cloned().unwrap_or_default();
    let mut badges = vec![degree.to_string(), definition.kind.to_string()];
    if !definition.automatic_apply {
        badges.push("manual".to_owned());
    }
    if effect.ends_event {
        badges.push("ends event".to_owned());
    }
    OutcomePreview {
        deltas: if definition.automatic_apply {
            effect.deltas
        } else {
            BTreeMap::new()
        },
        badges,
        warnings: Vec::new(),
        message: effect.message,
    }
}

/// The resolution-data keys a definition requires before confirmation:
/// outcome-interaction inputs, one entry per dice sub-effect (only when
/// the automatic phase will consume them), and post-apply inputs.
fn required_inputs(definition: &CheckDefinition, degree: DegreeOfSuccess) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(outcome) = &definition.hooks.outcome {
        keys.extend(outcome.required_inputs(degree));
    }
    if definition.automatic_apply
        && let Some(effect) = definition.effect(degree)
    {
        keys.extend(
            effect
                .dice
                .keys()
                .map(|resource| format!("dice:{}", resource.as_key())),
        );
    }
    if let Some(post_apply) = &definition.hooks.post_apply {
        keys.extend(post_apply.required_inputs(degree));
    }
    keys.dedup();
    keys
}

/// Applies one non-resource game command to the document.
fn apply_command(doc: &mut SessionDocument, command: &GameCommand) {
    match command {
        GameCommand::AddOngoingEvent { event } => {
            if !doc.kingdom.ongoing_events.contains(event) {
                doc.kingdom.ongoing_events.push(event.clone());
            }
        }
        GameCommand::AddAid {
            check_id,
            provider,
            value,
        } => {
            doc.kingdom.aid.push(stronghold_store::document::AidEntry {
                check_id: check_id.clone(),
                provider: provider.clone(),
                value: *value,
            });
        }
        GameCommand::RemoveStructure { structure } => {
            doc.kingdom
                .structures
                .retain(|bonus| &bonus.structure != structure);
        }
    }
}
