//! Interaction hooks a check definition may declare for pipeline steps.
//!
//! Hooks are trait objects registered in code; the declarative YAML side
//! of a definition never carries them. Every hook is optional — a
//! definition with no hooks runs steps 1, 2, 5, and 7 as no-ops.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use stronghold_core::check::ExecutionId;
use stronghold_core::outcome::DegreeOfSuccess;
use stronghold_store::document::{OutcomePreview, SessionDocument};

/// Read-only view of a pipeline context handed to hooks.
#[derive(Debug)]
pub struct HookContext<'a> {
    /// The execution being driven.
    pub execution_id: &'a ExecutionId,
    /// Outcome tier of the most recent roll.
    pub degree: DegreeOfSuccess,
    /// Pre-roll selections.
    pub metadata: &'a BTreeMap<String, serde_json::Value>,
    /// Post-roll selections (dice results, choices, map picks).
    pub resolution: &'a BTreeMap<String, serde_json::Value>,
}

/// Step 1: validate the check is currently permitted. Fails closed.
pub trait RequirementsHook: Send + Sync {
    /// Returns `Err(reason)` when the check may not run right now.
    fn check(&self, doc: &SessionDocument) -> Result<(), String>;
}

/// Step 2: a pre-roll selection. Its output lands in the metadata bag.
pub trait PreRollHook: Send + Sync {
    /// Produces metadata entries (e.g. a chosen target entity).
    fn run(&self, doc: &SessionDocument) -> Result<BTreeMap<String, serde_json::Value>, String>;
}

/// Step 5: interactions that let the user affect the preview before
/// committing. Confirm-apply is blocked while any required input is
/// missing from the resolution-data bag.
pub trait OutcomeHook: Send + Sync {
    /// Resolution-data keys that must be present before confirmation.
    fn required_inputs(&self, degree: DegreeOfSuccess) -> Vec<String>;

    /// Optionally adorn the preview (extra badges, warnings).
    fn decorate(&self, degree: DegreeOfSuccess, preview: &mut OutcomePreview) {
        let _ = (degree, preview);
    }
}

/// Step 7: inputs required after commitment but before mutation
/// (e.g. selecting map locations).
pub trait PostApplyHook: Send + Sync {
    /// Resolution-data keys that must be present before step 8 runs.
    fn required_inputs(&self, degree: DegreeOfSuccess) -> Vec<String>;
}

/// Step 8: a custom mutation routine run after the automatic phase.
pub trait ExecuteHook: Send + Sync {
    /// Applies dynamically computed effects to the document. Returned
    /// messages go into the execution report. An error here fails the
    /// execution, but mutations already made are kept.
    fn apply(
        &self,
        doc: &mut SessionDocument,
        ctx: &HookContext<'_>,
    ) -> Result<Vec<String>, String>;
}

/// The optional hooks of one check definition.
#[derive(Clone, Default)]
pub struct CheckHooks {
    /// Step 1.
    pub requirements: Option<Arc<dyn RequirementsHook>>,
    /// Step 2, run in order.
    pub pre_roll: Vec<Arc<dyn PreRollHook>>,
    /// Step 5.
    pub outcome: Option<Arc<dyn OutcomeHook>>,
    /// Step 7.
    pub post_apply: Option<Arc<dyn PostApplyHook>>,
    /// Step 8 custom mutation.
    pub execute: Option<Arc<dyn ExecuteHook>>,
}

impl CheckHooks {
    /// A hook set with a requirements hook.
    #[must_use]
    pub fn with_requirements(mut self, hook: Arc<dyn RequirementsHook>) -> Self {
        self.requirements = Some(hook);
        self
    }

    /// Adds a pre-roll hook.
    #[must_use]
    pub fn with_pre_roll(mut self, hook: Arc<dyn PreRollHook>) -> Self {
        self.pre_roll.push(hook);
        self
    }

    /// Sets the outcome-interaction hook.
    #[must_use]
    pub fn with_outcome(mut self, hook: Arc<dyn OutcomeHook>) -> Self {
        self.outcome = Some(hook);
        self
    }

    /// Sets the post-apply hook.
    #[must_use]
    pub fn with_post_apply(mut self, hook: Arc<dyn PostApplyHook>) -> Self {
        self.post_apply = Some(hook);
        self
    }

    /// Sets the custom execute hook.
    #[must_use]
    pub fn with_execute(mut self, hook: Arc<dyn ExecuteHook>) -> Self {
        self.execute = Some(hook);
        self
    }
}

impl fmt::Debug for CheckHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckHooks")
            .field("requirements", &self.requirements.is_some())
            .field("pre_roll", &self.pre_roll.len())
            .field("outcome", &self.outcome.is_some())
            .field("post_apply", &self.post_apply.is_some())
            .field("execute", &self.execute.is_some())
            .finish()
    }
}
