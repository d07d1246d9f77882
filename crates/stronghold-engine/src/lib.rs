//! Stronghold Engine — check-execution orchestration.
//!
//! Drives a check through the nine-step pipeline: requirements, pre-roll
//! interactions, roll, outcome preview, outcome interactions, the
//! confirm-apply suspension, post-apply interactions, mutation, cleanup.
//! A FIFO queue with a single-holder lock serializes executions across all
//! participants, and every suspension point is persisted so an interrupted
//! execution can resume.

pub mod context;
pub mod coordinator;
pub mod modifiers;
pub mod queue;
pub mod reroll;
pub mod roll;

pub use context::{ExecutionReport, ExecutionSeed, PipelineContext};
pub use coordinator::{CheckCoordinator, PendingApproval};
pub use queue::OrchestrationQueue;
pub use reroll::RerollStore;
pub use roll::{D20Roller, RollOutcome, RollRequest, RollSubsystem};
