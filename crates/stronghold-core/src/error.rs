//! Engine error types.

use thiserror::Error;

use crate::check::ExecutionId;

/// Top-level error type for the check engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A check's requirements are not currently met (step 1). Recoverable:
    /// the user may retry once the requirements hold.
    #[error("requirements not met: {0}")]
    RequirementsNotMet(String),

    /// A declared interaction has not been resolved yet (steps 2/5/7).
    /// Recoverable: the UI blocks progress until the inputs arrive.
    #[error("interaction incomplete for {execution_id}: missing {missing}")]
    InteractionIncomplete {
        /// The execution blocked on unresolved inputs.
        execution_id: ExecutionId,
        /// Comma-separated list of missing input keys.
        missing: String,
    },

    /// The roll subsystem failed to complete a check (step 3). Unrecoverable
    /// for the attempt.
    #[error("roll subsystem failure: {0}")]
    RollFailure(String),

    /// The final mutation step failed (step 8). Unrecoverable; modifiers
    /// already applied remain applied.
    #[error("execution failure: {0}")]
    ExecutionFailure(String),

    /// No check definition is registered under the given identifier.
    #[error("unknown check: {0}")]
    CheckNotFound(String),

    /// No execution record or pending context exists for the identifier.
    #[error("execution not found: {0}")]
    ExecutionNotFound(ExecutionId),

    /// A validation error in engine logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_incomplete_display_lists_missing_keys() {
        let err = EngineError::InteractionIncomplete {
            execution_id: ExecutionId::from("turn1-trade-commodities-a1b2c3"),
            missing: "dice:food, choice:settlement".to_owned(),
        };
        let text = err.to_string();
        assert!(text.contains("turn1-trade-commodities-a1b2c3"));
        assert!(text.contains("dice:food"));
    }

    #[test]
    fn test_requirements_not_met_display() {
        let err = EngineError::RequirementsNotMet("needs 2 lumber".to_owned());
        assert_eq!(err.to_string(), "requirements not met: needs 2 lumber");
    }
}
