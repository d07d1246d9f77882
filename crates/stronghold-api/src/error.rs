//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use stronghold_core::error::EngineError;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `EngineError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            EngineError::CheckNotFound(_) => (StatusCode::NOT_FOUND, "check_not_found"),
            EngineError::ExecutionNotFound(_) => (StatusCode::NOT_FOUND, "execution_not_found"),
            EngineError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            EngineError::RequirementsNotMet(_) => (StatusCode::CONFLICT, "requirements_not_met"),
            EngineError::InteractionIncomplete { .. } => {
                (StatusCode::CONFLICT, "interaction_incomplete")
            }
            EngineError::RollFailure(_) => (StatusCode::INTERNAL_SERVER_ERROR, "roll_failure"),
            EngineError::ExecutionFailure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "execution_failure")
            }
            EngineError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
            }
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stronghold_core::check::ExecutionId;

    fn status_of(err: EngineError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn test_check_not_found_maps_to_404() {
        assert_eq!(
            status_of(EngineError::CheckNotFound("claim-the-moon".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_requirements_not_met_maps_to_409() {
        assert_eq!(
            status_of(EngineError::RequirementsNotMet("needs 2 lumber".into())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_interaction_incomplete_maps_to_409() {
        assert_eq!(
            status_of(EngineError::InteractionIncomplete {
                execution_id: ExecutionId::from("turn1-harvest-crops-000001"),
                missing: "dice:food".into(),
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            status_of(EngineError::Validation("bad input".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_execution_failure_maps_to_500() {
        assert_eq!(
            status_of(EngineError::ExecutionFailure("mutation failed".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
