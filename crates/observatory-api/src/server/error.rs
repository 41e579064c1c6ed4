use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use contracts::{ApiError, ErrorCode};

use crate::CatalogError;

#[derive(Debug)]
pub(crate) struct HttpApiError {
    pub(crate) status: StatusCode,
    pub(crate) error: ApiError,
}

impl HttpApiError {
    fn not_found(code: ErrorCode, message: &str, details: String) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: ApiError::new(code, message, Some(details)),
        }
    }

    pub(crate) fn invalid_query(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: ApiError::new(ErrorCode::InvalidQuery, message, details),
        }
    }

    pub(crate) fn unavailable() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            error: ApiError::new(
                ErrorCode::ServiceUnavailable,
                "run store is closed",
                None,
            ),
        }
    }

    pub(crate) fn internal(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: ApiError::new(ErrorCode::InternalError, message, details),
        }
    }

    pub(crate) fn from_catalog(err: CatalogError) -> Self {
        match err {
            CatalogError::RunNotFound(run_id) => Self::not_found(
                ErrorCode::RunNotFound,
                "simulation run not found",
                format!("run_id={run_id}"),
            ),
            CatalogError::CheckpointNotFound { run_id, time_step } => Self::not_found(
                ErrorCode::CheckpointNotFound,
                "checkpoint not found",
                format!("run_id={run_id} time_step={time_step}"),
            ),
            CatalogError::AgentNotFound {
                run_id,
                time_step,
                agent_id,
            } => Self::not_found(
                ErrorCode::AgentNotFound,
                "agent not found in checkpoint",
                format!("run_id={run_id} time_step={time_step} agent_id={agent_id}"),
            ),
            CatalogError::InvalidInput(message) => Self::invalid_query(message, None),
            CatalogError::InvalidPayload {
                run_id,
                time_step,
                source,
            } => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                error: ApiError::new(
                    ErrorCode::InvalidPayload,
                    "checkpoint payload does not match the checkpoint schema",
                    Some(format!("run_id={run_id} time_step={time_step} error={source}")),
                ),
            },
            CatalogError::Persistence(err) => {
                tracing::error!(error = %err, "run store operation failed");
                Self::internal("persistence operation failed", Some(err.to_string()))
            }
        }
    }
}

impl From<CatalogError> for HttpApiError {
    fn from(err: CatalogError) -> Self {
        Self::from_catalog(err)
    }
}

impl IntoResponse for HttpApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}
