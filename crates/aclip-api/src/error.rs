//! API error types.

use aclip_pipeline::PipelineError;
use aclip_scheduler::SchedulerError;
use aclip_store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("System busy, try again later")]
    SystemBusy,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::SystemBusy => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ProjectNotFound(id) => ApiError::not_found(format!("project {}", id)),
            StoreError::MetadataMissing(path) => {
                ApiError::not_found(format!("metadata {}", path.display()))
            }
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::SystemBusy { .. } => ApiError::SystemBusy,
            SchedulerError::AlreadyProcessing(id) => {
                ApiError::conflict(format!("project {} is already processing", id))
            }
            SchedulerError::NotRunning(id) => {
                ApiError::conflict(format!("project {} has no running task", id))
            }
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::InvalidStage(n) => {
                ApiError::bad_request(format!("invalid stage index {}", n))
            }
            PipelineError::MissingPrerequisite(stage) => ApiError::conflict(format!(
                "outputs of stages before {} are missing, run earlier stages first",
                stage
            )),
            other => ApiError::internal(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::not_found("x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::SystemBusy.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::conflict("x").status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_scheduler_error_mapping() {
        let busy: ApiError = SchedulerError::SystemBusy { running: 2, cap: 2 }.into();
        assert!(matches!(busy, ApiError::SystemBusy));

        let dup: ApiError = SchedulerError::AlreadyProcessing("p".to_string()).into();
        assert!(matches!(dup, ApiError::Conflict(_)));
    }

    #[test]
    fn test_store_not_found_mapping() {
        let e: ApiError = StoreError::ProjectNotFound("p".to_string()).into();
        assert!(matches!(e, ApiError::NotFound(_)));
    }
}
