use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::models::TaskStatus;

/// Failure of one generation request. Scoped to that request, never fatal.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("The request could not be submitted: {0}")]
    Submission(String),

    #[error("Lost contact with the video service after {attempts} failed status checks: {message}")]
    PollingTransport {
        task_id: String,
        attempts: u32,
        message: String,
    },

    #[error(
        "The video service did not finish within {}s (last status: {last_status})",
        waited.as_secs()
    )]
    Timeout {
        task_id: String,
        waited: Duration,
        last_status: TaskStatus,
    },

    #[error("The video service failed the job: {message}")]
    RemoteFailure { task_id: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Submission,
    PollingTransport,
    Timeout,
    RemoteFailure,
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::Validation(_) => ErrorKind::Validation,
            GenerationError::Submission(_) => ErrorKind::Submission,
            GenerationError::PollingTransport { .. } => ErrorKind::PollingTransport,
            GenerationError::Timeout { .. } => ErrorKind::Timeout,
            GenerationError::RemoteFailure { .. } => ErrorKind::RemoteFailure,
        }
    }

    /// Task id, once the job made it past submission.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            GenerationError::Validation(_) | GenerationError::Submission(_) => None,
            GenerationError::PollingTransport { task_id, .. }
            | GenerationError::Timeout { task_id, .. }
            | GenerationError::RemoteFailure { task_id, .. } => Some(task_id),
        }
    }
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Submission | ErrorKind::PollingTransport => StatusCode::BAD_GATEWAY,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::RemoteFailure => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found")]
    NotFound,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Video service is unavailable: {0}")]
    Upstream(String),

    #[error("Internal error")]
    InternalError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::NotFound
        } else {
            tracing::error!("io error: {:?}", e);
            ApiError::InternalError
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
