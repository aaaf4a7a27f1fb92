//! API error taxonomy and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::kernel::{PipelineError, StoreError};

/// Failures surfaced to HTTP clients. Every variant maps to one status
/// code and a `{error, message}` JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing client input; rejected before any job
    /// mutation or downstream call. 400.
    #[error("{0}")]
    Validation(String),

    /// Unknown job or absent audio payload. 404.
    #[error("{0}")]
    NotFound(String),

    /// Pre-flight health check against the inference backend failed. 503.
    #[error("{0}")]
    Unavailable(String),

    /// A downstream stage failed after exhausting retries. 500.
    #[error("{0}")]
    Processing(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "Invalid request",
            ApiError::NotFound(_) => "Not found",
            ApiError::Unavailable(_) => "Service unavailable",
            ApiError::Processing(_) => "Processing failed",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.label(),
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ApiError::NotFound(format!("Job not found: {}", id)),
            // A rejected transition means the caller invoked a stage a
            // terminal or further-along job cannot accept.
            StoreError::IllegalTransition { .. } => ApiError::Validation(e.to_string()),
            StoreError::IncompleteRecord { .. } => ApiError::Processing(e.to_string()),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Unavailable(message) => ApiError::Unavailable(message),
            PipelineError::Downstream(message) => ApiError::Processing(message),
            PipelineError::Store(store) => store.into(),
        }
    }
}
