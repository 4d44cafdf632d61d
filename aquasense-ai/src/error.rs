//! Error types for aquasense-ai
//!
//! [`AnalysisError`] is the only failure an analysis request can surface;
//! [`ApiError`] maps it (and everything else a handler can hit) onto HTTP.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Caller-visible analysis failures
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    /// Malformed or out-of-range input
    #[error("Invalid {field}: {message}")]
    InputValidation { field: String, message: String },

    #[error("Tank not found: {0}")]
    TankNotFound(String),

    /// Neither the classifier nor validation produced a usable signal
    #[error("Analysis unavailable: {reason}")]
    AnalysisUnavailable { reason: String },

    #[error("Analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    pub fn input(field: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisError::InputValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        AnalysisError::AnalysisUnavailable {
            reason: reason.into(),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Field-level validation failure (400)
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Retryable upstream failure (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// aquasense-common error
    #[error("Common error: {0}")]
    Common(#[from] aquasense_common::Error),
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InputValidation { field, message } => ApiError::Validation { field, message },
            AnalysisError::TankNotFound(id) => ApiError::NotFound(format!("tank {}", id)),
            AnalysisError::AnalysisUnavailable { reason } => ApiError::ServiceUnavailable(reason),
            // Only reachable when the client has already gone away
            AnalysisError::Cancelled => ApiError::ServiceUnavailable("request cancelled".to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                json!({ "code": "NOT_FOUND", "message": msg }),
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "code": "BAD_REQUEST", "message": msg }),
            ),
            ApiError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                json!({ "code": "INVALID_INPUT", "message": message, "field": field }),
            ),
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "code": "ANALYSIS_UNAVAILABLE", "message": msg, "retryable": true }),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "code": "COMMON_ERROR", "message": err.to_string() }),
            ),
        };

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
