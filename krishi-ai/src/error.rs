//! Error types for krishi-ai
//!
//! Every handler error renders as `{"error": {"code": ..., "message": ...}}`.

use crate::image_input::ImageInputError;
use crate::orchestrator::PredictError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Rejected upload (400)
    #[error(transparent)]
    InvalidImage(#[from] ImageInputError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// krishi-common error
    #[error("Common error: {0}")]
    Common(#[from] krishi_common::Error),
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::InvalidImage(e) => ApiError::InvalidImage(e),
            drift @ PredictError::CatalogInconsistency { .. } => {
                ApiError::Internal(drift.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::InvalidImage(ref err) => {
                (StatusCode::BAD_REQUEST, "INVALID_IMAGE", err.to_string())
            }
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
