//! HTTP error mapping

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use inventory_common::Violation;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Message returned for every store or internal failure; details are only logged
pub const INTERNAL_MESSAGE: &str = "Internal server error. Transaction may have been rolled back.";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request body or query (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// inventory-common error, mapped by kind
    #[error(transparent)]
    Common(#[from] inventory_common::Error),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use inventory_common::Error;

        let (status, code, message, violations) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, Vec::new()),
            ApiError::Common(err) => match err {
                Error::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, Vec::new()),
                Error::InvalidInput { field, message } => {
                    let violation = Violation::batch(field, message.clone());
                    (StatusCode::BAD_REQUEST, "INVALID_INPUT", message, vec![violation])
                }
                Error::Validation(list) => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_FAILED",
                    "Validation failed".to_string(),
                    list,
                ),
                Error::InBatchConflict(msg) | Error::ExistingRecordConflict(msg) => {
                    (StatusCode::CONFLICT, "CONFLICT", msg, Vec::new())
                }
                Error::ReferentialConflict(msg) => {
                    (StatusCode::CONFLICT, "REFERENTIAL_CONFLICT", msg, Vec::new())
                }
                other => {
                    error!(error = %other, "Request failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        INTERNAL_MESSAGE.to_string(),
                        Vec::new(),
                    )
                }
            },
        };

        let body = if violations.is_empty() {
            json!({
                "error": {
                    "code": code,
                    "message": message,
                }
            })
        } else {
            json!({
                "error": {
                    "code": code,
                    "message": message,
                    "violations": violations,
                }
            })
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
