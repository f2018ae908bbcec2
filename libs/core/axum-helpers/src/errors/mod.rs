pub mod codes;
pub mod handlers;
pub mod responses;

pub use codes::ErrorCode;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// Body of every error response.
///
/// ```json
/// {
///   "code": 1004,
///   "error": "NOT_FOUND",
///   "message": "Cannot delete event with ID 7: it does not exist"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Integer error code for logging and monitoring
    pub code: i32,
    /// Machine-readable error identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Optional structured details (e.g. validation field errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application error type rendered as an [`ErrorResponse`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("JSON extraction error: {0}")]
    JsonExtractorRejection(#[from] JsonRejection),

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Malformed CSV: {0}")]
    InvalidCsv(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// Status code and error code this error renders with.
    pub fn status(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::Database(e) => map_db_error(e),
            AppError::JsonExtractorRejection(e) => {
                let status = match e {
                    JsonRejection::MissingJsonContentType(_) => e.status(),
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, ErrorCode::JsonExtraction)
            }
            AppError::ValidationError(_) | AppError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, ErrorCode::ValidationError)
            }
            AppError::InvalidId(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidId),
            AppError::InvalidCsv(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidCsv),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
            AppError::Conflict(_) => (StatusCode::CONFLICT, ErrorCode::Conflict),
            AppError::InternalServerError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError)
            }
            AppError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::ServiceUnavailable)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();

        if status.is_server_error() {
            tracing::error!(error_code = code.code(), "{}", self);
        } else {
            tracing::info!(error_code = code.code(), "{}", self);
        }

        let (message, details) = match self {
            // Storage internals stay in the logs.
            AppError::Database(_) => (code.default_message().to_string(), None),
            AppError::JsonExtractorRejection(e) => (e.body_text(), None),
            AppError::ValidationError(e) => (
                code.default_message().to_string(),
                Some(serde_json::to_value(&e).unwrap_or(serde_json::Value::Null)),
            ),
            AppError::InvalidId(msg)
            | AppError::BadRequest(msg)
            | AppError::InvalidCsv(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::InternalServerError(msg)
            | AppError::ServiceUnavailable(msg) => (msg, None),
        };

        let body = Json(ErrorResponse {
            code: code.code(),
            error: code.as_str().to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

fn map_db_error(error: &DbErr) -> (StatusCode, ErrorCode) {
    match error {
        DbErr::ConnectionAcquire(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::DatabasePoolTimeout,
        ),
        DbErr::Migration(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::MigrationError),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DatabaseError),
    }
}

/// Build an error response without going through [`AppError`].
pub fn error_response(status: StatusCode, message: String, error_code: ErrorCode) -> Response {
    let body = Json(ErrorResponse {
        code: error_code.code(),
        error: error_code.as_str().to_string(),
        message,
        details: None,
    });

    (status, body).into_response()
}
