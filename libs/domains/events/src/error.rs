use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    /// Delete of an id that does not exist
    #[error("Cannot delete {kind} with ID {id}: it does not exist")]
    DeleteMissing { kind: &'static str, id: i64 },

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Malformed CSV: {0}")]
    Csv(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type EventResult<T> = Result<T, EventError>;

impl From<DbErr> for EventError {
    fn from(err: DbErr) -> Self {
        EventError::Database(err.to_string())
    }
}

impl From<validator::ValidationErrors> for EventError {
    fn from(err: validator::ValidationErrors) -> Self {
        EventError::Validation(err.to_string())
    }
}

impl From<::csv::Error> for EventError {
    fn from(err: ::csv::Error) -> Self {
        EventError::Csv(err.to_string())
    }
}

/// Convert EventError to AppError for standardized error responses
impl From<EventError> for AppError {
    fn from(err: EventError) -> Self {
        match err {
            e @ (EventError::NotFound { .. } | EventError::DeleteMissing { .. }) => {
                AppError::NotFound(e.to_string())
            }
            EventError::Conflict(msg) => AppError::Conflict(msg),
            EventError::Validation(msg) => AppError::BadRequest(msg),
            EventError::Csv(msg) => AppError::InvalidCsv(msg),
            EventError::Database(msg) => {
                // Details stay in the log; the client gets a generic message.
                tracing::error!(error = %msg, "Storage failure");
                AppError::InternalServerError("Database error occurred".to_string())
            }
            EventError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for EventError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
