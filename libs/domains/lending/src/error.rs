use axum::response::{IntoResponse, Response};
use axum_helpers::{AppError, errors::validation_messages};
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::identifier::IdentifierError;

#[derive(Debug, Error)]
pub enum LendingError {
    #[error("Invalid input: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error(transparent)]
    InvalidIdentifier(#[from] IdentifierError),

    #[error("Item not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type LendingResult<T> = Result<T, LendingError>;

impl From<ValidationErrors> for LendingError {
    fn from(errors: ValidationErrors) -> Self {
        LendingError::Validation(validation_messages(&errors))
    }
}

impl From<redis::RedisError> for LendingError {
    fn from(err: redis::RedisError) -> Self {
        LendingError::Store(err.to_string())
    }
}

/// Convert LendingError to AppError for standardized error responses
impl From<LendingError> for AppError {
    fn from(err: LendingError) -> Self {
        match err {
            LendingError::Validation(messages) => AppError::Validation(messages),
            LendingError::InvalidIdentifier(e) => AppError::Validation(vec![e.to_string()]),
            LendingError::NotFound(id) => AppError::NotFound(format!("Item {} not found", id)),
            LendingError::InvalidState(msg) => AppError::Conflict(msg),
            LendingError::Store(msg) => AppError::ServiceUnavailable(msg),
            LendingError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for LendingError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
