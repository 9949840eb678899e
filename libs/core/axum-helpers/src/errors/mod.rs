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
use thiserror::Error;
use validator::ValidationErrors;

use crate::envelope::ApiResponse;

/// Application error type rendered as a failed [`ApiResponse`] envelope.
///
/// Domain crates convert their own errors into `AppError`; the variant picks the
/// status code, the [`ErrorCode`] logged alongside it and the envelope message.
/// Client errors expose their detail in `errors`; server errors log the detail
/// and expose only the generic message.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("JSON extraction error: {0}")]
    JsonExtractorRejection(#[from] JsonRejection),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Invalid UUID: {0}")]
    InvalidUuid(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Missing Idempotency-Key header")]
    MissingIdempotencyKey,

    #[error("Invalid Idempotency-Key header: {0}")]
    InvalidIdempotencyKey(String),

    #[error("Request with Idempotency-Key '{0}' is still in progress")]
    IdempotencyInProgress(String),

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(validation_messages(&errors))
    }
}

/// Flatten field errors into `"field: message"` strings, sorted by field.
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                let detail = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                format!("{field}: {detail}")
            })
        })
        .collect();
    messages.sort();
    messages
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::JsonExtractorRejection(rejection) => rejection.status(),
            AppError::Validation(_)
            | AppError::BadRequest(_)
            | AppError::InvalidUuid(_)
            | AppError::MissingIdempotencyKey
            | AppError::InvalidIdempotencyKey(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::IdempotencyInProgress(_) => StatusCode::CONFLICT,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::JsonExtractorRejection(_) => ErrorCode::InvalidJson,
            AppError::Validation(_) | AppError::BadRequest(_) => ErrorCode::ValidationError,
            AppError::InvalidUuid(_) => ErrorCode::InvalidUuid,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Conflict(_) => ErrorCode::Conflict,
            AppError::MissingIdempotencyKey => ErrorCode::MissingIdempotencyKey,
            AppError::InvalidIdempotencyKey(_) => ErrorCode::InvalidIdempotencyKey,
            AppError::IdempotencyInProgress(_) => ErrorCode::IdempotencyInProgress,
            AppError::InternalServerError(_) => ErrorCode::InternalError,
            AppError::ServiceUnavailable(_) => ErrorCode::ServiceUnavailable,
        }
    }

    /// Entries for the envelope's `errors` list.
    fn client_errors(self) -> Vec<String> {
        match self {
            AppError::JsonExtractorRejection(rejection) => vec![rejection.body_text()],
            AppError::Validation(messages) => messages,
            AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::InvalidIdempotencyKey(msg) => vec![msg],
            AppError::InvalidUuid(value) => vec![format!("Invalid UUID: {value}")],
            AppError::MissingIdempotencyKey => {
                vec!["Idempotency-Key header is required for this operation".to_string()]
            }
            AppError::IdempotencyInProgress(_) => {
                vec!["Retry once the original request has completed".to_string()]
            }
            // Infrastructure detail stays in the logs.
            AppError::InternalServerError(_) | AppError::ServiceUnavailable(_) => vec![],
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        if status.is_server_error() {
            tracing::error!(error_code = code.code(), error = %self, "Request failed");
        } else if matches!(code, ErrorCode::Conflict | ErrorCode::IdempotencyInProgress) {
            tracing::info!(error_code = code.code(), error = %self, "Request conflicted");
        } else {
            tracing::debug!(error_code = code.code(), error = %self, "Request rejected");
        }

        let envelope = ApiResponse::failure(code.default_message(), self.client_errors());
        (status, Json(envelope)).into_response()
    }
}
