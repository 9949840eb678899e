//! Error codes attached to every logged failure.
//!
//! Each code has a string form, a numeric form for dashboards, and the default
//! message used as the envelope's `message` field.
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::MissingIdempotencyKey;
//! assert_eq!(code.as_str(), "MISSING_IDEMPOTENCY_KEY");
//! assert_eq!(code.code(), 1006);
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Client errors (1000s)
    ValidationError,
    InvalidUuid,
    InvalidJson,
    NotFound,
    Conflict,
    MissingIdempotencyKey,
    InvalidIdempotencyKey,
    IdempotencyInProgress,

    // Server errors (1500s)
    InternalError,
    ServiceUnavailable,
}

impl ErrorCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InvalidUuid => "INVALID_UUID",
            Self::InvalidJson => "INVALID_JSON",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::MissingIdempotencyKey => "MISSING_IDEMPOTENCY_KEY",
            Self::InvalidIdempotencyKey => "INVALID_IDEMPOTENCY_KEY",
            Self::IdempotencyInProgress => "IDEMPOTENCY_IN_PROGRESS",
            Self::InternalError => "INTERNAL_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }

    pub const fn code(&self) -> i32 {
        match self {
            Self::ValidationError => 1001,
            Self::InvalidUuid => 1002,
            Self::InvalidJson => 1003,
            Self::NotFound => 1004,
            Self::Conflict => 1005,
            Self::MissingIdempotencyKey => 1006,
            Self::InvalidIdempotencyKey => 1007,
            Self::IdempotencyInProgress => 1008,
            Self::InternalError => 1500,
            Self::ServiceUnavailable => 1503,
        }
    }

    pub const fn default_message(&self) -> &'static str {
        match self {
            Self::ValidationError => "Request validation failed",
            Self::InvalidUuid => "Invalid UUID format",
            Self::InvalidJson => "Invalid JSON body",
            Self::NotFound => "Resource not found",
            Self::Conflict => "Request conflicts with the current state of the resource",
            Self::MissingIdempotencyKey => "Missing required header: Idempotency-Key",
            Self::InvalidIdempotencyKey => "Invalid Idempotency-Key header",
            Self::IdempotencyInProgress => {
                "A request with this Idempotency-Key is still being processed"
            }
            Self::InternalError => "An unexpected error occurred.",
            Self::ServiceUnavailable => "Service is temporarily unavailable",
        }
    }

    pub const fn is_server_error(&self) -> bool {
        self.code() >= 1500
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ErrorCode; 10] = [
        ErrorCode::ValidationError,
        ErrorCode::InvalidUuid,
        ErrorCode::InvalidJson,
        ErrorCode::NotFound,
        ErrorCode::Conflict,
        ErrorCode::MissingIdempotencyKey,
        ErrorCode::InvalidIdempotencyKey,
        ErrorCode::IdempotencyInProgress,
        ErrorCode::InternalError,
        ErrorCode::ServiceUnavailable,
    ];

    #[test]
    fn test_codes_are_unique() {
        let mut codes: Vec<i32> = ALL.iter().map(ErrorCode::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ALL.len());
    }

    #[test]
    fn test_serde_matches_as_str() {
        for code in ALL {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn test_server_error_split() {
        assert!(ErrorCode::ServiceUnavailable.is_server_error());
        assert!(!ErrorCode::Conflict.is_server_error());
    }
}
