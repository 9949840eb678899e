//! Uniform response envelope.
//!
//! Every item endpoint, success or failure, answers with the same JSON shape:
//!
//! ```json
//! {
//!   "success": true,
//!   "message": "Item checked out successfully",
//!   "traceId": "0f4c8e2e9d6a4f35b1c3a7e2d9f0b812",
//!   "data": { "id": "..." }
//! }
//! ```
//!
//! Failures set `success` to `false` and always carry a non-empty `errors` list.

use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::http::trace_id::current_trace_id;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    pub trace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Successful envelope carrying `data`, stamped with the current trace id.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            errors: None,
            trace_id: current_trace_id(),
            data: Some(data),
        }
    }

    /// Pair the envelope with a status code for use as a handler return value.
    pub fn with_status(self, status: StatusCode) -> (StatusCode, Json<Self>) {
        (status, Json(self))
    }
}

impl ApiResponse<()> {
    /// Failed envelope. An empty `errors` list is replaced by the message itself.
    pub fn failure(message: impl Into<String>, errors: Vec<String>) -> Self {
        let message = message.into();
        let errors = if errors.is_empty() {
            vec![message.clone()]
        } else {
            errors
        };

        Self {
            success: false,
            message,
            errors: Some(errors),
            trace_id: current_trace_id(),
            data: None,
        }
    }
}

/// Shape of a failed response, used in OpenAPI documents.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    pub errors: Vec<String>,
    pub trace_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::trace_id::with_trace_id;
    use serde_json::json;

    #[tokio::test]
    async fn test_ok_envelope_serializes_camel_case() {
        let body = with_trace_id("trace-1".to_string(), async {
            serde_json::to_value(ApiResponse::ok("done", json!({ "id": 7 }))).unwrap()
        })
        .await;

        assert_eq!(
            body,
            json!({
                "success": true,
                "message": "done",
                "traceId": "trace-1",
                "data": { "id": 7 }
            })
        );
    }

    #[tokio::test]
    async fn test_failure_without_errors_repeats_message() {
        let envelope = ApiResponse::failure("Item not found", vec![]);

        assert!(!envelope.success);
        assert_eq!(envelope.errors, Some(vec!["Item not found".to_string()]));
        assert!(envelope.data.is_none());
        assert!(!envelope.trace_id.is_empty());
    }
}
