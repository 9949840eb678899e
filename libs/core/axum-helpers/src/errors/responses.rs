//! Reusable OpenAPI responses for failed requests.

use crate::envelope::ErrorEnvelope;
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToResponse;

#[derive(ToResponse)]
#[response(
    description = "Bad Request - validation failed or Idempotency-Key missing",
    content_type = "application/json",
    example = json!({
        "success": false,
        "message": "Request validation failed",
        "errors": ["Invalid identifier: must be 12 digits and numeric only"],
        "traceId": "4bf92f3577b34da6a3ce929d0e0e4736"
    })
)]
pub struct BadRequestResponse(pub ErrorEnvelope);

#[derive(ToResponse)]
#[response(
    description = "Resource not found",
    content_type = "application/json",
    example = json!({
        "success": false,
        "message": "Resource not found",
        "errors": ["Item 0192b0a4-7c1e-7d31-9a44-3f1e5c2b7a10 not found"],
        "traceId": "4bf92f3577b34da6a3ce929d0e0e4736"
    })
)]
pub struct NotFoundResponse(pub ErrorEnvelope);

#[derive(ToResponse)]
#[response(
    description = "Conflict - illegal state transition or duplicate request in flight",
    content_type = "application/json",
    example = json!({
        "success": false,
        "message": "Request conflicts with the current state of the resource",
        "errors": ["Item already checked out"],
        "traceId": "4bf92f3577b34da6a3ce929d0e0e4736"
    })
)]
pub struct ConflictResponse(pub ErrorEnvelope);

#[derive(ToResponse)]
#[response(
    description = "Service Unavailable - a backing store failed; safe to retry",
    content_type = "application/json",
    example = json!({
        "success": false,
        "message": "Service is temporarily unavailable",
        "errors": ["Service is temporarily unavailable"],
        "traceId": "4bf92f3577b34da6a3ce929d0e0e4736"
    })
)]
pub struct ServiceUnavailableResponse(pub ErrorEnvelope);

#[derive(ToResponse)]
#[response(
    description = "Internal Server Error",
    content_type = "application/json",
    example = json!({
        "success": false,
        "message": "An unexpected error occurred.",
        "errors": ["An unexpected error occurred."],
        "traceId": "4bf92f3577b34da6a3ce929d0e0e4736"
    })
)]
pub struct InternalServerErrorResponse(pub ErrorEnvelope);
