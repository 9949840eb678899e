//! # Axum Helpers
//!
//! Shared HTTP plumbing for the service binaries.
//!
//! ## Modules
//!
//! - **[`envelope`]**: the `{ success, message, errors?, traceId, data? }` response envelope
//! - **[`errors`]**: [`AppError`] and its error codes, rendered as failed envelopes
//! - **[`extractors`]**: UUID path and validated JSON extractors
//! - **[`http`]**: trace-id and security-header middleware
//! - **[`idempotency`]**: `Idempotency-Key` guard and its stores
//! - **[`server`]**: router assembly, health endpoints, graceful shutdown
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum::Router;
//! use axum_helpers::server::{create_app, create_router, health_router};
//! use core_config::{app_info, server::ServerConfig};
//! use utoipa::OpenApi;
//!
//! #[derive(OpenApi)]
//! #[openapi(paths())]
//! struct ApiDoc;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let app = create_router::<ApiDoc>(Router::new()).merge(health_router(app_info!()));
//!     create_app(app, &ServerConfig::default(), async {}).await
//! }
//! ```

pub mod envelope;
pub mod errors;
pub mod extractors;
pub mod http;
pub mod idempotency;
pub mod server;

pub use envelope::{ApiResponse, ErrorEnvelope};

pub use errors::{AppError, ErrorCode};

pub use extractors::{UuidPath, ValidatedJson};

pub use http::{TRACE_ID_HEADER, current_trace_id, security_headers, trace_id_middleware};

pub use idempotency::{
    IDEMPOTENCY_KEY_HEADER, IDEMPOTENCY_REPLAY_HEADER, IdempotencyConfig, IdempotencyError,
    IdempotencyLayer, IdempotencyRecord, IdempotencyStore, InMemoryIdempotencyStore,
    RedisIdempotencyStore, ReservationToken, SaveOutcome, idempotency_guard,
};

pub use server::{
    HealthCheckFuture, HealthResponse, create_app, create_router, health_router,
    run_health_checks, shutdown_signal,
};
