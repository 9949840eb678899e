//! Readiness check against the active storage backend.

use crate::state::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_helpers::server::{HealthCheckFuture, run_health_checks};

/// Readiness check endpoint. With the Redis backend this PINGs Redis; the
/// in-memory backend is always ready.
pub async fn ready_handler(State(state): State<AppState>) -> Response {
    let mut checks: Vec<(&str, HealthCheckFuture<'_>)> = Vec::new();

    if let Some(redis) = &state.redis {
        let mut redis = redis.clone();
        checks.push((
            "redis",
            Box::pin(async move {
                database::redis::check_health(&mut redis)
                    .await
                    .map_err(|e| format!("Redis ping failed: {}", e))
            }),
        ));
    }

    run_health_checks(checks).await.into_response()
}
