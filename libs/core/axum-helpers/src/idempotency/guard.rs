use axum::{
    body::{Body, HttpBody},
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::Response,
};
use core_config::{ConfigError, FromEnv, env_parse_or};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

use super::{IdempotencyRecord, IdempotencyStore, ReservationToken, SaveOutcome};
use crate::errors::AppError;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";
pub const IDEMPOTENCY_REPLAY_HEADER: &str = "x-idempotency-replay";
pub const MAX_KEY_LENGTH: usize = 255;

#[derive(Debug, Clone)]
pub struct IdempotencyConfig {
    /// Lifetime of a completed record.
    pub record_ttl: Duration,
    /// Lifetime of the in-flight reservation; bounds how long a crashed request blocks its key.
    pub pending_ttl: Duration,
    /// Largest response body the guard will buffer and record. Larger bodies
    /// are passed through unrecorded.
    pub max_body_bytes: usize,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            record_ttl: Duration::from_secs(24 * 60 * 60),
            pending_ttl: Duration::from_secs(30),
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl FromEnv for IdempotencyConfig {
    /// - `IDEMPOTENCY_TTL_SECS`: defaults to 86400
    /// - `IDEMPOTENCY_PENDING_TTL_SECS`: defaults to 30
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            record_ttl: Duration::from_secs(env_parse_or(
                "IDEMPOTENCY_TTL_SECS",
                defaults.record_ttl.as_secs(),
            )?),
            pending_ttl: Duration::from_secs(env_parse_or(
                "IDEMPOTENCY_PENDING_TTL_SECS",
                defaults.pending_ttl.as_secs(),
            )?),
            ..defaults
        })
    }
}

/// State handed to [`idempotency_guard`] through `from_fn_with_state`.
#[derive(Clone)]
pub struct IdempotencyLayer {
    store: Arc<dyn IdempotencyStore>,
    config: IdempotencyConfig,
}

impl IdempotencyLayer {
    pub fn new(store: Arc<dyn IdempotencyStore>, config: IdempotencyConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn IdempotencyStore> {
        &self.store
    }

    pub fn config(&self) -> &IdempotencyConfig {
        &self.config
    }
}

/// Deduplicates mutating requests by their `Idempotency-Key` header.
///
/// The first request for a key reserves it, runs the handler and, if the
/// handler answered 2xx, stores the response. Later requests with the same key
/// get that response back verbatim, marked with `x-idempotency-replay: true`,
/// and never reach the handler. A request racing an in-flight one gets 409.
/// The reservation is extended while the handler runs. A success whose body
/// exceeds `max_body_bytes` is passed through unrecorded.
///
/// ```ignore
/// let router = Router::new()
///     .route("/items", post(add_item))
///     .layer(middleware::from_fn_with_state(layer, idempotency_guard));
/// ```
pub async fn idempotency_guard(
    State(layer): State<IdempotencyLayer>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !is_mutating(request.method()) {
        return Ok(next.run(request).await);
    }

    let key = idempotency_key(request.headers())?;
    let store = &layer.store;

    if store.exists(&key).await? {
        if let Some(record) = store.get_response(&key).await? {
            tracing::debug!(idempotency_key = %key, "Replaying stored response");
            return replay(record);
        }
    }

    let pending_ttl = layer.config.pending_ttl;
    let Some(token) = store.try_reserve(&key, pending_ttl).await? else {
        return match store.get_response(&key).await? {
            Some(record) => replay(record),
            None => Err(AppError::IdempotencyInProgress(key)),
        };
    };
    let reservation = Reservation::new(store.clone(), key.clone(), token);

    // The first request may have completed between the lookup and the reservation.
    if let Some(record) = store.get_response(&key).await? {
        reservation.release().await;
        return replay(record);
    }

    let response = run_holding(&reservation, pending_ttl, next.run(request)).await;
    let (parts, body) = response.into_parts();

    if !parts.status.is_success() {
        reservation.release().await;
        return Ok(Response::from_parts(parts, body));
    }

    let fits = body
        .size_hint()
        .upper()
        .is_some_and(|len| len <= layer.config.max_body_bytes as u64);
    if !fits {
        tracing::warn!(
            idempotency_key = %key,
            max_body_bytes = layer.config.max_body_bytes,
            "Response body too large to record, returning it unrecorded"
        );
        reservation.release().await;
        return Ok(Response::from_parts(parts, body));
    }

    let bytes = match axum::body::to_bytes(body, layer.config.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            reservation.release().await;
            return Err(AppError::InternalServerError(format!(
                "Failed to buffer response for idempotency key '{key}': {e}"
            )));
        }
    };

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    match std::str::from_utf8(&bytes) {
        Ok(text) => {
            let ttl = layer.config.record_ttl;
            let record = IdempotencyRecord::new(
                key.as_str(),
                parts.status.as_u16(),
                content_type,
                text.to_owned(),
                ttl,
            );
            let saved = store.save(&record, reservation.token(), ttl).await;
            match saved {
                Ok(SaveOutcome::Stored) => reservation.disarm(),
                Ok(SaveOutcome::Existing(winner)) => {
                    tracing::warn!(idempotency_key = %key, "Another execution recorded this key first, replaying it");
                    reservation.disarm();
                    return replay(winner);
                }
                Err(e) => {
                    tracing::error!(idempotency_key = %key, error = %e, "Failed to save idempotency record");
                    reservation.release().await;
                }
            }
        }
        Err(_) => {
            tracing::warn!(idempotency_key = %key, "Response body is not UTF-8, not recorded");
            reservation.release().await;
        }
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

/// Drive `handler` while periodically extending the reservation, so a handler
/// slower than `pending_ttl` keeps its key.
async fn run_holding<F>(reservation: &Reservation, pending_ttl: Duration, handler: F) -> Response
where
    F: Future<Output = Response>,
{
    let period = (pending_ttl / 3).max(Duration::from_millis(1));
    let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(handler);

    loop {
        tokio::select! {
            response = &mut handler => return response,
            _ = heartbeat.tick() => reservation.extend(pending_ttl).await,
        }
    }
}

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn idempotency_key(headers: &HeaderMap) -> Result<String, AppError> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Err(AppError::MissingIdempotencyKey);
    };
    let key = value
        .to_str()
        .map_err(|_| {
            AppError::InvalidIdempotencyKey("Idempotency-Key must be visible ASCII".to_string())
        })?
        .trim();

    if key.is_empty() {
        return Err(AppError::MissingIdempotencyKey);
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(AppError::InvalidIdempotencyKey(format!(
            "Idempotency-Key must be at most {MAX_KEY_LENGTH} characters"
        )));
    }
    Ok(key.to_string())
}

fn replay(record: IdempotencyRecord) -> Result<Response, AppError> {
    let status = StatusCode::from_u16(record.status).map_err(|e| {
        AppError::InternalServerError(format!(
            "Stored status {} for key '{}' is invalid: {e}",
            record.status, record.key
        ))
    })?;

    let mut builder = Response::builder()
        .status(status)
        .header(IDEMPOTENCY_REPLAY_HEADER, "true");
    if let Some(content_type) = record.content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }

    builder
        .body(Body::from(record.body))
        .map_err(|e| AppError::InternalServerError(format!("Failed to build replay: {e}")))
}

/// Held while the handler runs. Dropping it while still armed (the request
/// future was cancelled) releases the key from a background task.
struct Reservation {
    store: Arc<dyn IdempotencyStore>,
    key: String,
    token: ReservationToken,
    armed: bool,
}

impl Reservation {
    fn new(store: Arc<dyn IdempotencyStore>, key: String, token: ReservationToken) -> Self {
        Self {
            store,
            key,
            token,
            armed: true,
        }
    }

    fn token(&self) -> &ReservationToken {
        &self.token
    }

    async fn extend(&self, ttl: Duration) {
        match self.store.extend(&self.key, &self.token, ttl).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(idempotency_key = %self.key, "Reservation expired while the handler was running");
            }
            Err(e) => {
                tracing::warn!(idempotency_key = %self.key, error = %e, "Failed to extend reservation");
            }
        }
    }

    async fn release(mut self) {
        self.armed = false;
        if let Err(e) = self.store.release(&self.key, &self.token).await {
            tracing::warn!(idempotency_key = %self.key, error = %e, "Failed to release reservation");
        }
    }

    /// The reservation was consumed by a save.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let store = self.store.clone();
        let key = std::mem::take(&mut self.key);
        let token = self.token.clone();
        tracing::debug!(idempotency_key = %key, "Request cancelled, releasing reservation");
        handle.spawn(async move {
            if let Err(e) = store.release(&key, &token).await {
                tracing::warn!(idempotency_key = %key, error = %e, "Failed to release reservation");
            }
        });
    }
}
