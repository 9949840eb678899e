use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use super::IdempotencyRecord;
use crate::errors::AppError;

/// Proof of holding a key's reservation. Only the holder may extend, release
/// or complete it, so a request whose reservation expired cannot drop a newer
/// holder's lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationToken(String);

impl ReservationToken {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Result of [`IdempotencyStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The record is now the stored response for its key.
    Stored,
    /// Another execution completed first; its record was kept.
    Existing(IdempotencyRecord),
}

#[derive(Debug, Error)]
pub enum IdempotencyError {
    #[error("Idempotency store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt idempotency record for key '{key}': {details}")]
    Corrupt { key: String, details: String },
}

impl From<redis::RedisError> for IdempotencyError {
    fn from(err: redis::RedisError) -> Self {
        IdempotencyError::Unavailable(err.to_string())
    }
}

impl From<IdempotencyError> for AppError {
    fn from(err: IdempotencyError) -> Self {
        AppError::ServiceUnavailable(err.to_string())
    }
}

/// Durable key → response mapping consulted by the idempotency guard.
///
/// A key has two independent slots: the completed [`IdempotencyRecord`] and a
/// short-lived reservation held while the first request executes. The
/// reservation is a conditional write owned by a [`ReservationToken`], so two
/// concurrent first requests cannot both run the handler. The completed record
/// is also written conditionally: the first stored response for a key is the
/// one every retry sees.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// True once a completed response is stored for `key`.
    async fn exists(&self, key: &str) -> Result<bool, IdempotencyError>;

    /// The completed response for `key`, if any.
    async fn get_response(&self, key: &str) -> Result<Option<IdempotencyRecord>, IdempotencyError>;

    /// Claim `key` for execution. Returns `None` when another request holds it.
    async fn try_reserve(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<ReservationToken>, IdempotencyError>;

    /// Push the reservation's expiry to `ttl` from now. Returns `false` when
    /// `token` no longer holds the key.
    async fn extend(
        &self,
        key: &str,
        token: &ReservationToken,
        ttl: Duration,
    ) -> Result<bool, IdempotencyError>;

    /// Store the completed response unless one already exists, then drop the
    /// reservation if `token` still holds it.
    async fn save(
        &self,
        record: &IdempotencyRecord,
        token: &ReservationToken,
        ttl: Duration,
    ) -> Result<SaveOutcome, IdempotencyError>;

    /// Drop the reservation without recording a response. A no-op when
    /// `token` no longer holds the key.
    async fn release(&self, key: &str, token: &ReservationToken) -> Result<(), IdempotencyError>;
}
