use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

/// Best-effort byte cache with per-entry TTL. A missing key is `Ok(None)`.
///
/// Each key carries a generation that every [`Cache::remove`] advances. A
/// reader that loads from the source of truth takes the generation first and
/// hands it to [`Cache::set`], so a value computed before an invalidation can
/// never be written back after it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Current generation of `key`; 0 until the first remove.
    async fn generation(&self, key: &str) -> Result<u64, CacheError>;

    /// Store `value` only if `key` is still at `generation`. Returns whether
    /// the value was written.
    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
        generation: u64,
    ) -> Result<bool, CacheError>;

    /// Drop `key` and advance its generation.
    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}
