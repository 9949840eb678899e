use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

use super::{IdempotencyError, IdempotencyRecord, IdempotencyStore, ReservationToken, SaveOutcome};

pub const DEFAULT_KEY_PREFIX: &str = "idempotency";

/// Writes the record only if absent and drops the lock only if the token
/// still owns it. Replies with the surviving record when one already existed.
const SAVE_SCRIPT: &str = r"
    local stored = redis.call('set', KEYS[1], ARGV[1], 'NX', 'EX', ARGV[2])
    if redis.call('get', KEYS[2]) == ARGV[3] then
        redis.call('del', KEYS[2])
    end
    if stored then
        return false
    end
    return redis.call('get', KEYS[1])
";

const RELEASE_SCRIPT: &str = r"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        return redis.call('del', KEYS[1])
    else
        return 0
    end
";

const EXTEND_SCRIPT: &str = r"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        return redis.call('pexpire', KEYS[1], ARGV[2])
    else
        return 0
    end
";

/// Redis-backed idempotency store.
///
/// Completed responses live at `{prefix}:{key}` as JSON with a TTL; the
/// in-flight reservation lives at `{prefix}:{key}:lock`, holds the owner's
/// token and is claimed with `SET NX PX`.
#[derive(Clone)]
pub struct RedisIdempotencyStore {
    redis: ConnectionManager,
    prefix: String,
}

impl RedisIdempotencyStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self::with_prefix(redis, DEFAULT_KEY_PREFIX)
    }

    pub fn with_prefix(redis: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            redis,
            prefix: prefix.into(),
        }
    }

    fn record_key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    fn lock_key(&self, key: &str) -> String {
        format!("{}:{}:lock", self.prefix, key)
    }
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl IdempotencyStore for RedisIdempotencyStore {
    async fn exists(&self, key: &str) -> Result<bool, IdempotencyError> {
        let mut conn = self.redis.clone();
        let found: bool = conn.exists(self.record_key(key)).await?;
        Ok(found)
    }

    async fn get_response(&self, key: &str) -> Result<Option<IdempotencyRecord>, IdempotencyError> {
        let mut conn = self.redis.clone();
        let raw: Option<String> = conn.get(self.record_key(key)).await?;

        raw.map(|raw| IdempotencyRecord::from_json(key, &raw))
            .transpose()
    }

    async fn try_reserve(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<ReservationToken>, IdempotencyError> {
        let mut conn = self.redis.clone();
        let token = ReservationToken::generate();

        // Nil reply means another request already holds the lock.
        let reply: Option<String> = redis::cmd("SET")
            .arg(self.lock_key(key))
            .arg(token.as_str())
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await?;

        Ok(reply.map(|_| token))
    }

    async fn extend(
        &self,
        key: &str,
        token: &ReservationToken,
        ttl: Duration,
    ) -> Result<bool, IdempotencyError> {
        let mut conn = self.redis.clone();
        let extended: i32 = redis::Script::new(EXTEND_SCRIPT)
            .key(self.lock_key(key))
            .arg(token.as_str())
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await?;
        Ok(extended == 1)
    }

    async fn save(
        &self,
        record: &IdempotencyRecord,
        token: &ReservationToken,
        ttl: Duration,
    ) -> Result<SaveOutcome, IdempotencyError> {
        let mut conn = self.redis.clone();
        let payload = record.to_json()?;

        let existing: Option<String> = redis::Script::new(SAVE_SCRIPT)
            .key(self.record_key(&record.key))
            .key(self.lock_key(&record.key))
            .arg(payload)
            .arg(ttl_secs(ttl))
            .arg(token.as_str())
            .invoke_async(&mut conn)
            .await?;

        match existing {
            None => Ok(SaveOutcome::Stored),
            Some(raw) => Ok(SaveOutcome::Existing(IdempotencyRecord::from_json(
                &record.key,
                &raw,
            )?)),
        }
    }

    async fn release(&self, key: &str, token: &ReservationToken) -> Result<(), IdempotencyError> {
        let mut conn = self.redis.clone();
        let _released: i32 = redis::Script::new(RELEASE_SCRIPT)
            .key(self.lock_key(key))
            .arg(token.as_str())
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }
}
