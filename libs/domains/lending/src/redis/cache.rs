use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

use crate::cache::{Cache, CacheError};

/// Writes the value only while the generation counter still matches.
const SET_IF_GENERATION_SCRIPT: &str = r"
    local current = tonumber(redis.call('get', KEYS[2]) or '0')
    if current == tonumber(ARGV[3]) then
        redis.call('set', KEYS[1], ARGV[1], 'EX', ARGV[2])
        return 1
    end
    return 0
";

/// Cache entries live at the given key; the generation counter lives next to
/// it at `{key}:generation` and is advanced with `INCR`.
#[derive(Clone)]
pub struct RedisCache {
    redis: ConnectionManager,
}

impl RedisCache {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

fn generation_key(key: &str) -> String {
    format!("{key}:generation")
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.redis.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn generation(&self, key: &str) -> Result<u64, CacheError> {
        let mut conn = self.redis.clone();
        let generation: Option<u64> = conn.get(generation_key(key)).await?;
        Ok(generation.unwrap_or(0))
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
        generation: u64,
    ) -> Result<bool, CacheError> {
        let mut conn = self.redis.clone();
        let written: i32 = redis::Script::new(SET_IF_GENERATION_SCRIPT)
            .key(key)
            .key(generation_key(key))
            .arg(value)
            .arg(ttl.as_secs().max(1))
            .arg(generation)
            .invoke_async(&mut conn)
            .await?;
        Ok(written == 1)
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.redis.clone();
        redis::pipe()
            .atomic()
            .del(key)
            .ignore()
            .incr(generation_key(key), 1)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }
}
