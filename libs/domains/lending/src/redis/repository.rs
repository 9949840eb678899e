use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use uuid::Uuid;

use crate::error::{LendingError, LendingResult};
use crate::models::Item;
use crate::repository::ItemRepository;

pub const ITEMS_HASH_KEY: &str = "lending:items";

/// Items stored as JSON values of a single Redis hash keyed by item id.
#[derive(Clone)]
pub struct RedisItemRepository {
    redis: ConnectionManager,
    hash_key: String,
}

impl RedisItemRepository {
    pub fn new(redis: ConnectionManager) -> Self {
        Self::with_hash_key(redis, ITEMS_HASH_KEY)
    }

    pub fn with_hash_key(redis: ConnectionManager, hash_key: impl Into<String>) -> Self {
        Self {
            redis,
            hash_key: hash_key.into(),
        }
    }
}

fn decode(raw: &str) -> LendingResult<Item> {
    serde_json::from_str(raw)
        .map_err(|e| LendingError::Internal(format!("Corrupt item record: {}", e)))
}

#[async_trait]
impl ItemRepository for RedisItemRepository {
    async fn get(&self, id: Uuid) -> LendingResult<Option<Item>> {
        let mut conn = self.redis.clone();
        let raw: Option<String> = conn.hget(&self.hash_key, id.to_string()).await?;
        raw.as_deref().map(decode).transpose()
    }

    async fn list(&self) -> LendingResult<Vec<Item>> {
        let mut conn = self.redis.clone();
        let values: Vec<String> = conn.hvals(&self.hash_key).await?;
        values.iter().map(|raw| decode(raw)).collect()
    }

    async fn save(&self, item: &Item) -> LendingResult<()> {
        let mut conn = self.redis.clone();
        let value = serde_json::to_string(item)
            .map_err(|e| LendingError::Internal(format!("Failed to serialize item: {}", e)))?;

        conn.hset::<_, _, _, ()>(&self.hash_key, item.id.to_string(), value)
            .await?;
        Ok(())
    }
}
