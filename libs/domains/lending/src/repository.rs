use async_trait::async_trait;
use uuid::Uuid;

use crate::error::LendingResult;
use crate::models::Item;

/// Durable item storage, strongly consistent per item id.
///
/// Backend failures surface as [`crate::LendingError::Store`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Get an item by ID
    async fn get(&self, id: Uuid) -> LendingResult<Option<Item>>;

    /// Every item, in no particular order
    async fn list(&self) -> LendingResult<Vec<Item>>;

    /// Insert or replace an item
    async fn save(&self, item: &Item) -> LendingResult<()>;
}
