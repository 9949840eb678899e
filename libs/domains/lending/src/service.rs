//! Lending Service - command and query handlers
//!
//! Every command follows the same order: validate, transition, persist,
//! publish, invalidate the list cache. Only persistence failures fail the
//! command; publication and cache failures are logged.

use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::cache::Cache;
use crate::config::LendingConfig;
use crate::error::{LendingError, LendingResult};
use crate::events::{DomainEvent, EventSink, PublishError};
use crate::identifier::Identifier;
use crate::models::{AddItem, AddedItem, CachedItemList, Item, ItemSummary};
use crate::repository::ItemRepository;

pub struct LendingService<R, C, E>
where
    R: ItemRepository,
    C: Cache,
    E: EventSink,
{
    repository: Arc<R>,
    cache: Arc<C>,
    events: Arc<E>,
    config: LendingConfig,
}

impl<R, C, E> LendingService<R, C, E>
where
    R: ItemRepository,
    C: Cache,
    E: EventSink,
{
    pub fn new(repository: R, cache: C, events: E, config: LendingConfig) -> Self {
        Self {
            repository: Arc::new(repository),
            cache: Arc::new(cache),
            events: Arc::new(events),
            config,
        }
    }

    /// Add a new item to the catalog
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn add_item(&self, input: AddItem) -> LendingResult<AddedItem> {
        input.validate()?;
        let identifier = Identifier::parse(&input.identifier)?;

        let item = Item::new(&input.title, &input.author, identifier);
        self.repository.save(&item).await?;
        tracing::info!(item_id = %item.id, "Item added");

        self.publish(DomainEvent::item_added(&item)).await;
        self.invalidate_list().await;

        Ok(AddedItem { id: item.id })
    }

    /// Lend an available item to `borrower`
    #[instrument(skip(self), fields(item_id = %id))]
    pub async fn check_out_item(&self, id: Uuid, borrower: &str) -> LendingResult<ItemSummary> {
        let mut item = self.get_item(id).await?;

        let at = Utc::now();
        item.check_out(borrower, at)?;
        self.repository.save(&item).await?;
        tracing::info!(borrower, "Item checked out");

        self.publish(DomainEvent::ItemCheckedOut {
            item_id: item.id,
            checked_out_by: borrower.to_string(),
            checked_out_at: at,
        })
        .await;
        self.invalidate_list().await;

        Ok(item.summary())
    }

    /// Put a checked-out item back on the shelf
    #[instrument(skip(self), fields(item_id = %id))]
    pub async fn return_item(&self, id: Uuid) -> LendingResult<ItemSummary> {
        let mut item = self.get_item(id).await?;

        let at = Utc::now();
        let borrower = item.mark_returned(at)?;
        self.repository.save(&item).await?;
        tracing::info!(borrower = %borrower, "Item returned");

        self.publish(DomainEvent::ItemReturned {
            item_id: item.id,
            returned_by: borrower,
            returned_at: at,
        })
        .await;
        self.invalidate_list().await;

        Ok(item.summary())
    }

    /// All items, served from the cache when possible.
    ///
    /// On a miss the cache generation is read before the repository, so a
    /// command that invalidates in between makes the write-back a no-op.
    #[instrument(skip(self))]
    pub async fn list_items(&self) -> LendingResult<Vec<ItemSummary>> {
        if let Some(cached) = self.cached_list().await {
            tracing::debug!(count = cached.len(), "List served from cache");
            return Ok(cached);
        }

        let generation = self.list_generation().await;
        let mut items = self.repository.list().await?;
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let summaries: Vec<ItemSummary> = items.iter().map(Item::summary).collect();

        if let Some(generation) = generation {
            self.store_list(&summaries, generation).await;
        }
        Ok(summaries)
    }

    async fn get_item(&self, id: Uuid) -> LendingResult<Item> {
        self.repository
            .get(id)
            .await?
            .ok_or(LendingError::NotFound(id))
    }

    async fn publish(&self, event: DomainEvent) {
        let event_type = event.event_type().to_string();
        let item_id = event.item_id();

        match self.events.publish(std::slice::from_ref(&event)).await {
            Ok(()) => tracing::debug!(event_type = %event_type, %item_id, "Event published"),
            Err(PublishError::Partial { delivered, failures }) => {
                for failure in &failures {
                    tracing::error!(
                        event_type = %failure.event_type,
                        item_id = %failure.item_id,
                        reason = %failure.reason,
                        "Event publication failed"
                    );
                }
                tracing::error!(delivered, failed = failures.len(), "Event batch partially published");
            }
            Err(e) => tracing::error!(event_type = %event_type, %item_id, error = %e, "Event publication failed"),
        }
    }

    async fn invalidate_list(&self) {
        if let Err(e) = self.cache.remove(&self.config.cache_key).await {
            tracing::warn!(key = %self.config.cache_key, error = %e, "Failed to invalidate list cache");
        }
    }

    async fn cached_list(&self) -> Option<Vec<ItemSummary>> {
        let key = &self.config.cache_key;
        match self.cache.get(key).await {
            Ok(Some(bytes)) => match CachedItemList::decode(&bytes) {
                Some(list) => Some(list.items),
                None => {
                    tracing::warn!(%key, "Discarding undecodable cached list");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(%key, error = %e, "Cache read failed, falling back to repository");
                None
            }
        }
    }

    async fn list_generation(&self) -> Option<u64> {
        let key = &self.config.cache_key;
        match self.cache.generation(key).await {
            Ok(generation) => Some(generation),
            Err(e) => {
                tracing::warn!(%key, error = %e, "Cache generation unreadable, skipping write-back");
                None
            }
        }
    }

    async fn store_list(&self, items: &[ItemSummary], generation: u64) {
        let key = &self.config.cache_key;
        let bytes = match CachedItemList::new(items.to_vec()).encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%key, error = %e, "Failed to encode list for cache");
                return;
            }
        };

        match self
            .cache
            .set(key, bytes, self.config.cache_ttl, generation)
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::debug!(%key, "List invalidated while loading, not cached"),
            Err(e) => tracing::warn!(%key, error = %e, "Cache write failed"),
        }
    }
}

impl<R, C, E> Clone for LendingService<R, C, E>
where
    R: ItemRepository,
    C: Cache,
    E: EventSink,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            cache: Arc::clone(&self.cache),
            events: Arc::clone(&self.events),
            config: self.config.clone(),
        }
    }
}
