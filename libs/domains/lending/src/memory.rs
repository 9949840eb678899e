//! Process-local adapters for the development backend and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use crate::cache::{Cache, CacheError};
use crate::error::{LendingError, LendingResult};
use crate::events::{DomainEvent, EventFailure, EventSink, PublishError};
use crate::models::Item;
use crate::repository::ItemRepository;

#[derive(Clone, Default)]
pub struct InMemoryItemRepository {
    items: Arc<RwLock<HashMap<Uuid, Item>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryItemRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with a store error until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    fn check_available(&self) -> LendingResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LendingError::Store("in-memory repository unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ItemRepository for InMemoryItemRepository {
    async fn get(&self, id: Uuid) -> LendingResult<Option<Item>> {
        self.check_available()?;
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn list(&self) -> LendingResult<Vec<Item>> {
        self.check_available()?;
        Ok(self.items.read().await.values().cloned().collect())
    }

    async fn save(&self, item: &Item) -> LendingResult<()> {
        self.check_available()?;
        self.items.write().await.insert(item.id, item.clone());
        Ok(())
    }
}

#[derive(Default)]
struct CacheSlots {
    entries: HashMap<String, (Vec<u8>, Instant)>,
    generations: HashMap<String, u64>,
}

#[derive(Clone, Default)]
pub struct InMemoryCache {
    slots: Arc<RwLock<CacheSlots>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Whether `key` holds a live entry.
    pub async fn contains(&self, key: &str) -> bool {
        self.slots
            .read()
            .await
            .entries
            .get(key)
            .is_some_and(|(_, deadline)| *deadline > Instant::now())
    }

    fn check_available(&self) -> Result<(), CacheError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("in-memory cache unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.check_available()?;
        let slots = self.slots.read().await;
        Ok(slots
            .entries
            .get(key)
            .filter(|(_, deadline)| *deadline > Instant::now())
            .map(|(value, _)| value.clone()))
    }

    async fn generation(&self, key: &str) -> Result<u64, CacheError> {
        self.check_available()?;
        Ok(self
            .slots
            .read()
            .await
            .generations
            .get(key)
            .copied()
            .unwrap_or(0))
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
        generation: u64,
    ) -> Result<bool, CacheError> {
        self.check_available()?;
        let mut slots = self.slots.write().await;
        if slots.generations.get(key).copied().unwrap_or(0) != generation {
            return Ok(false);
        }
        slots
            .entries
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(true)
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.check_available()?;
        let mut slots = self.slots.write().await;
        slots.entries.remove(key);
        *slots.generations.entry(key.to_string()).or_default() += 1;
        Ok(())
    }
}

/// Event sink that keeps everything it is handed.
#[derive(Clone, Default)]
pub struct RecordingEventSink {
    published: Arc<RwLock<Vec<DomainEvent>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every event until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn published(&self) -> Vec<DomainEvent> {
        self.published.read().await.clone()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn publish(&self, events: &[DomainEvent]) -> Result<(), PublishError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::Partial {
                delivered: 0,
                failures: events
                    .iter()
                    .map(|event| EventFailure {
                        event_type: event.event_type().to_string(),
                        item_id: event.item_id(),
                        reason: "sink rejected event".to_string(),
                    })
                    .collect(),
            });
        }

        for event in events {
            tracing::info!(
                event_type = event.event_type(),
                item_id = %event.item_id(),
                message = %event.message(),
                "Domain event"
            );
        }
        self.published.write().await.extend_from_slice(events);
        Ok(())
    }
}
