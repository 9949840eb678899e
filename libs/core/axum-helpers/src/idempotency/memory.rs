use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{IdempotencyError, IdempotencyRecord, IdempotencyStore, ReservationToken, SaveOutcome};

#[derive(Default)]
struct Slots {
    records: HashMap<String, (IdempotencyRecord, Instant)>,
    reservations: HashMap<String, (ReservationToken, Instant)>,
}

impl Slots {
    fn purge_expired(&mut self, now: Instant) {
        self.records.retain(|_, (_, deadline)| *deadline > now);
        self.reservations.retain(|_, (_, deadline)| *deadline > now);
    }

    fn held_by(&self, key: &str, token: &ReservationToken) -> bool {
        self.reservations
            .get(key)
            .is_some_and(|(holder, _)| holder == token)
    }
}

/// Process-local store for development and tests.
///
/// TTLs are honoured against `tokio::time::Instant`, so paused-clock tests can
/// advance past them.
#[derive(Clone, Default)]
pub struct InMemoryIdempotencyStore {
    slots: Arc<Mutex<Slots>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live completed records.
    pub async fn record_count(&self) -> usize {
        let mut slots = self.slots.lock().await;
        slots.purge_expired(Instant::now());
        slots.records.len()
    }

    /// Whether `key` is currently reserved.
    pub async fn is_reserved(&self, key: &str) -> bool {
        let mut slots = self.slots.lock().await;
        slots.purge_expired(Instant::now());
        slots.reservations.contains_key(key)
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn exists(&self, key: &str) -> Result<bool, IdempotencyError> {
        let mut slots = self.slots.lock().await;
        slots.purge_expired(Instant::now());
        Ok(slots.records.contains_key(key))
    }

    async fn get_response(&self, key: &str) -> Result<Option<IdempotencyRecord>, IdempotencyError> {
        let mut slots = self.slots.lock().await;
        slots.purge_expired(Instant::now());
        Ok(slots.records.get(key).map(|(record, _)| record.clone()))
    }

    async fn try_reserve(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<Option<ReservationToken>, IdempotencyError> {
        let now = Instant::now();
        let mut slots = self.slots.lock().await;
        slots.purge_expired(now);

        match slots.reservations.entry(key.to_string()) {
            Entry::Occupied(_) => Ok(None),
            Entry::Vacant(slot) => {
                let token = ReservationToken::generate();
                slot.insert((token.clone(), now + ttl));
                Ok(Some(token))
            }
        }
    }

    async fn extend(
        &self,
        key: &str,
        token: &ReservationToken,
        ttl: Duration,
    ) -> Result<bool, IdempotencyError> {
        let now = Instant::now();
        let mut slots = self.slots.lock().await;
        slots.purge_expired(now);

        match slots.reservations.get_mut(key) {
            Some((holder, deadline)) if holder == token => {
                *deadline = now + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn save(
        &self,
        record: &IdempotencyRecord,
        token: &ReservationToken,
        ttl: Duration,
    ) -> Result<SaveOutcome, IdempotencyError> {
        let now = Instant::now();
        let mut slots = self.slots.lock().await;
        slots.purge_expired(now);

        if slots.held_by(&record.key, token) {
            slots.reservations.remove(&record.key);
        }
        match slots.records.entry(record.key.clone()) {
            Entry::Occupied(existing) => Ok(SaveOutcome::Existing(existing.get().0.clone())),
            Entry::Vacant(slot) => {
                slot.insert((record.clone(), now + ttl));
                Ok(SaveOutcome::Stored)
            }
        }
    }

    async fn release(&self, key: &str, token: &ReservationToken) -> Result<(), IdempotencyError> {
        let mut slots = self.slots.lock().await;
        if slots.held_by(key, token) {
            slots.reservations.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, body: &str) -> IdempotencyRecord {
        IdempotencyRecord::new(key, 200, None, body.into(), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_reservation_is_exclusive() {
        let store = InMemoryIdempotencyStore::new();
        let ttl = Duration::from_secs(30);

        let token = store.try_reserve("k", ttl).await.unwrap().unwrap();
        assert!(store.try_reserve("k", ttl).await.unwrap().is_none());

        store.release("k", &token).await.unwrap();
        assert!(store.try_reserve("k", ttl).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_save_clears_reservation() {
        let store = InMemoryIdempotencyStore::new();
        let token = store
            .try_reserve("k", Duration::from_secs(30))
            .await
            .unwrap()
            .unwrap();

        let outcome = store
            .save(&record("k", "{}"), &token, Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(outcome, SaveOutcome::Stored);
        assert!(store.exists("k").await.unwrap());
        assert!(!store.is_reserved("k").await);
        let stored = store.get_response("k").await.unwrap().unwrap();
        assert_eq!(stored.key, "k");
        assert_eq!(stored.body, "{}");
    }

    #[tokio::test]
    async fn test_save_keeps_first_record() {
        let store = InMemoryIdempotencyStore::new();
        let ttl = Duration::from_secs(60);

        let first = ReservationToken::generate();
        store.save(&record("k", "first"), &first, ttl).await.unwrap();
        let second = ReservationToken::generate();
        let outcome = store.save(&record("k", "second"), &second, ttl).await.unwrap();

        let SaveOutcome::Existing(kept) = outcome else {
            panic!("second save overwrote the first record");
        };
        assert_eq!(kept.body, "first");
        assert_eq!(store.get_response("k").await.unwrap().unwrap().body, "first");
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_holder_cannot_release_newer_reservation() {
        let store = InMemoryIdempotencyStore::new();
        let ttl = Duration::from_secs(5);

        let stale = store.try_reserve("k", ttl).await.unwrap().unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        let current = store.try_reserve("k", ttl).await.unwrap().unwrap();

        store.release("k", &stale).await.unwrap();
        assert!(!store.extend("k", &stale, ttl).await.unwrap());
        assert!(store.is_reserved("k").await);

        store.release("k", &current).await.unwrap();
        assert!(!store.is_reserved("k").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extend_keeps_reservation_alive() {
        let store = InMemoryIdempotencyStore::new();
        let ttl = Duration::from_secs(5);
        let token = store.try_reserve("k", ttl).await.unwrap().unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(store.extend("k", &token, ttl).await.unwrap());
        tokio::time::advance(Duration::from_secs(4)).await;

        assert!(store.is_reserved("k").await);
        assert!(store.try_reserve("k", ttl).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_release_keeps_completed_record() {
        let store = InMemoryIdempotencyStore::new();
        let token = ReservationToken::generate();
        store
            .save(&record("k", "{}"), &token, Duration::from_secs(60))
            .await
            .unwrap();

        store.release("k", &token).await.unwrap();

        assert!(store.exists("k").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let store = InMemoryIdempotencyStore::new();
        store
            .save(
                &record("done", "{}"),
                &ReservationToken::generate(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();
        store
            .try_reserve("busy", Duration::from_secs(5))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(!store.is_reserved("busy").await);
        assert!(store.exists("done").await.unwrap());

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(!store.exists("done").await.unwrap());
        assert_eq!(store.record_count().await, 0);
    }
}
