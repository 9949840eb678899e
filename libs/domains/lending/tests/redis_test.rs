//! Integration tests for the Redis adapters
//!
//! These tests use real Redis via testcontainers to ensure:
//! - Items round-trip through the hash with their state transitions
//! - The list cache is populated and invalidated by commands
//! - Events land on the stream, one entry per event

use domain_lending::*;
use ::redis::AsyncCommands;
use std::time::Duration;
use test_utils::{TestDataBuilder, TestRedis, assertions::*};

fn service(
    redis: &TestRedis,
    builder: &TestDataBuilder,
) -> (
    LendingService<RedisItemRepository, RedisCache, RedisStreamEventSink>,
    LendingConfig,
    EventStreamConfig,
) {
    let conn = redis.connection();
    let config = LendingConfig {
        cache_key: builder.key("items:all"),
        ..LendingConfig::default()
    };
    let stream = EventStreamConfig {
        stream: builder.key("events"),
        ..EventStreamConfig::default()
    };

    let service = LendingService::new(
        RedisItemRepository::with_hash_key(conn.clone(), builder.key("items")),
        RedisCache::new(conn.clone()),
        RedisStreamEventSink::new(conn, stream.clone()),
        config.clone(),
    );
    (service, config, stream)
}

async fn stream_len(redis: &TestRedis, stream: &str) -> usize {
    let mut conn = redis.connection();
    ::redis::cmd("XLEN")
        .arg(stream)
        .query_async(&mut conn)
        .await
        .unwrap()
}

fn add_item(builder: &TestDataBuilder, suffix: &str) -> AddItem {
    AddItem {
        title: builder.title(suffix),
        author: "Ted Chiang".to_string(),
        identifier: builder.identifier(),
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_repository_round_trip() {
    let redis = TestRedis::new().await;
    let builder = TestDataBuilder::from_test_name("redis_round_trip");
    let repo = RedisItemRepository::with_hash_key(redis.connection(), builder.key("items"));

    let mut item = Item::new(
        "Exhalation",
        "Ted Chiang",
        Identifier::parse(&builder.identifier()).unwrap(),
    );
    repo.save(&item).await.unwrap();

    item.check_out("jo", chrono::Utc::now()).unwrap();
    repo.save(&item).await.unwrap();

    let stored = assert_some(repo.get(item.id).await.unwrap(), "item should exist");
    assert_uuid_eq(stored.id, item.id, "stored item id");
    assert_eq!(stored.status, ItemStatus::CheckedOut);
    assert_eq!(stored.checked_out_by.as_deref(), Some("jo"));
    assert_eq!(repo.list().await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_unknown_item_is_none() {
    let redis = TestRedis::new().await;
    let builder = TestDataBuilder::from_test_name("redis_unknown_item");
    let repo = RedisItemRepository::with_hash_key(redis.connection(), builder.key("items"));

    assert!(repo.get(builder.uuid()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_cache_set_get_remove() {
    let redis = TestRedis::new().await;
    let builder = TestDataBuilder::from_test_name("redis_cache");
    let cache = RedisCache::new(redis.connection());
    let key = builder.key("cache");

    let generation = cache.generation(&key).await.unwrap();
    assert!(
        cache
            .set(&key, b"[]".to_vec(), Duration::from_secs(60), generation)
            .await
            .unwrap()
    );
    assert_eq!(cache.get(&key).await.unwrap(), Some(b"[]".to_vec()));

    let mut conn = redis.connection();
    let ttl: i64 = conn.ttl(&key).await.unwrap();
    assert!(ttl > 0 && ttl <= 60);

    cache.remove(&key).await.unwrap();
    assert_eq!(cache.get(&key).await.unwrap(), None);
    assert_eq!(cache.generation(&key).await.unwrap(), generation + 1);

    // A value loaded before the remove is not written back.
    assert!(
        !cache
            .set(&key, b"[]".to_vec(), Duration::from_secs(60), generation)
            .await
            .unwrap()
    );
    assert_eq!(cache.get(&key).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_commands_publish_to_stream_and_invalidate_cache() {
    let redis = TestRedis::new().await;
    let builder = TestDataBuilder::from_test_name("redis_pipeline");
    let (service, config, stream) = service(&redis, &builder);
    let mut conn = redis.connection();

    let added = service.add_item(add_item(&builder, "story")).await.unwrap();
    assert_eq!(stream_len(&redis, &stream.stream).await, 1);

    let listed = service.list_items().await.unwrap();
    assert_eq!(listed.len(), 1);
    let cached: bool = conn.exists(&config.cache_key).await.unwrap();
    assert!(cached);

    service.check_out_item(added.id, "lee").await.unwrap();
    let cached: bool = conn.exists(&config.cache_key).await.unwrap();
    assert!(!cached);

    let returned = service.return_item(added.id).await.unwrap();
    assert_eq!(returned.status, ItemStatus::Available);
    assert_eq!(stream_len(&redis, &stream.stream).await, 3);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_list_items_is_ordered_by_creation() {
    let redis = TestRedis::new().await;
    let builder = TestDataBuilder::from_test_name("redis_ordering");
    let (service, _, _) = service(&redis, &builder);

    let mut ids = Vec::new();
    for suffix in ["a", "b", "c"] {
        ids.push(service.add_item(add_item(&builder, suffix)).await.unwrap().id);
    }

    let listed: Vec<_> = service
        .list_items()
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(listed, ids);
}
