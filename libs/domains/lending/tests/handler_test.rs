//! Handler tests for the Lending domain
//!
//! These tests drive the items router with in-memory adapters:
//! - Request deserialization and validation
//! - Envelope shape and HTTP status codes
//! - State transitions through checkout and return
//! - Degraded cache and event sink behaviour

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum_helpers::{IdempotencyConfig, IdempotencyLayer, InMemoryIdempotencyStore};
use domain_lending::*;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use test_utils::{TestDataBuilder, assertions::*};
use tower::ServiceExt; // For oneshot()

struct Harness {
    repository: InMemoryItemRepository,
    cache: InMemoryCache,
    events: RecordingEventSink,
    app: Router,
}

fn harness() -> Harness {
    let repository = InMemoryItemRepository::new();
    let cache = InMemoryCache::new();
    let events = RecordingEventSink::new();
    let service = LendingService::new(
        repository.clone(),
        cache.clone(),
        events.clone(),
        LendingConfig::default(),
    );
    let guard = IdempotencyLayer::new(
        Arc::new(InMemoryIdempotencyStore::new()),
        IdempotencyConfig::default(),
    );

    Harness {
        repository,
        cache,
        events,
        app: handlers::router(service, guard),
    }
}

// Helper to parse JSON response body
async fn json_body(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str, key: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("idempotency-key", key)
        .header("content-type", "application/json");

    match body {
        Some(body) => builder
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn get_items() -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .unwrap()
}

async fn add(app: &Router, builder: &TestDataBuilder, suffix: &str) -> String {
    let request = post(
        "/",
        &builder.key(&format!("add-{suffix}")),
        Some(json!({
            "title": builder.title(suffix),
            "author": "Ursula K. Le Guin",
            "identifier": builder.identifier()
        })),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response.into_body()).await;
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_add_item_returns_201_envelope() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("handler_add_201");

    let request = post(
        "/",
        &builder.key("add"),
        Some(json!({
            "title": "The Dispossessed",
            "author": "Ursula K. Le Guin",
            "identifier": "9780-0610-5488"
        })),
    );
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "New item added successfully");
    assert!(body["traceId"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(body.get("errors").is_none());
    let id = assert_some(
        body["data"]["id"]
            .as_str()
            .and_then(|id| uuid::Uuid::parse_str(id).ok()),
        "added item id",
    );

    assert_eq!(h.repository.len().await, 1);
    let stored = assert_some(h.repository.get(id).await.unwrap(), "added item is stored");
    assert_uuid_eq(stored.id, id, "stored item id");
    let events = h.events.published().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type(), "ItemAdded");
}

#[tokio::test]
async fn test_add_item_accepts_isbn_alias() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("handler_isbn_alias");

    let request = post(
        "/",
        &builder.key("add"),
        Some(json!({
            "title": "Kindred",
            "author": "Octavia E. Butler",
            "isbn": "978080708369"
        })),
    );
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_add_item_validates_input() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("handler_validate");

    let request = post(
        "/",
        &builder.key("add"),
        Some(json!({
            "title": "",
            "author": "   ",
            "identifier": builder.identifier()
        })),
    );
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["success"], false);
    assert!(!body["errors"].as_array().unwrap().is_empty());
    assert!(body.get("data").is_none());
    assert!(h.repository.is_empty().await);
    assert!(h.events.published().await.is_empty());
}

#[tokio::test]
async fn test_add_item_rejects_bad_identifier() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("handler_bad_identifier");

    let request = post(
        "/",
        &builder.key("add"),
        Some(json!({
            "title": "Parable of the Sower",
            "author": "Octavia E. Butler",
            "identifier": "12345"
        })),
    );
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response.into_body()).await;
    let errors = body["errors"].as_array().unwrap();
    assert!(
        errors
            .iter()
            .any(|e| e.as_str().unwrap().contains("expected 12 digits, got 5"))
    );
    assert!(h.repository.is_empty().await);
}

#[tokio::test]
async fn test_mutations_require_idempotency_key() {
    let h = harness();

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "title": "A", "author": "B", "identifier": "123456789012" }).to_string(),
        ))
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["success"], false);
    assert!(h.repository.is_empty().await);
}

#[tokio::test]
async fn test_list_items_after_add() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("handler_list");

    let first = add(&h.app, &builder, "first").await;
    let second = add(&h.app, &builder, "second").await;

    let response = h.app.clone().oneshot(get_items()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response.into_body()).await;
    assert_eq!(body["message"], "Items retrieved successfully");
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], first.as_str());
    assert_eq!(items[1]["id"], second.as_str());
    assert_eq!(items[0]["status"], "Available");
    assert!(h.cache.contains(&LendingConfig::default().cache_key).await);
}

#[tokio::test]
async fn test_list_items_empty_catalog() {
    let h = harness();

    let response = h.app.oneshot(get_items()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_checkout_then_return() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("handler_checkout_return");
    let id = add(&h.app, &builder, "loan").await;

    let mut request = post(&format!("/{id}/checkout"), &builder.key("checkout"), None);
    request
        .headers_mut()
        .insert("x-borrower", "river".parse().unwrap());
    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["message"], "Item checked out successfully");
    assert_eq!(body["data"]["status"], "CheckedOut");

    let response = h
        .app
        .clone()
        .oneshot(post(&format!("/{id}/return"), &builder.key("return"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["message"], "Item returned successfully");
    assert_eq!(body["data"]["status"], "Available");

    let events = h.events.published().await;
    let types: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
    assert_eq!(types, vec!["ItemAdded", "ItemCheckedOut", "ItemReturned"]);
    match &events[2] {
        DomainEvent::ItemReturned { returned_by, .. } => assert_eq!(returned_by, "river"),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_checkout_defaults_to_anonymous_borrower() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("handler_anonymous");
    let id = add(&h.app, &builder, "anon").await;

    let response = h
        .app
        .clone()
        .oneshot(post(&format!("/{id}/checkout"), &builder.key("checkout"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let item = h
        .repository
        .get(id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.checked_out_by.as_deref(), Some("anonymous"));
}

#[tokio::test]
async fn test_double_checkout_conflicts() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("handler_double_checkout");
    let id = add(&h.app, &builder, "popular").await;

    let first = h
        .app
        .clone()
        .oneshot(post(&format!("/{id}/checkout"), &builder.key("first"), None))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = h
        .app
        .clone()
        .oneshot(post(&format!("/{id}/checkout"), &builder.key("second"), None))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body = json_body(second.into_body()).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_return_available_item_conflicts() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("handler_return_available");
    let id = add(&h.app, &builder, "shelf").await;

    let response = h
        .app
        .oneshot(post(&format!("/{id}/return"), &builder.key("return"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_item_returns_404() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("handler_not_found");
    let id = builder.uuid();

    let response = h
        .app
        .oneshot(post(&format!("/{id}/checkout"), &builder.key("checkout"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["errors"][0], format!("Item {id} not found"));
}

#[tokio::test]
async fn test_malformed_item_id_returns_400() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("handler_bad_uuid");

    let response = h
        .app
        .oneshot(post("/not-a-uuid/return", &builder.key("return"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_store_outage_returns_503() {
    let h = harness();
    h.repository.set_unavailable(true);

    let response = h.app.oneshot(get_items()).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_cache_outage_still_lists_and_mutates() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("handler_cache_outage");
    h.cache.set_unavailable(true);

    let id = add(&h.app, &builder, "degraded").await;

    let response = h.app.clone().oneshot(get_items()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["data"][0]["id"], id.as_str());
}

#[tokio::test]
async fn test_publication_failure_does_not_fail_command() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("handler_publish_failure");
    h.events.set_failing(true);

    add(&h.app, &builder, "quiet").await;

    assert_eq!(h.repository.len().await, 1);
    assert!(h.events.published().await.is_empty());
}

#[tokio::test]
async fn test_mutation_invalidates_cached_list() {
    let h = harness();
    let builder = TestDataBuilder::from_test_name("handler_invalidate");
    let cache_key = LendingConfig::default().cache_key;

    let id = add(&h.app, &builder, "cached").await;
    h.app.clone().oneshot(get_items()).await.unwrap();
    assert!(h.cache.contains(&cache_key).await);

    h.app
        .clone()
        .oneshot(post(&format!("/{id}/checkout"), &builder.key("checkout"), None))
        .await
        .unwrap();
    assert!(!h.cache.contains(&cache_key).await);

    let response = h.app.oneshot(get_items()).await.unwrap();
    let body = json_body(response.into_body()).await;
    assert_eq!(body["data"][0]["status"], "CheckedOut");
}
