//! API routes composition.
//!
//! Domain routers are wired to the adapters of the active storage backend
//! and nested under their resource paths; `create_router` mounts the result
//! under `/api`.

use crate::state::AppState;
use axum::{Router, routing::get};
use axum_helpers::{
    IdempotencyLayer, IdempotencyStore, InMemoryIdempotencyStore, RedisIdempotencyStore,
};
use domain_lending::{
    InMemoryCache, InMemoryItemRepository, LendingService, RecordingEventSink, RedisCache,
    RedisItemRepository, RedisStreamEventSink, handlers,
};
use std::sync::Arc;

pub mod health;

/// Build all API routes for the application.
pub fn routes(state: &AppState) -> Router {
    let config = &state.config;

    let items = match &state.redis {
        Some(redis) => {
            let service = LendingService::new(
                RedisItemRepository::new(redis.clone()),
                RedisCache::new(redis.clone()),
                RedisStreamEventSink::new(redis.clone(), config.events.clone()),
                config.lending.clone(),
            );
            let store: Arc<dyn IdempotencyStore> =
                Arc::new(RedisIdempotencyStore::new(redis.clone()));
            handlers::router(
                service,
                IdempotencyLayer::new(store, config.idempotency.clone()),
            )
        }
        None => {
            let service = LendingService::new(
                InMemoryItemRepository::new(),
                InMemoryCache::new(),
                RecordingEventSink::new(),
                config.lending.clone(),
            );
            let store: Arc<dyn IdempotencyStore> = Arc::new(InMemoryIdempotencyStore::new());
            handlers::router(
                service,
                IdempotencyLayer::new(store, config.idempotency.clone()),
            )
        }
    };

    Router::new().nest("/items", items)
}

/// Readiness route, merged next to `/health` outside `/api`.
pub fn ready_router(state: AppState) -> Router {
    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Environment, StorageBackend};
    use crate::openapi::ApiDoc;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum_helpers::{IdempotencyConfig, TRACE_ID_HEADER, create_router, health_router};
    use core_config::{app_info, server::ServerConfig};
    use domain_lending::{EventStreamConfig, LendingConfig};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn memory_state() -> AppState {
        AppState {
            config: Config {
                app: app_info!(),
                environment: Environment::Development,
                server: ServerConfig::default(),
                storage: StorageBackend::Memory,
                redis: None,
                lending: LendingConfig::default(),
                events: EventStreamConfig::default(),
                idempotency: IdempotencyConfig::default(),
            },
            redis: None,
        }
    }

    fn app() -> Router {
        let state = memory_state();
        create_router::<ApiDoc>(routes(&state))
            .merge(health_router(state.config.app))
            .merge(ready_router(state))
    }

    async fn json_body(body: Body) -> Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_add_and_list_through_api_prefix() {
        let app = app();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/items")
                    .header("content-type", "application/json")
                    .header("idempotency-key", "api-add-1")
                    .header("x-request-id", "req-42")
                    .body(Body::from(
                        json!({
                            "title": "Piranesi",
                            "author": "Susanna Clarke",
                            "identifier": "9781-6355-7563"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[TRACE_ID_HEADER], "req-42");
        let body = json_body(response.into_body()).await;
        assert_eq!(body["traceId"], "req-42");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/items")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["data"][0]["title"], "Piranesi");
        assert_eq!(body["data"][0]["identifier"], "978163557563");
    }

    #[tokio::test]
    async fn test_ready_with_memory_backend() {
        let response = app()
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn test_health_reports_app_name() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["name"], "lending_api");
    }

    #[tokio::test]
    async fn test_unknown_route_is_enveloped_404() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/unknown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["success"], false);
    }

    #[test]
    fn test_openapi_documents_item_paths() {
        use utoipa::OpenApi;

        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/items"));
        assert!(doc.paths.paths.contains_key("/items/{id}/checkout"));
        assert!(doc.paths.paths.contains_key("/items/{id}/return"));
    }
}
