//! Lending Domain
//!
//! A small lending catalog: items are added, checked out and returned through
//! idempotent commands, and listed through a cache-aside query.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints behind the Idempotency-Key guard
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Validate, transition, persist, publish, invalidate
//! └──────┬──────┘
//!        │
//! ┌──────▼──────────────────────────────┐
//! │ ItemRepository │ Cache │ EventSink  │  ← Traits with Redis and in-memory adapters
//! └──────┬──────────────────────────────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Item, Identifier, DomainEvent, DTOs
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum_helpers::{IdempotencyConfig, IdempotencyLayer, InMemoryIdempotencyStore};
//! use domain_lending::{
//!     InMemoryCache, InMemoryItemRepository, LendingConfig, LendingService, RecordingEventSink,
//!     handlers,
//! };
//! use std::sync::Arc;
//!
//! let service = LendingService::new(
//!     InMemoryItemRepository::new(),
//!     InMemoryCache::new(),
//!     RecordingEventSink::new(),
//!     LendingConfig::default(),
//! );
//! let guard = IdempotencyLayer::new(
//!     Arc::new(InMemoryIdempotencyStore::new()),
//!     IdempotencyConfig::default(),
//! );
//!
//! let router = handlers::router(service, guard);
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod identifier;
pub mod memory;
pub mod models;
pub mod redis;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use cache::{Cache, CacheError};
pub use config::{EventStreamConfig, LendingConfig};
pub use error::{LendingError, LendingResult};
pub use events::{DomainEvent, EventFailure, EventSink, PublishError};
pub use handlers::ApiDoc;
pub use identifier::{Identifier, IdentifierError};
pub use memory::{InMemoryCache, InMemoryItemRepository, RecordingEventSink};
pub use models::{AddItem, AddedItem, Item, ItemStatus, ItemSummary};
pub use redis::{RedisCache, RedisItemRepository, RedisStreamEventSink};
pub use repository::ItemRepository;
pub use service::LendingService;
