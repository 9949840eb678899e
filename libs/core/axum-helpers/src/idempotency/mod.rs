//! Request-level idempotency for mutating endpoints.
//!
//! [`idempotency_guard`] is an axum middleware backed by an
//! [`IdempotencyStore`]. Two stores ship here: [`RedisIdempotencyStore`] for
//! deployments and [`InMemoryIdempotencyStore`] for development and tests.

pub mod guard;
pub mod memory;
pub mod record;
pub mod redis_store;
pub mod store;

pub use guard::{
    IDEMPOTENCY_KEY_HEADER, IDEMPOTENCY_REPLAY_HEADER, IdempotencyConfig, IdempotencyLayer,
    MAX_KEY_LENGTH, idempotency_guard,
};
pub use memory::InMemoryIdempotencyStore;
pub use record::{IdempotencyRecord, RECORD_SCHEMA_VERSION};
pub use redis_store::RedisIdempotencyStore;
pub use store::{IdempotencyError, IdempotencyStore, ReservationToken, SaveOutcome};
