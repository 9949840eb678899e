//! Redis connection management
//!
//! Every Redis-backed adapter in the workspace shares one `ConnectionManager`,
//! which reconnects on its own after transient failures.

mod config;
mod connector;
mod health;

pub use config::RedisConfig;
pub use connector::{connect, connect_with_retry};
pub use health::check_health;

pub use redis::aio::ConnectionManager;
pub use redis::{AsyncCommands, RedisError, RedisResult};
