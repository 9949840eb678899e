//! Storage connectivity shared by the lending services.
//!
//! # Features
//!
//! - `redis` (default) - Redis connection management and health checks
//!
//! # Example
//!
//! ```ignore
//! use database::common::RetryConfig;
//! use database::redis::{RedisConfig, connect_with_retry};
//! use core_config::FromEnv;
//!
//! let config = RedisConfig::from_env()?;
//! let conn = connect_with_retry(&config, RetryConfig::new().with_max_retries(5)).await?;
//! ```

pub mod common;

#[cfg(feature = "redis")]
pub mod redis;

pub use common::{DatabaseError, DatabaseResult};
