//! Application state management.
//!
//! The state carries the configuration and, with the Redis backend, the
//! shared connection manager every adapter clones from.

use database::redis::ConnectionManager;

/// Shared application state.
///
/// Cloned per handler; `ConnectionManager` clones share one multiplexed connection.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded from environment variables
    pub config: crate::config::Config,
    /// Redis connection manager, `None` with the in-memory backend
    pub redis: Option<ConnectionManager>,
}
