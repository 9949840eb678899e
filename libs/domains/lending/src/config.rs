use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or};
use std::time::Duration;

pub const DEFAULT_CACHE_KEY: &str = "lending:items:all";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Knobs of the list read path.
#[derive(Debug, Clone)]
pub struct LendingConfig {
    /// Cache key of the "all items" list
    pub cache_key: String,
    pub cache_ttl: Duration,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl FromEnv for LendingConfig {
    /// - `LENDING_CACHE_KEY`: defaults to `lending:items:all`
    /// - `LENDING_CACHE_TTL_SECS`: defaults to 300
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cache_key: env_or_default("LENDING_CACHE_KEY", DEFAULT_CACHE_KEY),
            cache_ttl: Duration::from_secs(env_parse_or(
                "LENDING_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL.as_secs(),
            )?),
        })
    }
}

/// Settings of the Redis stream events are appended to.
#[derive(Debug, Clone)]
pub struct EventStreamConfig {
    pub stream: String,
    /// Approximate cap passed as `MAXLEN ~`
    pub max_len: usize,
}

impl Default for EventStreamConfig {
    fn default() -> Self {
        Self {
            stream: "lending:events".to_string(),
            max_len: 10_000,
        }
    }
}

impl FromEnv for EventStreamConfig {
    /// - `LENDING_EVENT_STREAM`: defaults to `lending:events`
    /// - `LENDING_EVENT_STREAM_MAXLEN`: defaults to 10000
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            stream: env_or_default("LENDING_EVENT_STREAM", &defaults.stream),
            max_len: env_parse_or("LENDING_EVENT_STREAM_MAXLEN", defaults.max_len)?,
        })
    }
}
