use axum_helpers::IdempotencyConfig;
use core_config::{AppInfo, ConfigError, FromEnv, app_info, env_or_default, server::ServerConfig};
use database::redis::RedisConfig;
use domain_lending::{EventStreamConfig, LendingConfig};
use std::fmt;
use std::str::FromStr;

// Re-export Environment for use in other modules
pub use core_config::Environment;

/// Where items, the list cache, idempotency records and events live.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Redis,
    /// Process-local maps; state is lost on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(StorageBackend::Redis),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::ParseError {
                key: "STORAGE_BACKEND".to_string(),
                details: format!("expected `redis` or `memory`, got `{}`", other),
            }),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Redis => f.write_str("redis"),
            StorageBackend::Memory => f.write_str("memory"),
        }
    }
}

/// Application-specific configuration
/// Composes shared config components from the `config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub storage: StorageBackend,
    /// Present only with the Redis backend
    pub redis: Option<RedisConfig>,
    pub lending: LendingConfig,
    pub events: EventStreamConfig,
    pub idempotency: IdempotencyConfig,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?; // Uses defaults: HOST=0.0.0.0, PORT=8080
        let storage: StorageBackend = env_or_default("STORAGE_BACKEND", "redis").parse()?;
        let redis = match storage {
            StorageBackend::Redis => Some(RedisConfig::from_env()?), // Required for this backend
            StorageBackend::Memory => None,
        };

        Ok(Self {
            app: app_info!(),
            environment,
            server,
            storage,
            redis,
            lending: LendingConfig::from_env()?,
            events: EventStreamConfig::from_env()?,
            idempotency: IdempotencyConfig::from_env()?,
        })
    }
}
