/// Storage-level failures surfaced by the connectors in this crate.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Connection could not be established, even after retrying
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Configuration error: {0}")]
    Config(#[from] core_config::ConfigError),
}

/// Result type alias for storage operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;
