use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use super::RedisConfig;
use crate::common::{DatabaseError, RetryConfig, retry_with_backoff};

/// Open a `ConnectionManager` and verify it with `PING`.
pub async fn connect(url: &str) -> redis::RedisResult<ConnectionManager> {
    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;

    let mut conn = manager.clone();
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    info!("Connected to Redis");
    Ok(manager)
}

/// Connect with exponential backoff, using `config.connect_retries` as the
/// retry budget on top of `retry`'s delays.
///
/// ```ignore
/// let conn = connect_with_retry(&RedisConfig::from_env()?, RetryConfig::new()).await?;
/// ```
pub async fn connect_with_retry(
    config: &RedisConfig,
    retry: RetryConfig,
) -> Result<ConnectionManager, DatabaseError> {
    let retry = retry.with_max_retries(config.connect_retries);

    retry_with_backoff(|| connect(config.url()), retry)
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))
}
