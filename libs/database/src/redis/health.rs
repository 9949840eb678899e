use redis::aio::ConnectionManager;
use tracing::debug;

use crate::common::DatabaseError;

/// `PING` the server; used by the `/ready` check.
pub async fn check_health(conn: &mut ConnectionManager) -> Result<(), DatabaseError> {
    let response: String = redis::cmd("PING")
        .query_async(conn)
        .await
        .map_err(|e| DatabaseError::HealthCheckFailed(e.to_string()))?;

    if response != "PONG" {
        return Err(DatabaseError::HealthCheckFailed(format!(
            "unexpected PING response: {response}"
        )));
    }

    debug!("Redis health check passed");
    Ok(())
}
