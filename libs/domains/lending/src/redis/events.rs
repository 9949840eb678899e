use async_trait::async_trait;
use database::common::{RetryConfig, retry_with_backoff};
use redis::aio::ConnectionManager;

use crate::config::EventStreamConfig;
use crate::events::{DomainEvent, EventFailure, EventSink, PublishError};

/// Appends each event to a Redis stream as one entry.
///
/// Entry fields: `event_type`, `message`, `payload` (the JSON event), then
/// every attribute. Each event is retried on its own with backoff and jitter;
/// one failing event does not stop the rest of the batch.
#[derive(Clone)]
pub struct RedisStreamEventSink {
    redis: ConnectionManager,
    config: EventStreamConfig,
    retry: RetryConfig,
}

impl RedisStreamEventSink {
    pub fn new(redis: ConnectionManager, config: EventStreamConfig) -> Self {
        Self {
            redis,
            config,
            retry: RetryConfig::request_path(),
        }
    }

    async fn append(&self, event: &DomainEvent) -> Result<String, String> {
        let payload = serde_json::to_string(event).map_err(|e| e.to_string())?;
        let mut fields = vec![
            ("event_type".to_string(), event.event_type().to_string()),
            ("message".to_string(), event.message()),
            ("payload".to_string(), payload),
        ];
        fields.extend(event.attributes());

        retry_with_backoff(
            || {
                let mut conn = self.redis.clone();
                let mut cmd = redis::cmd("XADD");
                cmd.arg(&self.config.stream)
                    .arg("MAXLEN")
                    .arg("~")
                    .arg(self.config.max_len)
                    .arg("*");
                for (field, value) in &fields {
                    cmd.arg(field).arg(value);
                }
                async move { cmd.query_async::<String>(&mut conn).await }
            },
            self.retry.clone(),
        )
        .await
        .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl EventSink for RedisStreamEventSink {
    async fn publish(&self, events: &[DomainEvent]) -> Result<(), PublishError> {
        let mut delivered = 0;
        let mut failures = Vec::new();

        for event in events {
            match self.append(event).await {
                Ok(entry_id) => {
                    tracing::debug!(
                        stream = %self.config.stream,
                        entry_id = %entry_id,
                        event_type = event.event_type(),
                        "Event appended"
                    );
                    delivered += 1;
                }
                Err(reason) => failures.push(EventFailure {
                    event_type: event.event_type().to_string(),
                    item_id: event.item_id(),
                    reason,
                }),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PublishError::Partial {
                delivered,
                failures,
            })
        }
    }
}
