use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::store::IdempotencyError;

/// Bumped whenever the stored layout changes; older records are treated as corrupt.
pub const RECORD_SCHEMA_VERSION: u32 = 1;

/// The response captured from the first successful execution of a request.
///
/// The body is kept as the exact UTF-8 text the handler produced so a replay is
/// byte-identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub schema_version: u32,
    pub key: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl IdempotencyRecord {
    pub fn new(
        key: impl Into<String>,
        status: u16,
        content_type: Option<String>,
        body: String,
        ttl: Duration,
    ) -> Self {
        let created_at = Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| created_at.checked_add_signed(ttl));

        Self {
            schema_version: RECORD_SCHEMA_VERSION,
            key: key.into(),
            status,
            content_type,
            body,
            created_at,
            expires_at,
        }
    }

    pub fn to_json(&self) -> Result<String, IdempotencyError> {
        serde_json::to_string(self).map_err(|e| IdempotencyError::Corrupt {
            key: self.key.clone(),
            details: e.to_string(),
        })
    }

    /// Decode a stored record, rejecting unknown schema versions.
    pub fn from_json(key: &str, raw: &str) -> Result<Self, IdempotencyError> {
        let record: Self = serde_json::from_str(raw).map_err(|e| IdempotencyError::Corrupt {
            key: key.to_string(),
            details: e.to_string(),
        })?;

        if record.schema_version != RECORD_SCHEMA_VERSION {
            return Err(IdempotencyError::Corrupt {
                key: key.to_string(),
                details: format!("unsupported schema version {}", record.schema_version),
            });
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> IdempotencyRecord {
        IdempotencyRecord::new(
            "key-1",
            201,
            Some("application/json".into()),
            r#"{"success":true}"#.into(),
            Duration::from_secs(60),
        )
    }

    #[test]
    fn test_new_record_sets_expiry_from_ttl() {
        let record = record();
        let expires_at = record.expires_at.unwrap();
        assert_eq!((expires_at - record.created_at).num_seconds(), 60);
    }

    #[test]
    fn test_json_preserves_body_verbatim() {
        let original = record();
        let decoded = IdempotencyRecord::from_json("key-1", &original.to_json().unwrap()).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.body, r#"{"success":true}"#);
    }

    #[test]
    fn test_unknown_schema_version_is_corrupt() {
        let mut stale = record();
        stale.schema_version = 99;
        let raw = serde_json::to_string(&stale).unwrap();

        let err = IdempotencyRecord::from_json("key-1", &raw).unwrap_err();
        assert!(err.to_string().contains("schema version 99"));
    }

    #[test]
    fn test_garbage_is_corrupt() {
        assert!(matches!(
            IdempotencyRecord::from_json("key-1", "not json"),
            Err(IdempotencyError::Corrupt { .. })
        ));
    }
}
