//! Domain events published after a successful state change.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::AsRefStr;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Item;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(tag = "type")]
pub enum DomainEvent {
    ItemAdded {
        item_id: Uuid,
        title: String,
        author: String,
        identifier: String,
        added_at: DateTime<Utc>,
    },
    ItemCheckedOut {
        item_id: Uuid,
        checked_out_by: String,
        checked_out_at: DateTime<Utc>,
    },
    ItemReturned {
        item_id: Uuid,
        returned_by: String,
        returned_at: DateTime<Utc>,
    },
}

fn long_date(at: &DateTime<Utc>) -> String {
    at.format("%B %d, %Y").to_string()
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl DomainEvent {
    pub fn item_added(item: &Item) -> Self {
        Self::ItemAdded {
            item_id: item.id,
            title: item.title.clone(),
            author: item.author.clone(),
            identifier: item.identifier.to_string(),
            added_at: item.created_at,
        }
    }

    pub fn item_id(&self) -> Uuid {
        match self {
            Self::ItemAdded { item_id, .. }
            | Self::ItemCheckedOut { item_id, .. }
            | Self::ItemReturned { item_id, .. } => *item_id,
        }
    }

    /// Variant name, used as the message type tag downstream.
    pub fn event_type(&self) -> &str {
        self.as_ref()
    }

    pub fn message(&self) -> String {
        match self {
            Self::ItemAdded {
                title,
                author,
                identifier,
                added_at,
                ..
            } => format!(
                "A new item '{title}' by {author} (identifier: {identifier}) was added to the catalog at {}.",
                long_date(added_at)
            ),
            Self::ItemCheckedOut {
                item_id,
                checked_out_by,
                checked_out_at,
            } => format!(
                "{checked_out_by} checked out item with ID {item_id} on {}.",
                long_date(checked_out_at)
            ),
            Self::ItemReturned {
                item_id,
                returned_by,
                returned_at,
            } => format!(
                "{returned_by} returned item with ID {item_id} on {}.",
                long_date(returned_at)
            ),
        }
    }

    /// Flat string attributes attached to the outbound message.
    pub fn attributes(&self) -> BTreeMap<String, String> {
        let mut attrs = BTreeMap::new();
        attrs.insert("ItemId".to_string(), self.item_id().to_string());

        match self {
            Self::ItemAdded {
                title,
                author,
                identifier,
                ..
            } => {
                attrs.insert("Title".to_string(), title.clone());
                attrs.insert("Author".to_string(), author.clone());
                attrs.insert("Identifier".to_string(), identifier.clone());
            }
            Self::ItemCheckedOut {
                checked_out_by,
                checked_out_at,
                ..
            } => {
                attrs.insert("CheckedOutBy".to_string(), checked_out_by.clone());
                attrs.insert("CheckedOutAt".to_string(), timestamp(checked_out_at));
            }
            Self::ItemReturned {
                returned_by,
                returned_at,
                ..
            } => {
                attrs.insert("ReturnedBy".to_string(), returned_by.clone());
                attrs.insert("ReturnedAt".to_string(), timestamp(returned_at));
            }
        }
        attrs
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFailure {
    pub event_type: String,
    pub item_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("{} event(s) failed to publish, {delivered} delivered", .failures.len())]
    Partial {
        delivered: usize,
        failures: Vec<EventFailure>,
    },

    #[error("Event sink unavailable: {0}")]
    Unavailable(String),
}

/// Outbound event channel. Every event in the batch is attempted even when an
/// earlier one fails; failures are reported per event.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, events: &[DomainEvent]) -> Result<(), PublishError>;
}
