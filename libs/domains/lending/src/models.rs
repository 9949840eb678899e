use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use strum::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{LendingError, LendingResult};
use crate::identifier::Identifier;

/// Lending status of an item
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    Default,
    ToSchema,
)]
pub enum ItemStatus {
    /// On the shelf
    #[default]
    Available,
    /// Lent to a borrower
    CheckedOut,
}

/// Item entity as persisted by the repository.
///
/// `checked_out_at` and `checked_out_by` are set exactly when `status` is
/// [`ItemStatus::CheckedOut`]; the transition methods keep them in step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Item {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub identifier: Identifier,
    pub status: ItemStatus,
    pub checked_out_at: Option<DateTime<Utc>>,
    pub checked_out_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// A new available item. Title and author are stored trimmed.
    pub fn new(title: &str, author: &str, identifier: Identifier) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            title: title.trim().to_string(),
            author: author.trim().to_string(),
            identifier,
            status: ItemStatus::Available,
            checked_out_at: None,
            checked_out_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Available → CheckedOut. Leaves the item untouched on failure.
    pub fn check_out(&mut self, borrower: &str, at: DateTime<Utc>) -> LendingResult<()> {
        if self.status != ItemStatus::Available {
            return Err(LendingError::InvalidState(
                "Item already checked out".to_string(),
            ));
        }

        self.status = ItemStatus::CheckedOut;
        self.checked_out_at = Some(at);
        self.checked_out_by = Some(borrower.to_string());
        self.updated_at = at;
        Ok(())
    }

    /// CheckedOut → Available, returning who had the item.
    pub fn mark_returned(&mut self, at: DateTime<Utc>) -> LendingResult<String> {
        if self.status != ItemStatus::CheckedOut {
            return Err(LendingError::InvalidState(
                "Item not available for return".to_string(),
            ));
        }

        let borrower = self.checked_out_by.take().unwrap_or_default();
        self.status = ItemStatus::Available;
        self.checked_out_at = None;
        self.updated_at = at;
        Ok(borrower)
    }

    pub fn summary(&self) -> ItemSummary {
        ItemSummary {
            id: self.id,
            title: self.title.clone(),
            author: self.author.clone(),
            identifier: self.identifier.to_string(),
            status: self.status,
        }
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message(Cow::Borrowed("must not be blank")));
    }
    Ok(())
}

/// Request body for adding an item
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AddItem {
    #[validate(custom(function = "not_blank"))]
    #[schema(example = "The Pragmatic Programmer")]
    pub title: String,
    #[validate(custom(function = "not_blank"))]
    #[schema(example = "Andrew Hunt")]
    pub author: String,
    /// Raw identifier; separators and whitespace are stripped before validation
    #[serde(alias = "isbn")]
    #[schema(example = "9780-2016-1622")]
    pub identifier: String,
}

/// Projection returned by list and transition endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ItemSummary {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub identifier: String,
    pub status: ItemStatus,
}

/// Payload of a successful add
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AddedItem {
    pub id: Uuid,
}

pub const CACHED_LIST_VERSION: u32 = 1;

/// What the list query writes to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedItemList {
    pub version: u32,
    pub items: Vec<ItemSummary>,
}

impl CachedItemList {
    pub fn new(items: Vec<ItemSummary>) -> Self {
        Self {
            version: CACHED_LIST_VERSION,
            items,
        }
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// `None` for undecodable bytes or a different version.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice::<Self>(bytes)
            .ok()
            .filter(|list| list.version == CACHED_LIST_VERSION)
    }
}
