//! Repository Layer - Core Traits
//!
//! Abstract interfaces for the two kinds of storage the app talks to.
//! Implementations can use SQLite, in-memory, HTTP, etc.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainResult, Item, ItemId, OwnerId, Session};

/// Key-value blob storage for the guest list
///
/// Mirrors browser-style local storage: one string value per key.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> DomainResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> DomainResult<()>;

    async fn remove(&self, key: &str) -> DomainResult<()>;
}

/// A row in the remote items table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRow {
    pub id: ItemId,
    pub content: String,
    #[serde(default)]
    pub is_completed: bool,
    /// Rows written before positions existed carry none
    #[serde(default)]
    pub position: Option<i64>,
    /// Never sent on writes so the store keeps its own timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub user_id: OwnerId,
}

impl ItemRow {
    pub fn from_item(item: &Item, owner: &OwnerId) -> Self {
        Self {
            id: item.id.clone(),
            content: item.content.clone(),
            is_completed: item.is_completed,
            position: Some(item.position as i64),
            created_at: None,
            user_id: owner.clone(),
        }
    }

    pub fn into_item(self) -> Item {
        let position = self.position.unwrap_or_default().max(0) as usize;
        Item::new(self.id, self.content, self.is_completed, position)
    }
}

/// A row about to be inserted; the store assigns `id` and `created_at`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItemRow {
    pub content: String,
    pub is_completed: bool,
    pub position: i64,
    pub user_id: OwnerId,
}

/// Row-oriented remote backend
///
/// Every call is scoped by the session: reads filter on the owner and
/// writes are stamped with it, so colliding ids never leak across users.
#[async_trait]
pub trait RowBackend: Send + Sync {
    /// All rows of the owner, by position (unset last), then creation time
    async fn select_ordered(&self, session: &Session) -> DomainResult<Vec<ItemRow>>;

    async fn insert_one(&self, session: &Session, row: NewItemRow) -> DomainResult<ItemRow>;

    async fn insert_many(&self, session: &Session, rows: Vec<NewItemRow>) -> DomainResult<()>;

    /// Idempotent full-row write keyed by id
    async fn upsert_many(&self, session: &Session, rows: Vec<ItemRow>) -> DomainResult<()>;

    async fn delete_one(&self, session: &Session, id: &ItemId) -> DomainResult<()>;
}
