//! Item Entity
//!
//! Represents a single task with its rank in the ordered list.

use serde::{Deserialize, Deserializer, Serialize};

use super::{DomainError, DomainResult};

const LOCAL_PREFIX: &str = "local-";

/// Item identifier
///
/// Either generated locally (`local-<uuid>`) or assigned by the remote store.
/// Remote stores may hand out numeric ids, so deserialization accepts both
/// JSON strings and numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh identifier for an item that has not been persisted remotely
    pub fn generate_local() -> Self {
        Self(format!("{}{}", LOCAL_PREFIX, uuid::Uuid::new_v4()))
    }

    /// True until the remote store assigns a real id
    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => ItemId(text),
            RawId::Number(n) => ItemId(n.to_string()),
        })
    }
}

/// Trim user text; `None` when nothing is left
pub fn normalize_content(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// A task item
///
/// Serialized with camelCase keys, which is also the guest blob format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Unique identifier, immutable once assigned
    pub id: ItemId,
    /// Trimmed, non-empty text
    pub content: String,
    /// Completion status
    #[serde(default)]
    pub is_completed: bool,
    /// Dense zero-based rank in the full list
    #[serde(default)]
    pub position: usize,
}

impl Item {
    pub fn new(id: ItemId, content: impl Into<String>, is_completed: bool, position: usize) -> Self {
        Self {
            id,
            content: content.into(),
            is_completed,
            position,
        }
    }

    /// Build a new incomplete item with a local id from raw user text
    pub fn draft(raw: &str) -> DomainResult<Self> {
        let content = normalize_content(raw)
            .ok_or_else(|| DomainError::InvalidInput("Task text cannot be empty".to_string()))?;
        Ok(Self::new(ItemId::generate_local(), content, false, 0))
    }
}
