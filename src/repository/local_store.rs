//! Guest List Store
//!
//! Persists the guest item list as one JSON blob. Local persistence is
//! advisory: every failure degrades to "nothing stored" and is only logged.

use std::sync::Arc;

use super::traits::BlobStore;
use crate::domain::{Item, ItemList};

/// Default blob key for the guest list
pub const GUEST_ITEMS_KEY: &str = "tasklist.guest-items";

pub struct LocalStore {
    blobs: Arc<dyn BlobStore>,
    key: String,
}

impl LocalStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self::with_key(blobs, GUEST_ITEMS_KEY)
    }

    pub fn with_key(blobs: Arc<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self {
            blobs,
            key: key.into(),
        }
    }

    /// Read the guest list; missing, unreadable or malformed data is an empty list
    ///
    /// Positions are returned as stored; callers reindex.
    pub async fn load(&self) -> Vec<Item> {
        let raw = match self.blobs.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::warn!("Guest list unreadable, starting empty: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Item>>(&raw) {
            Ok(items) => items,
            Err(e) => {
                log::warn!("Guest list malformed, starting empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Best-effort write of the full list
    pub async fn save(&self, list: &ItemList) {
        let json = match serde_json::to_string(list) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Guest list not serializable: {}", e);
                return;
            }
        };
        if let Err(e) = self.blobs.set(&self.key, &json).await {
            log::warn!("Guest list save failed: {}", e);
        }
    }

    /// Remove the blob; safe when already empty or storage is gone
    pub async fn clear(&self) {
        if let Err(e) = self.blobs.remove(&self.key).await {
            log::warn!("Guest list clear failed: {}", e);
        }
    }
}
