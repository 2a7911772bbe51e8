//! Remote Item Store
//!
//! Owner-scoped adapter over a [`RowBackend`]. Converts between domain items
//! and rows and stamps every write with the session's owner.

use std::sync::Arc;

use super::traits::{ItemRow, NewItemRow, RowBackend};
use crate::domain::{DomainResult, Item, ItemId, ItemList, OwnerId, Session};

/// Content of a row to bulk-insert during a merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDraft {
    pub content: String,
    pub is_completed: bool,
    pub position: usize,
}

#[derive(Clone)]
pub struct RemoteStore {
    backend: Arc<dyn RowBackend>,
    session: Session,
}

impl RemoteStore {
    pub fn new(backend: Arc<dyn RowBackend>, session: Session) -> Self {
        Self { backend, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn owner(&self) -> &OwnerId {
        &self.session.owner_id
    }

    /// Owner's items in stored order; positions are as stored, not normalized
    pub async fn fetch_ordered(&self) -> DomainResult<Vec<Item>> {
        let rows = self.backend.select_ordered(&self.session).await?;
        Ok(rows
            .into_iter()
            .filter(|row| &row.user_id == self.owner())
            .map(ItemRow::into_item)
            .collect())
    }

    /// Create one row; the returned item carries the store-assigned id
    pub async fn insert_one(&self, item: &Item) -> DomainResult<Item> {
        let row = NewItemRow {
            content: item.content.clone(),
            is_completed: item.is_completed,
            position: item.position as i64,
            user_id: self.owner().clone(),
        };
        let inserted = self.backend.insert_one(&self.session, row).await?;
        Ok(inserted.into_item())
    }

    pub async fn insert_many(&self, drafts: Vec<RowDraft>) -> DomainResult<()> {
        let rows = drafts
            .into_iter()
            .map(|draft| NewItemRow {
                content: draft.content,
                is_completed: draft.is_completed,
                position: draft.position as i64,
                user_id: self.owner().clone(),
            })
            .collect();
        self.backend.insert_many(&self.session, rows).await
    }

    /// Overwrite the owner's rows with the full list
    ///
    /// Items still carrying a local id have an insert in flight and are skipped.
    pub async fn upsert_many(&self, list: &ItemList) -> DomainResult<()> {
        let rows: Vec<ItemRow> = list
            .iter()
            .filter(|item| !item.id.is_local())
            .map(|item| ItemRow::from_item(item, self.owner()))
            .collect();
        if rows.is_empty() {
            return Ok(());
        }
        self.backend.upsert_many(&self.session, rows).await
    }

    pub async fn delete_one(&self, id: &ItemId) -> DomainResult<()> {
        if id.is_local() {
            // Never reached the store
            return Ok(());
        }
        self.backend.delete_one(&self.session, id).await
    }
}
