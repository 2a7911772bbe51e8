//! Item Commands
//!
//! Handlers behind the list UI. Each structural mutation publishes the next
//! list synchronously and then hands it to the engine for write-through.

use std::sync::Arc;

use crate::domain::{normalize_content, DomainError, DomainResult, Item, ItemFilter, ItemId, ItemList};
use crate::store::{store_clear_error, AppStore};
use crate::sync::ReconciliationEngine;

#[derive(Clone)]
pub struct ItemCommands {
    store: AppStore,
    engine: Arc<ReconciliationEngine>,
}

fn not_found(id: &ItemId) -> DomainError {
    DomainError::NotFound(format!("item {}", id))
}

/// A running merge replaces the whole list when it lands
fn ensure_not_loading(store: &AppStore) -> DomainResult<()> {
    if store.snapshot().loading {
        return Err(DomainError::InvalidInput("Items are still loading".to_string()));
    }
    Ok(())
}

impl ItemCommands {
    pub fn new(store: AppStore, engine: Arc<ReconciliationEngine>) -> Self {
        Self { store, engine }
    }

    /// Create an item from the new-item form
    pub fn submit_draft(&self, text: &str) -> DomainResult<Item> {
        let draft = Item::draft(text)?;
        ensure_not_loading(&self.store)?;
        let mut list = ItemList::new();
        self.store.update(|state| {
            state.items = state.items.clone().with_added(draft.clone());
            list = state.items.clone();
        });
        // Position assigned by the list
        let item = list.get(&draft.id).cloned().unwrap_or(draft);
        log::debug!("Added item {}", item.id);
        self.engine.after_add(item.clone(), list);
        Ok(item)
    }

    pub fn toggle_item(&self, id: &ItemId) -> DomainResult<()> {
        ensure_not_loading(&self.store)?;
        let list = self
            .store
            .mutate_items(|items| items.with_toggled(id))
            .ok_or_else(|| not_found(id))?;
        self.engine.after_change(list);
        Ok(())
    }

    /// Commit an inline edit
    ///
    /// Blank text is rejected and the edit stays open.
    pub fn edit_item(&self, id: &ItemId, text: &str) -> DomainResult<()> {
        let content = normalize_content(text)
            .ok_or_else(|| DomainError::InvalidInput("Task text cannot be empty".to_string()))?;
        ensure_not_loading(&self.store)?;
        let current = self.store.items();
        let existing = current.get(id).ok_or_else(|| not_found(id))?;

        let changed = existing.content != content;
        self.store.update(|state| {
            if state.editing.as_ref() == Some(id) {
                state.editing = None;
            }
        });
        if !changed {
            return Ok(());
        }
        if let Some(list) = self.store.mutate_items(|items| items.with_edited(id, &content)) {
            self.engine.after_change(list);
        }
        Ok(())
    }

    pub fn delete_item(&self, id: &ItemId) -> DomainResult<()> {
        ensure_not_loading(&self.store)?;
        let list = self
            .store
            .mutate_items(|items| items.without(id))
            .ok_or_else(|| not_found(id))?;
        self.store.update_if(|state| {
            if state.editing.as_ref() != Some(id) {
                return false;
            }
            state.editing = None;
            true
        });
        log::debug!("Deleted item {}", id);
        self.engine.after_delete(id.clone(), list);
        Ok(())
    }

    /// Enter inline edit mode; ignored while a drag is in progress
    pub fn begin_edit(&self, id: &ItemId) -> DomainResult<()> {
        if self.store.items().get(id).is_none() {
            return Err(not_found(id));
        }
        self.store.update_if(|state| {
            if state.dragging.is_some() {
                return false;
            }
            state.editing = Some(id.clone());
            true
        });
        Ok(())
    }

    pub fn cancel_edit(&self) {
        self.store.update_if(|state| state.editing.take().is_some());
    }

    pub fn set_filter(&self, filter: ItemFilter) {
        self.store.update_if(|state| {
            if state.filter == filter {
                return false;
            }
            state.filter = filter;
            true
        });
    }

    pub fn visible_items(&self) -> Vec<Item> {
        self.store.snapshot().visible_items()
    }

    /// Incomplete items left
    pub fn remaining_count(&self) -> usize {
        self.store.items().active_count()
    }

    pub fn clear_error(&self) {
        store_clear_error(&self.store);
    }
}
