//! Global Application State Store
//!
//! Single state container for everything the UI observes. Backed by a tokio
//! `watch` channel: every update publishes a whole new snapshot and wakes
//! subscribers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::domain::{Item, ItemFilter, ItemId, ItemList, OwnerId, Session};

/// Which authentication form is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthView {
    #[default]
    SignIn,
    SignUp,
    ForgotPassword,
    /// Reached from a password recovery link
    ResetPassword,
}

/// Global application state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppState {
    /// Current normalized list
    pub items: ItemList,
    /// `None` while in guest mode
    pub session: Option<Session>,
    /// A merge is running
    pub loading: bool,
    /// Last remote failure, shown to the user
    pub data_error: Option<String>,
    pub auth_view: AuthView,
    /// Item whose text is being edited inline
    pub editing: Option<ItemId>,
    /// Item being dragged
    pub dragging: Option<ItemId>,
    pub filter: ItemFilter,
}

impl AppState {
    pub fn owner(&self) -> Option<&OwnerId> {
        self.session.as_ref().map(|session| &session.owner_id)
    }

    pub fn visible_items(&self) -> Vec<Item> {
        self.items.filtered(self.filter)
    }
}

/// Cloneable handle to the state container
#[derive(Clone)]
pub struct AppStore {
    tx: Arc<watch::Sender<AppState>>,
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AppStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AppState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> AppState {
        self.tx.borrow().clone()
    }

    pub fn items(&self) -> ItemList {
        self.tx.borrow().items.clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.tx.borrow().session.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }

    /// Apply `f` and notify subscribers
    pub fn update<F: FnOnce(&mut AppState)>(&self, f: F) {
        self.tx.send_modify(f);
    }

    /// Apply `f`; subscribers are notified only when it returns true
    pub fn update_if<F: FnOnce(&mut AppState) -> bool>(&self, f: F) -> bool {
        self.tx.send_if_modified(f)
    }

    /// Compute the next list from the current one
    ///
    /// Returns the published list, or `None` (and no notification) when `f`
    /// left the list unchanged.
    pub fn mutate_items<F: FnOnce(ItemList) -> ItemList>(&self, f: F) -> Option<ItemList> {
        let mut published = None;
        self.tx.send_if_modified(|state| {
            let next = f(state.items.clone());
            if next == state.items {
                return false;
            }
            state.items = next.clone();
            published = Some(next);
            true
        });
        published
    }
}

// ========================
// Store Helper Functions
// ========================

pub fn store_clear_error(store: &AppStore) {
    store.update(|state| state.data_error = None);
}

/// Record an error only if `owner` is still the signed-in user
pub fn store_set_error_for(store: &AppStore, owner: &OwnerId, message: impl Into<String>) {
    let message = message.into();
    store.update_if(|state| {
        if state.owner() != Some(owner) {
            return false;
        }
        state.data_error = Some(message);
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, done: bool) -> Item {
        Item::new(ItemId::new(id), id, done, 0)
    }

    #[tokio::test]
    async fn test_update_notifies_subscribers() {
        let store = AppStore::new();
        let mut rx = store.subscribe();

        store.update(|state| state.loading = true);
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().loading);
    }

    #[test]
    fn test_unchanged_mutation_is_not_published() {
        let store = AppStore::new();
        let mut rx = store.subscribe();

        let published = store.mutate_items(|items| items.with_added(item("a", false)));
        assert!(published.is_some());
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        let unchanged = store.mutate_items(|items| items.with_toggled(&ItemId::new("missing")));
        assert!(unchanged.is_none());
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_scoped_error_ignores_stale_owner() {
        let store = AppStore::new();
        store.update(|state| state.session = Some(Session::new("t", OwnerId::new("bob"))));

        store_set_error_for(&store, &OwnerId::new("alice"), "late failure");
        assert_eq!(store.snapshot().data_error, None);

        store_set_error_for(&store, &OwnerId::new("bob"), "current failure");
        assert_eq!(store.snapshot().data_error.as_deref(), Some("current failure"));
    }

    #[test]
    fn test_visible_items_follow_filter() {
        let store = AppStore::new();
        store.mutate_items(|items| {
            items
                .with_added(item("a", false))
                .with_added(item("b", true))
        });
        store.update(|state| state.filter = ItemFilter::Completed);

        let visible = store.snapshot().visible_items();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, ItemId::new("b"));
    }
}
