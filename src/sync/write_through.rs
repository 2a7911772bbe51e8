//! Mutation write-through
//!
//! After the store publishes a new list, the engine persists it to whichever
//! side owns the list right now: the guest blob when nobody is signed in,
//! the remote store otherwise. Remote writes are fire-and-forget. Guest
//! writes are coalesced so the last list published is the one left on disk.

use std::future::Future;
use std::sync::{Mutex as StdMutex, PoisonError};

use tokio::sync::Mutex;

use super::reconcile::{report_remote_error, ReconciliationEngine};
use crate::domain::{Item, ItemId, ItemList};
use crate::repository::LocalStore;

impl ReconciliationEngine {
    /// Persist a newly added item
    ///
    /// Remotely the item is inserted on its own; once the store id is known
    /// it replaces the local id and the whole list is written back so every
    /// position is current.
    pub fn after_add(&self, item: Item, list: ItemList) {
        let Some(session) = self.store.session() else {
            self.stage_local(list);
            return;
        };
        let remote = self.remote_for(session);
        let store = self.store.clone();
        self.spawn(async move {
            let local_id = item.id.clone();
            let inserted = match remote.insert_one(&item).await {
                Ok(inserted) => inserted,
                Err(e) => {
                    report_remote_error(&store, &remote, e);
                    return;
                }
            };

            let replaced = store.update_if(|state| {
                if state.owner() != Some(remote.owner()) || state.items.get(&local_id).is_none() {
                    return false;
                }
                state.items = state.items.clone().with_replaced_id(&local_id, &inserted.id);
                true
            });
            if !replaced {
                // Deleted while the insert was in flight: the new row is an orphan
                let orphaned = {
                    let state = store.snapshot();
                    state.owner() == Some(remote.owner()) && state.items.get(&inserted.id).is_none()
                };
                if orphaned {
                    log::debug!("Removing row {} deleted before its insert landed", inserted.id);
                    if let Err(e) = remote.delete_one(&inserted.id).await {
                        report_remote_error(&store, &remote, e);
                    }
                }
                return;
            }

            if let Err(e) = remote.upsert_many(&store.items()).await {
                report_remote_error(&store, &remote, e);
            }
        });
    }

    /// Persist a toggle, edit or reorder
    pub fn after_change(&self, list: ItemList) {
        let Some(session) = self.store.session() else {
            self.stage_local(list);
            return;
        };
        let remote = self.remote_for(session);
        let store = self.store.clone();
        self.spawn(async move {
            if let Err(e) = remote.upsert_many(&list).await {
                report_remote_error(&store, &remote, e);
            }
        });
    }

    /// Persist a delete, then the reindexed remainder
    pub fn after_delete(&self, id: ItemId, list: ItemList) {
        let Some(session) = self.store.session() else {
            self.stage_local(list);
            return;
        };
        let remote = self.remote_for(session);
        let store = self.store.clone();
        self.spawn(async move {
            if let Err(e) = remote.delete_one(&id).await {
                report_remote_error(&store, &remote, e);
                return;
            }
            if let Err(e) = remote.upsert_many(&list).await {
                report_remote_error(&store, &remote, e);
            }
        });
    }

    /// Await every pending write, local and remote
    pub async fn flush(&self) {
        loop {
            let mut pending = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
            if pending.is_empty() {
                break;
            }
            while let Some(result) = pending.join_next().await {
                if let Err(e) = result {
                    log::warn!("Write-through task failed: {}", e);
                }
            }
        }
        self.flush_local().await;
    }

    /// Write the staged guest list now, if any
    pub(super) async fn flush_local(&self) {
        write_staged(&self.staged, &self.local, &self.local_io).await;
    }

    /// Drop any staged guest list and remove the guest blob
    pub(super) async fn clear_local(&self) {
        let _io = self.local_io.lock().await;
        self.staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.local.clear().await;
    }

    /// Latest-wins: only one writer is scheduled per burst of changes
    fn stage_local(&self, list: ItemList) {
        let previous = self
            .staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(list);
        if previous.is_some() {
            // The scheduled writer has not run yet and will pick up this list
            return;
        }
        let staged = self.staged.clone();
        let local = self.local.clone();
        let io = self.local_io.clone();
        self.spawn(async move {
            write_staged(&staged, &local, &io).await;
        });
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while tasks.try_join_next().is_some() {}
        tasks.spawn_on(task, &self.runtime);
    }
}

async fn write_staged(staged: &StdMutex<Option<ItemList>>, local: &LocalStore, io: &Mutex<()>) {
    let _io = io.lock().await;
    let next = staged.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(list) = next {
        local.save(&list).await;
    }
}
