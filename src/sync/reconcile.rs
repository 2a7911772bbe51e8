//! Guest-to-account merge
//!
//! Runs once per sign-in. Guest items are appended after the user's existing
//! remote items, the guest blob is cleared once they are committed, and the
//! canonical list is written back. Every network round trip is followed by a
//! cancellation check so a superseded merge never touches the state.

use std::sync::{Arc, Mutex as StdMutex};

use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use super::cancel::MergeToken;
use crate::domain::{DomainError, ItemList, Session};
use crate::repository::{LocalStore, RemoteStore, RowBackend, RowDraft};
use crate::store::{store_set_error_for, AppStore};

/// How a merge ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No guest items; the remote list was adopted as-is
    Adopted { total: usize },
    /// Guest items were inserted and the merged list adopted
    Merged { inserted: usize, total: usize },
    /// Remote list could not be read; nothing was inserted
    FetchFailed,
    /// Insert failed; remote list adopted, guest blob kept
    InsertFailed,
    /// Insert succeeded but the re-read failed; pre-merge remote list adopted
    RefetchFailed { inserted: usize },
    /// A newer session transition took over
    Cancelled,
}

/// Merge on sign-in, plus write-through of every later mutation
pub struct ReconciliationEngine {
    pub(super) store: AppStore,
    pub(super) local: Arc<LocalStore>,
    pub(super) backend: Arc<dyn RowBackend>,
    pub(super) runtime: Handle,
    pub(super) tasks: StdMutex<JoinSet<()>>,
    /// Latest guest list waiting to be written
    pub(super) staged: Arc<StdMutex<Option<ItemList>>>,
    /// Serializes guest blob I/O
    pub(super) local_io: Arc<Mutex<()>>,
}

impl ReconciliationEngine {
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(store: AppStore, local: Arc<LocalStore>, backend: Arc<dyn RowBackend>) -> Self {
        Self {
            store,
            local,
            backend,
            runtime: Handle::current(),
            tasks: StdMutex::new(JoinSet::new()),
            staged: Arc::new(StdMutex::new(None)),
            local_io: Arc::new(Mutex::new(())),
        }
    }

    pub fn remote_for(&self, session: Session) -> RemoteStore {
        RemoteStore::new(self.backend.clone(), session)
    }

    /// Guest list from local storage, reindexed
    pub async fn load_guest(&self) -> ItemList {
        self.flush_local().await;
        ItemList::from_items(self.local.load().await).reindex()
    }

    /// Merge the guest list into the remote list of `session`'s owner
    pub async fn merge_on_sign_in(&self, session: Session, token: MergeToken) -> MergeOutcome {
        let guest = self.load_guest().await;

        let started = self.store.update_if(|state| {
            if token.is_cancelled() {
                return false;
            }
            state.loading = true;
            state.data_error = None;
            true
        });
        if !started {
            return MergeOutcome::Cancelled;
        }

        log::info!(
            "Merging {} guest item(s) for {}",
            guest.len(),
            session.owner_id
        );
        let remote = self.remote_for(session);
        let outcome = self.run_merge(&remote, guest, &token).await;

        self.store.update_if(|state| {
            if token.is_cancelled() {
                return false;
            }
            state.loading = false;
            true
        });
        log::info!("Merge for {} finished: {:?}", remote.owner(), outcome);
        outcome
    }

    async fn run_merge(&self, remote: &RemoteStore, guest: ItemList, token: &MergeToken) -> MergeOutcome {
        let fetched = remote.fetch_ordered().await;
        if token.is_cancelled() {
            return MergeOutcome::Cancelled;
        }
        let existing = match fetched {
            Ok(items) => ItemList::from_items(items).partition_by_completion(),
            Err(e) => {
                report_remote_error(&self.store, remote, e);
                return MergeOutcome::FetchFailed;
            }
        };

        if guest.is_empty() {
            let total = existing.len();
            if !self.adopt(existing.clone(), token) {
                return MergeOutcome::Cancelled;
            }
            // Also heals position drift left by earlier sessions
            self.write_back(remote, &existing, token).await;
            return MergeOutcome::Adopted { total };
        }

        // Appended after every existing item, in guest order, without re-partitioning
        let drafts: Vec<RowDraft> = guest
            .iter()
            .enumerate()
            .map(|(index, item)| RowDraft {
                content: item.content.clone(),
                is_completed: item.is_completed,
                position: existing.len() + index,
            })
            .collect();
        let inserted = drafts.len();

        let insert_result = remote.insert_many(drafts).await;
        if token.is_cancelled() {
            return MergeOutcome::Cancelled;
        }
        if let Err(e) = insert_result {
            // Guest blob stays; the merge is not retried for this sign-in
            report_remote_error(&self.store, remote, e);
            self.adopt(existing, token);
            return MergeOutcome::InsertFailed;
        }

        // Committed remotely: the guest list must never be replayed
        self.clear_local().await;

        let refetched = remote.fetch_ordered().await;
        if token.is_cancelled() {
            return MergeOutcome::Cancelled;
        }
        let merged = match refetched {
            Ok(items) => ItemList::from_items(items).partition_by_completion(),
            Err(e) => {
                // Guest rows only exist under store ids we never learned;
                // they show up on the next successful fetch
                report_remote_error(&self.store, remote, e);
                self.adopt(existing, token);
                return MergeOutcome::RefetchFailed { inserted };
            }
        };

        let total = merged.len();
        if !self.adopt(merged.clone(), token) {
            return MergeOutcome::Cancelled;
        }
        self.write_back(remote, &merged, token).await;
        MergeOutcome::Merged { inserted, total }
    }

    /// Publish `list` unless the merge was superseded
    fn adopt(&self, list: ItemList, token: &MergeToken) -> bool {
        self.store.update_if(|state| {
            if token.is_cancelled() {
                return false;
            }
            state.items = list;
            true
        })
    }

    async fn write_back(&self, remote: &RemoteStore, list: &ItemList, token: &MergeToken) {
        if let Err(e) = remote.upsert_many(list).await {
            if !token.is_cancelled() {
                report_remote_error(&self.store, remote, e);
            }
        }
    }
}

/// Log a remote failure and show it, unless its owner has since signed out
pub(super) fn report_remote_error(store: &AppStore, remote: &RemoteStore, error: DomainError) {
    log::error!("Remote operation failed for {}: {}", remote.owner(), error);
    store_set_error_for(store, remote.owner(), error.to_string());
}
