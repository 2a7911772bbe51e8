//! In-memory stores
//!
//! Used for tests and for running without any persistence. Both stores can
//! be told to fail so the error paths of the sync layer can be exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::{Mutex, Semaphore};

use super::traits::{BlobStore, ItemRow, NewItemRow, RowBackend};
use crate::domain::{DomainError, DomainResult, ItemId, OwnerId, Session};

#[derive(Default)]
pub struct MemoryBlobStore {
    entries: Mutex<HashMap<String, String>>,
    unavailable: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails, like storage blocked by the browser
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Writes fail, like an exceeded quota
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    fn check_available(&self) -> DomainResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::Storage("storage unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> DomainResult<Option<String>> {
        self.check_available()?;
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> DomainResult<()> {
        self.check_available()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::Storage("quota exceeded".to_string()));
        }
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> DomainResult<()> {
        self.check_available()?;
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// Row store held in memory
///
/// Ids are sequential integers rendered as strings. Creation times increase
/// strictly with every insert so ordering ties are deterministic.
pub struct MemoryRowBackend {
    rows: Mutex<Vec<ItemRow>>,
    next_id: AtomicU64,
    clock: AtomicI64,
    fail_fetches: AtomicBool,
    fail_inserts: AtomicBool,
    fail_writes: AtomicBool,
    upserts: AtomicUsize,
    fetches: AtomicUsize,
    fetch_limit: AtomicUsize,
    fetch_gate: Option<Arc<Semaphore>>,
    insert_gate: Option<Arc<Semaphore>>,
}

impl Default for MemoryRowBackend {
    fn default() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            clock: AtomicI64::new(0),
            fail_fetches: AtomicBool::new(false),
            fail_inserts: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            upserts: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            fetch_limit: AtomicUsize::new(usize::MAX),
            fetch_gate: None,
            insert_gate: None,
        }
    }
}

impl MemoryRowBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch waits for a permit on `gate` before reading
    pub fn with_fetch_gate(gate: Arc<Semaphore>) -> Self {
        Self {
            fetch_gate: Some(gate),
            ..Self::default()
        }
    }

    /// Every single-row insert waits for a permit on `gate` before writing
    pub fn with_insert_gate(gate: Arc<Semaphore>) -> Self {
        Self {
            insert_gate: Some(gate),
            ..Self::default()
        }
    }

    /// The first `count` fetches succeed, every later one fails
    pub fn fail_fetches_after(&self, count: usize) {
        self.fetch_limit.store(count, Ordering::SeqCst);
    }

    pub fn set_fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Upserts and deletes fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Insert a row directly, bypassing failure switches
    pub async fn seed(&self, owner: &OwnerId, content: &str, is_completed: bool, position: Option<i64>) -> ItemId {
        let row = self.new_row(NewItemRow {
            content: content.to_string(),
            is_completed,
            position: position.unwrap_or_default(),
            user_id: owner.clone(),
        });
        let row = ItemRow { position, ..row };
        let id = row.id.clone();
        self.rows.lock().await.push(row);
        id
    }

    /// Rows of one owner in store order
    pub async fn rows_for(&self, owner: &OwnerId) -> Vec<ItemRow> {
        let mut rows: Vec<ItemRow> = self
            .rows
            .lock()
            .await
            .iter()
            .filter(|row| &row.user_id == owner)
            .cloned()
            .collect();
        sort_rows(&mut rows);
        rows
    }

    fn new_row(&self, row: NewItemRow) -> ItemRow {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let tick = self.clock.fetch_add(1, Ordering::SeqCst);
        ItemRow {
            id: ItemId::new(id.to_string()),
            content: row.content,
            is_completed: row.is_completed,
            position: Some(row.position),
            created_at: Some(Utc::now() + Duration::milliseconds(tick)),
            user_id: row.user_id,
        }
    }
}

/// Position ascending with unset positions last, then creation time
fn sort_rows(rows: &mut [ItemRow]) {
    rows.sort_by(|a, b| {
        (a.position.is_none(), a.position, a.created_at)
            .cmp(&(b.position.is_none(), b.position, b.created_at))
    });
}

#[async_trait]
impl RowBackend for MemoryRowBackend {
    async fn select_ordered(&self, session: &Session) -> DomainResult<Vec<ItemRow>> {
        if let Some(gate) = &self.fetch_gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| DomainError::Remote(e.to_string()))?;
        }
        let attempt = self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) || attempt >= self.fetch_limit.load(Ordering::SeqCst) {
            return Err(DomainError::Remote("Failed to fetch items".to_string()));
        }
        Ok(self.rows_for(&session.owner_id).await)
    }

    async fn insert_one(&self, session: &Session, row: NewItemRow) -> DomainResult<ItemRow> {
        if let Some(gate) = &self.insert_gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| DomainError::Remote(e.to_string()))?;
        }
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(DomainError::Remote("Failed to insert item".to_string()));
        }
        let row = self.new_row(NewItemRow {
            user_id: session.owner_id.clone(),
            ..row
        });
        self.rows.lock().await.push(row.clone());
        Ok(row)
    }

    async fn insert_many(&self, session: &Session, rows: Vec<NewItemRow>) -> DomainResult<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(DomainError::Remote("Failed to insert items".to_string()));
        }
        let mut stored = self.rows.lock().await;
        for row in rows {
            stored.push(self.new_row(NewItemRow {
                user_id: session.owner_id.clone(),
                ..row
            }));
        }
        Ok(())
    }

    async fn upsert_many(&self, session: &Session, rows: Vec<ItemRow>) -> DomainResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::Remote("Failed to save items".to_string()));
        }
        self.upserts.fetch_add(1, Ordering::SeqCst);
        let mut stored = self.rows.lock().await;
        for row in rows {
            match stored.iter_mut().find(|existing| existing.id == row.id) {
                Some(existing) if existing.user_id == session.owner_id => {
                    existing.content = row.content;
                    existing.is_completed = row.is_completed;
                    existing.position = row.position;
                }
                // Someone else's row: never touched
                Some(_) => {}
                None => {
                    let tick = self.clock.fetch_add(1, Ordering::SeqCst);
                    stored.push(ItemRow {
                        created_at: Some(Utc::now() + Duration::milliseconds(tick)),
                        user_id: session.owner_id.clone(),
                        ..row
                    });
                }
            }
        }
        Ok(())
    }

    async fn delete_one(&self, session: &Session, id: &ItemId) -> DomainResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::Remote("Failed to delete item".to_string()));
        }
        self.rows
            .lock()
            .await
            .retain(|row| !(&row.id == id && row.user_id == session.owner_id));
        Ok(())
    }
}
