//! SQLite-backed stores
//!
//! `SqliteBlobStore` keeps the guest blob; `SqliteRowBackend` implements the
//! row store on the local `items` table so the app can sign in without a
//! configured remote.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;

use super::traits::{BlobStore, ItemRow, NewItemRow, RowBackend};
use crate::domain::{DomainError, DomainResult, ItemId, OwnerId, Session};

pub struct SqliteBlobStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBlobStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl BlobStore for SqliteBlobStore {
    async fn get(&self, key: &str) -> DomainResult<Option<String>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT value FROM guest_blobs WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| DomainError::Storage(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> DomainResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO guest_blobs (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map_err(|e| DomainError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> DomainResult<()> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM guest_blobs WHERE key = ?1", params![key])
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        Ok(())
    }
}

pub struct SqliteRowBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRowBackend {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

fn row_to_item_row(row: &Row) -> rusqlite::Result<ItemRow> {
    let id: i64 = row.get(0)?;
    let created_at: i64 = row.get(4)?;
    Ok(ItemRow {
        id: ItemId::new(id.to_string()),
        content: row.get(1)?,
        is_completed: row.get(2)?,
        position: row.get(3)?,
        created_at: DateTime::<Utc>::from_timestamp_millis(created_at),
        user_id: OwnerId::new(row.get::<_, String>(5)?),
    })
}

/// Stored ids are integers; anything else was never written here
fn parse_id(id: &ItemId) -> DomainResult<i64> {
    id.as_str()
        .parse::<i64>()
        .map_err(|_| DomainError::InvalidInput(format!("Not a stored item id: {}", id)))
}

#[async_trait]
impl RowBackend for SqliteRowBackend {
    async fn select_ordered(&self, session: &Session) -> DomainResult<Vec<ItemRow>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, content, is_completed, position, created_at, user_id FROM items
                 WHERE user_id = ?1
                 ORDER BY position IS NULL, position ASC, created_at ASC, id ASC",
            )
            .map_err(|e| DomainError::Remote(e.to_string()))?;

        let rows = stmt
            .query_map(params![session.owner_id.as_str()], row_to_item_row)
            .map_err(|e| DomainError::Remote(e.to_string()))?;

        let items = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| DomainError::Remote(e.to_string()))?;
        Ok(items)
    }

    async fn insert_one(&self, session: &Session, row: NewItemRow) -> DomainResult<ItemRow> {
        let conn = self.conn.lock().await;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO items (content, is_completed, position, created_at, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                row.content,
                row.is_completed,
                row.position,
                now.timestamp_millis(),
                session.owner_id.as_str()
            ],
        )
        .map_err(|e| DomainError::Remote(e.to_string()))?;

        Ok(ItemRow {
            id: ItemId::new(conn.last_insert_rowid().to_string()),
            content: row.content,
            is_completed: row.is_completed,
            position: Some(row.position),
            created_at: Some(now),
            user_id: session.owner_id.clone(),
        })
    }

    async fn insert_many(&self, session: &Session, rows: Vec<NewItemRow>) -> DomainResult<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| DomainError::Remote(e.to_string()))?;
        let now = Utc::now().timestamp_millis();

        for row in &rows {
            tx.execute(
                "INSERT INTO items (content, is_completed, position, created_at, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.content,
                    row.is_completed,
                    row.position,
                    now,
                    session.owner_id.as_str()
                ],
            )
            .map_err(|e| DomainError::Remote(e.to_string()))?;
        }

        tx.commit().map_err(|e| DomainError::Remote(e.to_string()))
    }

    async fn upsert_many(&self, session: &Session, rows: Vec<ItemRow>) -> DomainResult<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| DomainError::Remote(e.to_string()))?;
        let now = Utc::now().timestamp_millis();

        for row in &rows {
            // Rows of another owner are left alone by the WHERE clause
            tx.execute(
                "INSERT INTO items (id, content, is_completed, position, created_at, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    content = excluded.content,
                    is_completed = excluded.is_completed,
                    position = excluded.position
                 WHERE items.user_id = excluded.user_id",
                params![
                    parse_id(&row.id)?,
                    row.content,
                    row.is_completed,
                    row.position,
                    now,
                    session.owner_id.as_str()
                ],
            )
            .map_err(|e| DomainError::Remote(e.to_string()))?;
        }

        tx.commit().map_err(|e| DomainError::Remote(e.to_string()))
    }

    async fn delete_one(&self, session: &Session, id: &ItemId) -> DomainResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM items WHERE id = ?1 AND user_id = ?2",
            params![parse_id(id)?, session.owner_id.as_str()],
        )
        .map_err(|e| DomainError::Remote(e.to_string()))?;
        Ok(())
    }
}
