//! Database Connection and Setup
//!
//! Manages the SQLite connection and migrations. The same file holds the
//! guest blob table and, when no remote is configured, the items table that
//! stands in for the remote store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::domain::{DomainError, DomainResult};

/// Database state wrapper
#[derive(Clone)]
pub struct DbState {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl DbState {
    /// Shared handle to the connection
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Open (or create) the database at `db_path` and run migrations
///
/// `":memory:"` opens a private in-memory database.
pub fn init_db(db_path: &Path) -> DomainResult<DbState> {
    let conn = Connection::open(db_path)
        .map_err(|e| DomainError::Storage(format!("Failed to open db: {}", e)))?;

    run_migrations(&conn)?;
    log::info!("Database ready at {}", db_path.display());

    Ok(DbState {
        conn: Arc::new(Mutex::new(conn)),
        path: db_path.to_path_buf(),
    })
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> DomainResult<bool> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", table))
        .map_err(|e| DomainError::Storage(e.to_string()))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|e| DomainError::Storage(e.to_string()))?;

    for name in names {
        if name.map_err(|e| DomainError::Storage(e.to_string()))? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> DomainResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS guest_blobs (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| DomainError::Storage(e.to_string()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            is_completed INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            user_id TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| DomainError::Storage(e.to_string()))?;

    // Older files predate ordering; their rows keep a NULL position
    if !column_exists(conn, "items", "position")? {
        conn.execute("ALTER TABLE items ADD COLUMN position INTEGER", [])
            .map_err(|e| DomainError::Storage(format!("Failed to add position: {}", e)))?;
    }

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_items_owner ON items(user_id, position)",
        [],
    )
    .map_err(|e| DomainError::Storage(e.to_string()))?;

    Ok(())
}
