//! Repository Layer
//!
//! Data access abstractions and implementations.

mod traits;
mod local_store;
mod remote_store;
mod memory;
pub mod db;
mod sqlite_store;
mod rest;

#[cfg(test)]
mod tests;

pub use traits::{BlobStore, ItemRow, NewItemRow, RowBackend};
pub use local_store::{LocalStore, GUEST_ITEMS_KEY};
pub use remote_store::{RemoteStore, RowDraft};
pub use memory::{MemoryBlobStore, MemoryRowBackend};
pub use db::{init_db, DbState};
pub use sqlite_store::{SqliteBlobStore, SqliteRowBackend};
pub use rest::RestRowBackend;
