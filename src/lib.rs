//! Offline-first task list
//!
//! Items live in a local guest store until the user signs in; on sign-in the
//! guest list is merged once into the user's remote list, and every later
//! change is written through to the remote store. Lists are always kept
//! partitioned into active items followed by completed ones.

pub mod app;
pub mod commands;
pub mod config;
pub mod domain;
pub mod repository;
pub mod store;
pub mod sync;

pub use app::{init_logging, App};
pub use config::{AppConfig, SyncConfig};
pub use domain::{DomainError, DomainResult, Item, ItemFilter, ItemId, ItemList};
pub use store::{AppState, AppStore, AuthView};
