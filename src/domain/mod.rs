//! Domain Layer
//!
//! Items, the ordered list that keeps them normalized, and session identity.
//! This layer does no I/O.

mod error;
mod item;
mod item_list;
mod session;

pub use error::{DomainError, DomainResult};
pub use item::{normalize_content, Item, ItemId};
pub use item_list::{ItemFilter, ItemList, Segment};
pub use session::{AuthEvent, AuthEventKind, OwnerId, Session};
