//! Commands Layer
//!
//! Handlers the UI calls. They validate input, update the store and hand
//! persistence off to the sync layer.

mod auth_cmd;
mod drag_cmd;
mod item_cmd;


pub use auth_cmd::*;
pub use drag_cmd::*;
pub use item_cmd::*;
