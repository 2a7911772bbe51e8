//! Sync Layer
//!
//! Decides where each mutation is persisted (guest store or remote store),
//! runs the one-time guest merge on sign-in, and drives both from the
//! session lifecycle.

mod cancel;
mod reconcile;
mod session_controller;
mod write_through;

pub use cancel::{MergeToken, SessionEpoch};
pub use reconcile::{MergeOutcome, ReconciliationEngine};
pub use session_controller::{SessionController, SessionState, Transition};
