//! Merge cancellation
//!
//! Every session transition advances a shared epoch. A merge holds the epoch
//! it was started under and is cancelled as soon as the epoch moves on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct SessionEpoch {
    current: Arc<AtomicU64>,
}

impl SessionEpoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new epoch, cancelling outstanding tokens, and return its token
    pub fn advance(&self) -> MergeToken {
        let issued = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        MergeToken {
            current: self.current.clone(),
            issued,
        }
    }

    /// Cancel outstanding tokens without issuing a new one
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }
}

/// Per-merge cancellation token
#[derive(Debug, Clone)]
pub struct MergeToken {
    current: Arc<AtomicU64>,
    issued: u64,
}

impl MergeToken {
    pub fn is_cancelled(&self) -> bool {
        self.current.load(Ordering::SeqCst) != self.issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_epoch_cancels_older_token() {
        let epoch = SessionEpoch::new();
        let first = epoch.advance();
        assert!(!first.is_cancelled());

        let second = epoch.advance();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        epoch.invalidate();
        assert!(second.is_cancelled());
    }
}
