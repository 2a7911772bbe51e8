//! Domain Layer - Errors
//!
//! One error type shared by every layer. Adapters map foreign errors into it
//! with `map_err(|e| DomainError::X(e.to_string()))`.

use serde::{Deserialize, Serialize};

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainError {
    NotFound(String),
    /// Rejected at the mutation boundary before any I/O
    InvalidInput(String),
    /// Local blob storage failed; never shown to the user
    Storage(String),
    /// Remote row store failed; the message is shown verbatim
    Remote(String),
    Config(String),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DomainError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            DomainError::Storage(msg) => write!(f, "Storage error: {}", msg),
            // Remote messages are propagated as-is
            DomainError::Remote(msg) => write!(f, "{}", msg),
            DomainError::Config(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
