//! Error types for the access module.

use thiserror::Error;

/// Errors that can occur while handling access records.
#[derive(Debug, Error)]
pub enum AccessError {
    /// A decoded record is internally inconsistent.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// A child with this name is already linked.
    #[error("child already linked: {0}")]
    DuplicateChild(String),

    /// Traversal visited more nodes than allowed.
    #[error("access tree exceeds {0} nodes")]
    TreeTooLarge(usize),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] sealbox_core::CoreError),
}

/// Result type for access operations.
pub type Result<T> = std::result::Result<T, AccessError>;
