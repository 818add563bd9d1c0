//! Error types for the store module.

use sealbox_core::{BlobId, CoreError};
use thiserror::Error;

use crate::traits::KeyRole;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A lock guarding in-memory state was poisoned.
    #[error("lock poisoned: {0}")]
    Poisoned(String),

    /// Record failed its location-bound integrity check.
    #[error("integrity tag mismatch for record {0}")]
    Tampered(BlobId),

    /// No acceptable signer verified the record.
    #[error("record {0} is not signed by any expected signer")]
    Unverified(BlobId),

    /// The directory already holds a key for this name and role.
    #[error("key already published for {name} ({role:?})")]
    AlreadyPublished { name: String, role: KeyRole },

    /// Could not mint an unused id.
    #[error("could not allocate a fresh id after {0} attempts")]
    IdExhausted(usize),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Core primitive error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
