//! # Sealbox Store
//!
//! The two untrusted collaborators Sealbox runs on, and the authenticated
//! framing every record goes through.
//!
//! ## Overview
//!
//! - [`BlobStore`] - a public key-value store. The adversary can read,
//!   overwrite, replay or delete any record.
//! - [`KeyDirectory`] - an append-only, authentic map from
//!   `(name, role)` to a public key.
//! - [`AuthenticatedStore`] - wraps a [`BlobStore`] with a location-bound
//!   integrity tag on every record and optional Ed25519 signatures checked
//!   against a set of acceptable signers.
//!
//! ## Implementations
//!
//! - [`MemoryBlobStore`] / [`MemoryDirectory`] - in-memory, for tests
//! - [`SqliteStore`] - SQLite-backed, implements both traits over one file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sealbox_core::SigningKeypair;
//! use sealbox_store::{AuthenticatedStore, MemoryBlobStore};
//!
//! let store = AuthenticatedStore::new(MemoryBlobStore::new());
//! let signer = SigningKeypair::generate();
//!
//! let id = store.fresh_id().unwrap();
//! store.put_signed(&id, b"record", &signer).unwrap();
//! let payload = store.get_signed(&id, &[signer.verify_key()]).unwrap();
//! assert_eq!(payload.as_deref(), Some(&b"record"[..]));
//! ```
//!
//! ## Design Notes
//!
//! - **Last writer wins**: stores provide no compare-and-swap. Two clients
//!   doing read-modify-write on the same id can lose an update.
//! - **Tags are not secrets**: the tag key is derived from the id, so anyone
//!   can recompute it. It binds content to location and catches corruption;
//!   authenticity comes from signatures and AEAD one layer up.

pub mod authenticated;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use authenticated::{location_tag, AuthenticatedStore, TAG_LEN};
pub use error::{Result, StoreError};
pub use memory::{MemoryBlobStore, MemoryDirectory};
pub use sqlite::SqliteStore;
pub use traits::{BlobStore, DirectoryExt, KeyDirectory, KeyRole};
