//! # Sealbox
//!
//! Confidential, integrity-protected file storage and sharing for many
//! users on top of an untrusted key-value store and an authentic public
//! key directory.
//!
//! ## Overview
//!
//! - **Identities** are recovered from username and password alone. Nothing
//!   is kept on the device.
//! - **Files** are encrypted in chunks under a per-file key. Appends cost
//!   one chunk, not a rewrite.
//! - **Sharing** builds a tree rooted at the owner. Any holder can share
//!   onward with a single-use invitation.
//! - **Revocation** cuts a subtree, destroys its records and rotates the
//!   file key for everyone left.
//!
//! The store may be read and rewritten by an adversary at will. Every
//! record carries a location-bound integrity tag, and records whose origin
//! matters are signed; a failed check surfaces as
//! [`VaultError::Tampered`], never as corrupted plaintext.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sealbox::{Vault, VaultConfig};
//! use sealbox::store::{MemoryBlobStore, MemoryDirectory};
//!
//! let vault = Vault::new(MemoryBlobStore::new(), MemoryDirectory::new(), VaultConfig::default())?;
//!
//! let alice = vault.create_identity("alice", "correct horse")?;
//! let bob = vault.create_identity("bob", "battery staple")?;
//!
//! alice.store_file("notes.txt", b"draft")?;
//! alice.append_to_file("notes.txt", b" two")?;
//!
//! let invite = alice.create_invitation("notes.txt", "bob")?;
//! bob.accept_invitation("alice", invite, "from-alice.txt")?;
//! assert_eq!(bob.load_file("from-alice.txt")?, b"draft two");
//!
//! alice.revoke_access("notes.txt", "bob")?;
//! assert!(bob.load_file("from-alice.txt").is_err());
//! # Ok::<(), sealbox::VaultError>(())
//! ```
//!
//! ## Concurrency
//!
//! The store is last-writer-wins. Two holders appending at the same moment
//! both read the same chunk list, and the later write drops the earlier
//! chunk. Callers that need stronger guarantees must serialize writers
//! themselves or use a store that does.
//!
//! ## Re-exports
//!
//! - `sealbox::core` - primitives (ids, keys, sealed boxes, KDF)
//! - `sealbox::store` - collaborator traits and implementations
//! - `sealbox::access` - file records and the access tree

pub mod config;
mod envelope;
pub mod error;
mod file;
pub mod identity;
pub mod sharing;
pub mod vault;

pub use sealbox_access as access;
pub use sealbox_core as core;
pub use sealbox_store as store;

pub use config::VaultConfig;
pub use error::{Result, VaultError};
pub use identity::Identity;
pub use sharing::InvitationId;
pub use vault::{credential_id, Vault};

pub use sealbox_core::KdfParams;
