//! # Sealbox Access
//!
//! The plaintext shapes of every record Sealbox keeps about a file, and the
//! access tree that decides who can reach it.
//!
//! ## Key Concepts
//!
//! - **FileMetadata**: one user's handle on a file. Owner name, where the
//!   content list and the user's file-key record live, and where the user's
//!   access-tree node lives together with its key.
//! - **FileIndex**: the per-user map from filename to metadata. Filenames
//!   are never stored in the clear; each entry sits under a keyed hash of
//!   the name.
//! - **AccessNode**: one node of the sharing tree. It names the holder's
//!   file-key record and links to every child the holder shared with.
//! - **SubtreeWalk**: a bounded worklist traversal over the tree, used by
//!   revocation to collect nodes before anything is mutated.
//!
//! This crate does no I/O. Records are encrypted, signed and stored by the
//! `sealbox` crate; traversal takes a fetch closure.

pub mod error;
pub mod records;
pub mod tree;

pub use error::{AccessError, Result};
pub use records::{filename_slot, ContentList, FileIndex, FileMetadata, InvitationCapsule};
pub use tree::{AccessNode, ChildLink, GrantRecords, PendingNode, SubtreeWalk, TreeEntry};
