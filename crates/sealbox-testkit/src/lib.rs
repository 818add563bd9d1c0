//! # Sealbox Testkit
//!
//! Testing utilities for Sealbox.
//!
//! ## Overview
//!
//! - **Fixtures**: a [`TestVault`] over in-memory collaborators with a fast
//!   KDF, plus helpers for the usual users and shared files
//! - **Generators**: proptest strategies for contents, filenames and
//!   usernames, biased toward padding edge cases
//! - **Adversary**: helpers that play the untrusted store: flip bytes,
//!   find the records an operation wrote, snapshot and replay
//!
//! ## Test Fixtures
//!
//! ```rust
//! use sealbox_testkit::TestVault;
//!
//! let tv = TestVault::new();
//! let alice = tv.user("alice");
//! alice.store_file("f", b"hello").unwrap();
//! assert_eq!(tv.login("alice").load_file("f").unwrap(), b"hello");
//! ```
//!
//! ## Tamper Testing
//!
//! ```rust
//! use sealbox_testkit::{adversary, TestVault};
//!
//! let tv = TestVault::new();
//! let alice = tv.user("alice");
//! let written = adversary::records_written_by(tv.store(), || {
//!     alice.store_file("f", b"hello").unwrap();
//! });
//! adversary::flip_byte(tv.store(), &written[0], 0);
//! ```

pub mod adversary;
pub mod fixtures;
pub mod generators;

pub use fixtures::{password_for, test_config, TestVault};
