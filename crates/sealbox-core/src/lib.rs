//! # Sealbox Core
//!
//! Pure primitives for Sealbox: blob identifiers, signing, sealed boxes,
//! padded symmetric encryption, password key derivation and the CBOR codec.
//!
//! This crate contains no I/O, no storage, no networking. Everything that
//! touches the untrusted store lives in `sealbox-store`.
//!
//! ## Key Types
//!
//! - [`BlobId`] - 128-bit identifier of a record in the untrusted store
//! - [`SigningKeypair`] / [`VerifyKey`] - Ed25519 signing and verification
//! - [`DecryptionKey`] / [`EncryptionPublicKey`] - X25519 sealed boxes
//! - [`SymmetricKey`] - ChaCha20-Poly1305 with block padding
//! - [`KdfParams`] - Argon2id cost parameters for password derivation

pub mod codec;
pub mod crypto;
pub mod error;
pub mod kdf;
pub mod seal;
pub mod symmetric;
pub mod types;

pub use codec::{from_cbor, to_cbor};
pub use crypto::{Blake3Hash, Signature, SigningKeypair, VerifyKey, SIGNATURE_LEN};
pub use error::{CoreError, Result};
pub use kdf::{derive_password_key, KdfParams};
pub use seal::{DecryptionKey, EncryptionPublicKey, SealedBox};
pub use symmetric::{pad, unpad, SymmetricKey, BLOCK_SIZE};
pub use types::BlobId;
