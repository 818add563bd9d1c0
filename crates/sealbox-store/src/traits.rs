//! Collaborator traits: the blob store and the key directory.
//!
//! Both are synchronous. Every call is a blocking round trip, and callers
//! never hold a lock across calls.

use sealbox_core::{BlobId, EncryptionPublicKey, VerifyKey};

use crate::error::Result;

/// The untrusted key-value store.
///
/// Implementations make no integrity promises: a `get` may return bytes the
/// adversary wrote. Use [`AuthenticatedStore`](crate::AuthenticatedStore)
/// to read records back safely.
pub trait BlobStore: Send + Sync {
    /// Write `data` at `id`, replacing whatever was there.
    fn put(&self, id: &BlobId, data: &[u8]) -> Result<()>;

    /// Read the bytes at `id`, if any.
    fn get(&self, id: &BlobId) -> Result<Option<Vec<u8>>>;

    /// Remove the record at `id`. Deleting a missing id is not an error.
    fn delete(&self, id: &BlobId) -> Result<()>;

    /// Propose a new random id. Uniqueness is checked by the caller.
    fn new_id(&self) -> BlobId {
        BlobId::random()
    }

    /// Check if any record exists at `id`.
    fn contains(&self, id: &BlobId) -> Result<bool> {
        Ok(self.get(id)?.is_some())
    }
}

/// The role a published key plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRole {
    /// X25519 key used to seal boxes to the user.
    Encryption,
    /// Ed25519 key used to check the user's signatures.
    Verification,
}

impl KeyRole {
    /// Stable numeric code for persistent storage.
    pub const fn to_u8(self) -> u8 {
        match self {
            KeyRole::Encryption => 0,
            KeyRole::Verification => 1,
        }
    }

    /// Parse the numeric code.
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(KeyRole::Encryption),
            1 => Some(KeyRole::Verification),
            _ => None,
        }
    }
}

/// The public key directory.
///
/// Append-only per `(name, role)`: once a key is published it is
/// authoritative and a second `publish` for the same pair fails with
/// [`StoreError::AlreadyPublished`](crate::StoreError::AlreadyPublished).
pub trait KeyDirectory: Send + Sync {
    /// Publish a key for `name` under `role`.
    fn publish(&self, name: &str, role: KeyRole, key: [u8; 32]) -> Result<()>;

    /// Look up the key for `name` under `role`.
    fn lookup(&self, name: &str, role: KeyRole) -> Result<Option<[u8; 32]>>;
}

/// Typed lookups on top of [`KeyDirectory`].
pub trait DirectoryExt: KeyDirectory {
    /// The verification key `name` published, if any.
    fn verify_key(&self, name: &str) -> Result<Option<VerifyKey>> {
        Ok(self
            .lookup(name, KeyRole::Verification)?
            .map(VerifyKey::from_bytes))
    }

    /// The encryption key `name` published, if any.
    fn encryption_key(&self, name: &str) -> Result<Option<EncryptionPublicKey>> {
        Ok(self
            .lookup(name, KeyRole::Encryption)?
            .map(EncryptionPublicKey::from_bytes))
    }
}

impl<D: KeyDirectory + ?Sized> DirectoryExt for D {}
