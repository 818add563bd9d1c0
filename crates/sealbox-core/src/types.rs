//! Strong type definitions for Sealbox.
//!
//! Store identifiers are newtypes so a blob id can never be confused with a
//! key or a hash at compile time.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 16-byte identifier of a record in the untrusted blob store.
///
/// Ids are either random (fresh records) or derived deterministically from
/// public material (the credential record of a username). They are observable
/// by the adversary and carry no authenticity on their own.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlobId(pub [u8; 16]);

impl BlobId {
    /// Create a new BlobId from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Generate a random id.
    pub fn random() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Derive an id from public material under a domain-separation context.
    ///
    /// The same `(context, material)` pair always yields the same id.
    pub fn derive(context: &str, material: &[u8]) -> Self {
        let full = blake3::derive_key(context, material);
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&full[..16]);
        Self(bytes)
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 16 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// The zero id (sentinel).
    pub const ZERO: Self = Self([0u8; 16]);
}

impl fmt::Debug for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobId({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for BlobId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 16]> for BlobId {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for BlobId {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 16] = slice.try_into()?;
        Ok(Self(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_id_hex_roundtrip() {
        let id = BlobId::from_bytes([0x42; 16]);
        let recovered = BlobId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn test_blob_id_display() {
        let id = BlobId::from_bytes([0xab; 16]);
        assert_eq!(format!("{}", id), "ab".repeat(16));
    }

    #[test]
    fn test_derive_is_deterministic_and_separated() {
        let a = BlobId::derive("sealbox-v0 test", b"alice");
        let b = BlobId::derive("sealbox-v0 test", b"alice");
        let c = BlobId::derive("sealbox-v0 other", b"alice");
        let d = BlobId::derive("sealbox-v0 test", b"alicE");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_random_ids_differ() {
        assert_ne!(BlobId::random(), BlobId::random());
    }

    #[test]
    fn test_from_hex_rejects_wrong_length() {
        assert!(BlobId::from_hex("abcd").is_err());
    }
}
