//! Sealed boxes: asymmetric encryption to a published X25519 key.
//!
//! The sender generates an ephemeral X25519 key, agrees a shared secret with
//! the recipient's static public key, derives a wrapping key with Blake3 and
//! encrypts under ChaCha20-Poly1305. Only the holder of the matching
//! [`DecryptionKey`] can open the box.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::codec::{from_cbor, to_cbor};
use crate::error::{CoreError, Result};
use crate::symmetric::NONCE_SIZE;

const SEAL_CONTEXT: &str = "sealbox-v0 sealed-box";

/// An X25519 public key, as published in the key directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncryptionPublicKey(pub [u8; 32]);

impl EncryptionPublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn to_dalek(self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl From<PublicKey> for EncryptionPublicKey {
    fn from(pk: PublicKey) -> Self {
        Self(*pk.as_bytes())
    }
}

/// A long-term X25519 secret key. The inner secret zeroizes on drop.
#[derive(Clone)]
pub struct DecryptionKey(StaticSecret);

impl DecryptionKey {
    /// Generate a new random secret.
    pub fn generate() -> Self {
        Self(StaticSecret::random_from_rng(rand::thread_rng()))
    }

    /// Create from secret bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Export the secret bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Derive the public key.
    pub fn public_key(&self) -> EncryptionPublicKey {
        EncryptionPublicKey::from(PublicKey::from(&self.0))
    }
}

impl std::fmt::Debug for DecryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DecryptionKey({:?})", self.public_key())
    }
}

/// A box sealed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedBox {
    /// Ephemeral X25519 public key (sender's side of ECDH).
    pub ephemeral_public: EncryptionPublicKey,

    /// Nonce used for encryption.
    pub nonce: [u8; NONCE_SIZE],

    /// The encrypted payload (includes authentication tag).
    pub ciphertext: Vec<u8>,
}

impl SealedBox {
    /// Seal `plaintext` so that only `recipient` can open it.
    pub fn seal(recipient: &EncryptionPublicKey, plaintext: &[u8]) -> Result<Self> {
        let ephemeral = EphemeralSecret::random_from_rng(rand::thread_rng());
        let ephemeral_public = EncryptionPublicKey::from(PublicKey::from(&ephemeral));
        let shared = ephemeral.diffie_hellman(&recipient.to_dalek());

        let wrap_key = derive_wrap_key(shared.as_bytes(), &ephemeral_public, recipient);
        let cipher = ChaCha20Poly1305::new_from_slice(&wrap_key)
            .map_err(|e| CoreError::EncryptionError(e.to_string()))?;

        let mut nonce = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CoreError::EncryptionError(e.to_string()))?;

        Ok(Self {
            ephemeral_public,
            nonce,
            ciphertext,
        })
    }

    /// Open the box with the recipient's secret key.
    pub fn open(&self, recipient_secret: &DecryptionKey) -> Result<Vec<u8>> {
        let recipient_public = recipient_secret.public_key();
        let shared = recipient_secret
            .0
            .diffie_hellman(&self.ephemeral_public.to_dalek());

        let wrap_key = derive_wrap_key(shared.as_bytes(), &self.ephemeral_public, &recipient_public);
        let cipher = ChaCha20Poly1305::new_from_slice(&wrap_key)
            .map_err(|e| CoreError::DecryptionError(e.to_string()))?;

        cipher
            .decrypt(Nonce::from_slice(&self.nonce), self.ciphertext.as_slice())
            .map_err(|e| CoreError::DecryptionError(e.to_string()))
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        to_cbor(self)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        from_cbor(bytes)
    }
}

fn derive_wrap_key(
    shared: &[u8; 32],
    ephemeral_public: &EncryptionPublicKey,
    recipient_public: &EncryptionPublicKey,
) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(SEAL_CONTEXT);
    hasher.update(shared);
    hasher.update(ephemeral_public.as_bytes());
    hasher.update(recipient_public.as_bytes());
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let recipient = DecryptionKey::generate();
        let sealed = SealedBox::seal(&recipient.public_key(), b"file key bytes").unwrap();
        assert_eq!(sealed.open(&recipient).unwrap(), b"file key bytes");
    }

    #[test]
    fn test_wrong_recipient_fails() {
        let recipient = DecryptionKey::generate();
        let eavesdropper = DecryptionKey::generate();
        let sealed = SealedBox::seal(&recipient.public_key(), b"secret").unwrap();
        assert!(sealed.open(&eavesdropper).is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let recipient = DecryptionKey::generate();
        let sealed = SealedBox::seal(&recipient.public_key(), b"secret").unwrap();
        let recovered = SealedBox::from_bytes(&sealed.to_bytes().unwrap()).unwrap();
        assert_eq!(sealed, recovered);
        assert_eq!(recovered.open(&recipient).unwrap(), b"secret");
    }

    #[test]
    fn test_decryption_key_bytes_roundtrip() {
        let key = DecryptionKey::generate();
        let restored = DecryptionKey::from_bytes(key.to_bytes());
        assert_eq!(key.public_key(), restored.public_key());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let recipient = DecryptionKey::generate();
        let mut sealed = SealedBox::seal(&recipient.public_key(), b"secret").unwrap();
        sealed.ciphertext[0] ^= 0xff;
        assert!(sealed.open(&recipient).is_err());
    }
}
