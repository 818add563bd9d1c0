//! Padded symmetric encryption.
//!
//! Every plaintext is padded to a 16-byte boundary (PKCS#7 style: between 1
//! and 16 bytes, each equal to the pad length) and then sealed with
//! ChaCha20-Poly1305 under a fresh random nonce. Output layout:
//! `[12-byte nonce][ciphertext + 16-byte tag]`.
//!
//! Decryption checks the AEAD tag first, then validates the padding. Either
//! failure is a hard error; nothing is ever truncated on a best-effort basis.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CoreError, Result};

/// Padding block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Nonce length for ChaCha20-Poly1305.
pub const NONCE_SIZE: usize = 12;

/// Authentication tag length for ChaCha20-Poly1305.
pub const TAG_SIZE: usize = 16;

/// A 256-bit symmetric key. Zeroized on drop.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; 32]);

impl SymmetricKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Pad and encrypt `plaintext`. Repeated calls never produce the same
    /// ciphertext.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.encrypt_bound(plaintext, &[])
    }

    /// Decrypt and strip padding.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.decrypt_bound(data, &[])
    }

    /// Pad and encrypt `plaintext`, authenticating `context` alongside it.
    ///
    /// The ciphertext only decrypts when the same `context` is supplied to
    /// [`SymmetricKey::decrypt_bound`]. Callers bind the record location here
    /// so a ciphertext moved to another location is rejected.
    pub fn encrypt_bound(&self, plaintext: &[u8], context: &[u8]) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CoreError::EncryptionError(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let padded = pad(plaintext);
        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: &padded,
                    aad: context,
                },
            )
            .map_err(|e| CoreError::EncryptionError(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt data produced by [`SymmetricKey::encrypt_bound`] under the same
    /// `context`, then strip padding.
    pub fn decrypt_bound(&self, data: &[u8], context: &[u8]) -> Result<Vec<u8>> {
        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CoreError::DecryptionError(format!(
                "ciphertext too short: {} bytes",
                data.len()
            )));
        }

        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CoreError::DecryptionError(e.to_string()))?;

        let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
        let padded = cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: context,
                },
            )
            .map_err(|e| CoreError::DecryptionError(e.to_string()))?;

        unpad(&padded).map(<[u8]>::to_vec)
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SymmetricKey").field(&"[REDACTED]").finish()
    }
}

/// Pad `data` to a multiple of [`BLOCK_SIZE`]. Always adds at least one byte.
pub fn pad(data: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut out = Vec::with_capacity(data.len() + pad_len);
    out.extend_from_slice(data);
    out.resize(data.len() + pad_len, pad_len as u8);
    out
}

/// Validate and strip padding produced by [`pad`].
pub fn unpad(padded: &[u8]) -> Result<&[u8]> {
    if padded.is_empty() || padded.len() % BLOCK_SIZE != 0 {
        return Err(CoreError::BadPadding("length is not block aligned"));
    }

    let pad_len = padded[padded.len() - 1] as usize;
    if pad_len == 0 || pad_len > BLOCK_SIZE {
        return Err(CoreError::BadPadding("pad length out of range"));
    }

    let (body, tail) = padded.split_at(padded.len() - pad_len);
    if tail.iter().any(|&b| b as usize != pad_len) {
        return Err(CoreError::BadPadding("inconsistent pad bytes"));
    }

    Ok(body)
}
