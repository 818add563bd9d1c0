//! Key derivation: username + password → credential key, via Argon2id.
//!
//! The salt is derived from the username, so two users who pick the same
//! password still end up with unrelated credential keys.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::symmetric::SymmetricKey;

const SALT_CONTEXT: &str = "sealbox-v0 credential-salt";

/// Argon2id parameters for password derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub mem_cost_kib: u32,
    /// Time cost / iterations.
    pub time_cost: u32,
    /// Parallelism.
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 19 * 1024,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Minimal-cost parameters. Only for tests.
    pub fn insecure_fast() -> Self {
        Self {
            mem_cost_kib: 8,
            time_cost: 1,
            parallelism: 1,
        }
    }

    /// Check that Argon2 accepts these parameters.
    pub fn validate(&self) -> Result<()> {
        self.to_argon2().map(|_| ())
    }

    fn to_argon2(&self) -> Result<Params> {
        Params::new(self.mem_cost_kib, self.time_cost, self.parallelism, Some(32))
            .map_err(|e| CoreError::KeyDerivationError(format!("invalid Argon2id params: {e}")))
    }
}

/// Derive the key that protects a user's credential record.
pub fn derive_password_key(username: &str, password: &str, params: &KdfParams) -> Result<SymmetricKey> {
    let salt = blake3::derive_key(SALT_CONTEXT, username.as_bytes());
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);

    let mut key = [0u8; 32];
    argon2
        .hash_password_into(password.as_bytes(), &salt[..16], &mut key)
        .map_err(|e| CoreError::KeyDerivationError(format!("Argon2id failed: {e}")))?;

    Ok(SymmetricKey::from_bytes(key))
}
