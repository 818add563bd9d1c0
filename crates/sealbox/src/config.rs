//! Vault configuration.

use sealbox_core::KdfParams;

use crate::error::{Result, VaultError};

/// Configuration for a [`Vault`](crate::Vault).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    /// Argon2id parameters for password derivation.
    pub kdf: KdfParams,
    /// Most access-tree nodes a single traversal will visit.
    pub max_tree_nodes: usize,
    /// Most chunks a decoded content list may hold.
    pub max_chunks: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            kdf: KdfParams::default(),
            max_tree_nodes: 4096,
            max_chunks: 1 << 20,
        }
    }
}

impl VaultConfig {
    /// Reject zero caps and Argon2 parameters the KDF refuses.
    pub fn validate(&self) -> Result<()> {
        if self.max_tree_nodes == 0 {
            return Err(VaultError::Config("max_tree_nodes must be nonzero".into()));
        }
        if self.max_chunks == 0 {
            return Err(VaultError::Config("max_chunks must be nonzero".into()));
        }
        self.kdf
            .validate()
            .map_err(|e| VaultError::Config(e.to_string()))
    }
}
