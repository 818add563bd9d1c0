//! Test fixtures and helpers.

use sealbox::{Identity, InvitationId, Vault, VaultConfig};
use sealbox_core::KdfParams;
use sealbox_store::{MemoryBlobStore, MemoryDirectory};

/// Identity type the fixtures hand out.
pub type TestIdentity = Identity<MemoryBlobStore, MemoryDirectory>;

/// Vault configuration with the cheapest KDF Argon2 accepts.
pub fn test_config() -> VaultConfig {
    VaultConfig {
        kdf: KdfParams::insecure_fast(),
        ..VaultConfig::default()
    }
}

/// The password fixtures use for `username`.
pub fn password_for(username: &str) -> String {
    format!("pw-{}", username)
}

/// An in-memory vault with helpers for common scenarios.
pub struct TestVault {
    pub vault: Vault<MemoryBlobStore, MemoryDirectory>,
}

impl TestVault {
    /// Fresh in-memory vault using [`test_config`].
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Fresh in-memory vault with a custom configuration.
    ///
    /// # Panics
    ///
    /// If the configuration is invalid.
    pub fn with_config(config: VaultConfig) -> Self {
        let vault = Vault::new(MemoryBlobStore::new(), MemoryDirectory::new(), config)
            .expect("test config is valid");
        Self { vault }
    }

    /// The raw store, for playing the adversary.
    pub fn store(&self) -> &MemoryBlobStore {
        self.vault.store()
    }

    /// Register `username` with [`password_for`].
    ///
    /// # Panics
    ///
    /// If the user already exists.
    pub fn user(&self, username: &str) -> TestIdentity {
        self.vault
            .create_identity(username, &password_for(username))
            .expect("create identity")
    }

    /// Log in again as `username`, e.g. as a second device.
    pub fn login(&self, username: &str) -> TestIdentity {
        self.vault
            .authenticate(username, &password_for(username))
            .expect("authenticate")
    }

    /// Share `filename` from `sender` to `recipient`, who files it as
    /// `as_name`.
    pub fn share(
        &self,
        sender: &TestIdentity,
        filename: &str,
        recipient: &TestIdentity,
        as_name: &str,
    ) -> InvitationId {
        let invite = sender
            .create_invitation(filename, recipient.username())
            .expect("create invitation");
        recipient
            .accept_invitation(sender.username(), invite, as_name)
            .expect("accept invitation");
        invite
    }
}

impl Default for TestVault {
    fn default() -> Self {
        Self::new()
    }
}

/// Register `count` users named `user0`, `user1`, ...
pub fn many_users(tv: &TestVault, count: usize) -> Vec<TestIdentity> {
    (0..count).map(|i| tv.user(&format!("user{}", i))).collect()
}
