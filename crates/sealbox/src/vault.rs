//! The vault: collaborator handles, identity creation and login.
//!
//! A user's whole state hangs off one credential record at a location
//! derived from the username. It holds the long-term secrets and points at
//! the user's file index. Nothing lives on the device, so logging in twice
//! gives two handles that see the same files.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use sealbox_access::FileIndex;
use sealbox_core::{
    derive_password_key, from_cbor, to_cbor, BlobId, DecryptionKey, SigningKeypair, SymmetricKey,
};
use sealbox_store::{AuthenticatedStore, BlobStore, DirectoryExt, KeyDirectory, KeyRole, StoreError};

use crate::config::VaultConfig;
use crate::envelope;
use crate::error::{Result, VaultError};
use crate::identity::Identity;

const CREDENTIAL_CONTEXT: &str = "sealbox-v0 credential-location";

/// Where the credential record for `username` lives.
pub fn credential_id(username: &str) -> BlobId {
    BlobId::derive(CREDENTIAL_CONTEXT, username.as_bytes())
}

/// Plaintext of the credential record.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct CredentialRecord {
    #[zeroize(skip)]
    username: String,
    decryption_key: [u8; 32],
    signing_seed: [u8; 32],
    #[zeroize(skip)]
    index_id: BlobId,
    index_key: SymmetricKey,
}

/// Shared handle on the store, the directory and the configuration.
///
/// Cheap to clone. Every [`Identity`] carries one.
pub struct Vault<S, D> {
    store: Arc<AuthenticatedStore<S>>,
    directory: Arc<D>,
    config: Arc<VaultConfig>,
}

impl<S, D> Clone for Vault<S, D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            directory: Arc::clone(&self.directory),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: BlobStore, D: KeyDirectory> Vault<S, D> {
    /// Create a vault over the given collaborators.
    pub fn new(store: S, directory: D, config: VaultConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: Arc::new(AuthenticatedStore::new(store)),
            directory: Arc::new(directory),
            config: Arc::new(config),
        })
    }

    /// The configuration.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// The raw, untrusted store.
    pub fn store(&self) -> &S {
        self.store.inner()
    }

    /// The key directory.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub(crate) fn records(&self) -> &AuthenticatedStore<S> {
        &self.store
    }

    /// Register a new user.
    ///
    /// Publishes both public keys before anything else is written, then
    /// persists an empty file index and finally the credential record.
    pub fn create_identity(&self, username: &str, password: &str) -> Result<Identity<S, D>> {
        let cred_id = credential_id(username);
        if self.store.inner().contains(&cred_id)? {
            return Err(VaultError::AlreadyExists(format!("identity {:?}", username)));
        }

        let password_key = derive_password_key(username, password, &self.config.kdf)?;
        let decryption_key = DecryptionKey::generate();
        let signer = SigningKeypair::generate();

        self.directory.publish(
            username,
            KeyRole::Encryption,
            *decryption_key.public_key().as_bytes(),
        )?;
        self.directory.publish(
            username,
            KeyRole::Verification,
            *signer.verify_key().as_bytes(),
        )?;

        let index_id = self.store.fresh_id()?;
        let index_key = SymmetricKey::generate();
        envelope::put_signed(&self.store, &index_id, &index_key, &FileIndex::new(), &signer)?;

        let record = CredentialRecord {
            username: username.to_string(),
            decryption_key: decryption_key.to_bytes(),
            signing_seed: signer.seed(),
            index_id,
            index_key: index_key.clone(),
        };
        let ciphertext = password_key.encrypt_bound(&to_cbor(&record)?, cred_id.as_bytes())?;
        self.store.put_signed(&cred_id, &ciphertext, &signer)?;

        tracing::debug!(username, "identity created");
        Ok(Identity::new(
            self.clone(),
            username.to_string(),
            decryption_key,
            signer,
            index_id,
            index_key,
        ))
    }

    /// Log in as an existing user.
    ///
    /// Fails with [`VaultError::NotFound`] for an unknown user,
    /// [`VaultError::BadCredential`] for a wrong password and
    /// [`VaultError::Tampered`] when the record fails its checks.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Identity<S, D>> {
        let verify_key = self
            .directory
            .verify_key(username)?
            .ok_or_else(|| VaultError::NotFound(format!("identity {:?}", username)))?;

        let cred_id = credential_id(username);
        let ciphertext = match self.store.get_signed(&cred_id, &[verify_key]) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Err(VaultError::NotFound(format!("identity {:?}", username))),
            Err(StoreError::Tampered(_)) | Err(StoreError::Unverified(_)) => {
                tracing::warn!(username, "credential record failed verification");
                return Err(VaultError::Tampered(format!(
                    "credential record for {:?}",
                    username
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let password_key = derive_password_key(username, password, &self.config.kdf)?;
        let plaintext = password_key.decrypt_bound(&ciphertext, cred_id.as_bytes()).map_err(|_| {
            tracing::warn!(username, "authentication rejected");
            VaultError::BadCredential
        })?;
        let record: CredentialRecord = from_cbor(&plaintext)?;

        if record.username != username {
            return Err(VaultError::Tampered(format!(
                "credential record for {:?} names another user",
                username
            )));
        }

        let signer = SigningKeypair::from_seed(&record.signing_seed);
        if signer.verify_key() != verify_key {
            return Err(VaultError::Tampered(format!(
                "credential record for {:?} holds a foreign signing key",
                username
            )));
        }

        tracing::debug!(username, "authenticated");
        Ok(Identity::new(
            self.clone(),
            username.to_string(),
            DecryptionKey::from_bytes(record.decryption_key),
            signer,
            record.index_id,
            record.index_key.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealbox_core::KdfParams;
    use sealbox_store::{MemoryBlobStore, MemoryDirectory};

    fn vault() -> Vault<MemoryBlobStore, MemoryDirectory> {
        let config = VaultConfig {
            kdf: KdfParams::insecure_fast(),
            ..VaultConfig::default()
        };
        Vault::new(MemoryBlobStore::new(), MemoryDirectory::new(), config).unwrap()
    }

    #[test]
    fn test_create_then_authenticate() {
        let vault = vault();
        let created = vault.create_identity("alice", "pw").unwrap();
        let again = vault.authenticate("alice", "pw").unwrap();

        assert_eq!(created.username(), "alice");
        assert_eq!(created.verify_key(), again.verify_key());
        assert_eq!(created.encryption_key(), again.encryption_key());
    }

    #[test]
    fn test_publishes_keys() {
        let vault = vault();
        let alice = vault.create_identity("alice", "pw").unwrap();

        assert_eq!(
            vault.directory().verify_key("alice").unwrap(),
            Some(alice.verify_key())
        );
        assert_eq!(
            vault.directory().encryption_key("alice").unwrap(),
            Some(alice.encryption_key())
        );
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let vault = vault();
        vault.create_identity("alice", "pw").unwrap();
        assert!(matches!(
            vault.create_identity("alice", "other"),
            Err(VaultError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_unknown_user_not_found() {
        let vault = vault();
        assert!(matches!(
            vault.authenticate("nobody", "pw"),
            Err(VaultError::NotFound(_))
        ));
    }

    #[test]
    fn test_wrong_password() {
        let vault = vault();
        vault.create_identity("alice", "pw").unwrap();
        assert!(matches!(
            vault.authenticate("alice", "pW"),
            Err(VaultError::BadCredential)
        ));
        assert!(matches!(
            vault.authenticate("alice", ""),
            Err(VaultError::BadCredential)
        ));
    }

    #[test]
    fn test_empty_username_and_password() {
        let vault = vault();
        vault.create_identity("", "").unwrap();
        vault.authenticate("", "").unwrap();
    }

    #[test]
    fn test_usernames_case_sensitive() {
        let vault = vault();
        vault.create_identity("alice", "pw").unwrap();
        vault.create_identity("alicE", "pw").unwrap();
        assert!(matches!(
            vault.authenticate("ALICE", "pw"),
            Err(VaultError::NotFound(_))
        ));
    }

    #[test]
    fn test_junk_credential_record_is_tampered() {
        let vault = vault();
        vault.create_identity("alice", "pw").unwrap();
        vault
            .store()
            .put(&credential_id("alice"), b"junk junk junk junk junk junk junk")
            .unwrap();

        assert!(matches!(
            vault.authenticate("alice", "pw"),
            Err(VaultError::Tampered(_))
        ));
    }

    #[test]
    fn test_swapped_credential_record_is_tampered() {
        // Bob's validly signed record copied over Alice's slot fails the
        // location tag.
        let vault = vault();
        vault.create_identity("alice", "pw").unwrap();
        vault.create_identity("bob", "pw").unwrap();

        let bob_raw = vault.store().get(&credential_id("bob")).unwrap().unwrap();
        vault.store().put(&credential_id("alice"), &bob_raw).unwrap();

        assert!(matches!(
            vault.authenticate("alice", "pw"),
            Err(VaultError::Tampered(_))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = VaultConfig {
            max_tree_nodes: 0,
            ..VaultConfig::default()
        };
        assert!(matches!(
            Vault::new(MemoryBlobStore::new(), MemoryDirectory::new(), config),
            Err(VaultError::Config(_))
        ));
    }
}
