//! Error types for the vault.

use sealbox_access::AccessError;
use sealbox_core::CoreError;
use sealbox_store::StoreError;
use thiserror::Error;

/// Errors returned by vault and identity operations.
///
/// Lower layers convert into this taxonomy: anything that means a record
/// failed an integrity, signature, padding or shape check becomes
/// [`VaultError::Tampered`]; collaborator failures stay
/// [`VaultError::Store`].
#[derive(Debug, Error)]
pub enum VaultError {
    /// Identity, file or record absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate identity, filename or grant.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Wrong password.
    #[error("bad credential")]
    BadCredential,

    /// A record failed an integrity or authenticity check.
    #[error("record tampered: {0}")]
    Tampered(String),

    /// Caller may not perform this operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Invitation handle is unknown, consumed, or not for this caller.
    #[error("invalid invitation: {0}")]
    InvalidInvitation(String),

    /// The store or directory failed.
    #[error("store error: {0}")]
    Store(#[source] StoreError),

    /// Cryptographic failure unrelated to integrity (e.g. encoding).
    #[error("crypto error: {0}")]
    Crypto(#[source] CoreError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<StoreError> for VaultError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Tampered(id) => VaultError::Tampered(format!("record {}", id)),
            StoreError::Unverified(id) => {
                VaultError::Tampered(format!("record {} has no valid signature", id))
            }
            StoreError::AlreadyPublished { name, .. } => {
                VaultError::AlreadyExists(format!("identity {:?}", name))
            }
            StoreError::Core(e) => e.into(),
            other => VaultError::Store(other),
        }
    }
}

impl From<CoreError> for VaultError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidSignature
            | CoreError::InvalidPublicKey
            | CoreError::BadPadding(_)
            | CoreError::DecryptionError(_)
            | CoreError::DecodingError(_) => VaultError::Tampered(err.to_string()),
            CoreError::KeyDerivationError(msg) => VaultError::Config(msg),
            other => VaultError::Crypto(other),
        }
    }
}

impl From<AccessError> for VaultError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Corrupt(msg) => VaultError::Tampered(msg),
            AccessError::DuplicateChild(name) => {
                VaultError::AlreadyExists(format!("{:?} already has access", name))
            }
            AccessError::TreeTooLarge(cap) => {
                VaultError::Tampered(format!("access tree exceeds {} nodes", cap))
            }
            AccessError::Core(e) => e.into(),
        }
    }
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;
    use sealbox_core::BlobId;

    #[test]
    fn test_integrity_failures_become_tampered() {
        let id = BlobId::random();
        assert!(matches!(
            VaultError::from(StoreError::Tampered(id)),
            VaultError::Tampered(_)
        ));
        assert!(matches!(
            VaultError::from(StoreError::Unverified(id)),
            VaultError::Tampered(_)
        ));
        assert!(matches!(
            VaultError::from(CoreError::BadPadding("x")),
            VaultError::Tampered(_)
        ));
        assert!(matches!(
            VaultError::from(AccessError::Corrupt("maps".into())),
            VaultError::Tampered(_)
        ));
    }

    #[test]
    fn test_collaborator_failures_stay_store() {
        let err = VaultError::from(StoreError::Poisoned("lock".into()));
        assert!(matches!(err, VaultError::Store(_)));
    }
}
