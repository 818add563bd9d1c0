//! Error types for Sealbox core primitives.

use thiserror::Error;

/// Errors raised by the pure cryptographic and encoding primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    /// Padding did not validate after decryption.
    #[error("bad padding: {0}")]
    BadPadding(&'static str),

    #[error("encryption error: {0}")]
    EncryptionError(String),

    #[error("decryption error: {0}")]
    DecryptionError(String),

    #[error("key derivation error: {0}")]
    KeyDerivationError(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
