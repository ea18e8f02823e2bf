//! Error types for the key agreement module.

use tas_core::CoreError;
use thiserror::Error;

/// Errors that can occur during key agreement or session encryption.
#[derive(Debug, Error)]
pub enum EcdhError {
    /// Nonce is not exactly 16 bytes.
    #[error("invalid nonce: expected 16 bytes, got {0}")]
    InvalidNonce(usize),

    /// Requested curve is not supported.
    #[error("unsupported curve: {0}")]
    UnsupportedCurve(String),

    /// None of the client's candidate ciphers is acceptable.
    #[error("no matching cipher type")]
    NoMatchingCipher,

    /// The proof's key URL belongs to a different DID than the claimed one.
    #[error("proof signer {signer} does not match claimed DID {claimed}")]
    SignerMismatch { claimed: String, signer: String },

    /// The proof was made for the wrong purpose.
    #[error("invalid proof purpose: {0}")]
    InvalidProofPurpose(String),

    /// Peer public key is not a valid curve point.
    #[error("invalid public key")]
    InvalidPublicKey,

    /// Session key has the wrong length for the cipher.
    #[error("invalid session key: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    /// IV is not 16 bytes.
    #[error("invalid IV length: {0}")]
    InvalidIv(usize),

    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Decryption error.
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// Core error.
    #[error("core error: {0}")]
    CoreError(#[from] CoreError),
}

/// Result type for key agreement operations.
pub type Result<T> = std::result::Result<T, EcdhError>;
