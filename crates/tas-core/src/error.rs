//! Error types for the Trust Anchor Service core.

use thiserror::Error;

/// Core errors raised by encoding, key handling, and proof operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid private key")]
    InvalidPrivateKey,

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("unknown signing key: {0}")]
    UnknownKey(String),

    #[error("invalid DID: {0}")]
    InvalidDid(String),

    #[error("invalid DID key URL: {0}")]
    InvalidDidKeyUrl(String),

    #[error("invalid proof purpose: {0}")]
    InvalidProofPurpose(String),

    #[error("proof is missing")]
    MissingProof,

    #[error("proof value is missing")]
    MissingProofValue,

    #[error("verification method not found: {0}")]
    VerificationMethodNotFound(String),

    #[error("no verifying proof for key {0}")]
    UnprovenKey(String),

    #[error("proof signer {signer} does not match {expected}")]
    SignerMismatch { signer: String, expected: String },

    #[error("auth nonce does not match the transaction")]
    AuthNonceMismatch,

    #[error("unsupported curve: {0}")]
    UnsupportedCurve(String),

    #[error("multibase error: {0}")]
    Multibase(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Errors from comparing two consecutive versions of a DID document.
///
/// Every variant maps to its own stable error code at the service layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("invalid versionId: current {current}, proposed {proposed}")]
    InvalidVersion { current: String, proposed: String },

    #[error("updated must be later than {current}, got {proposed}")]
    InvalidUpdated { current: String, proposed: String },

    #[error("@context changed between versions")]
    ContextMismatch,

    #[error("id changed between versions: {current} -> {proposed}")]
    IdMismatch { current: String, proposed: String },

    #[error("controller changed between versions: {current} -> {proposed}")]
    ControllerMismatch { current: String, proposed: String },

    #[error("created changed between versions")]
    CreatedMismatch,

    #[error("deactivated changed between versions")]
    DeactivatedMismatch,

    #[error("invalid timestamp {0}")]
    InvalidTimestamp(String),

    #[error("structural error: {0}")]
    StructuralError(String),
}
