//! The service-level error: one stable code plus a message.
//!
//! Every failure surfaced by the facade is a [`TasError`]. Crate errors
//! convert into it; anything that does not classify becomes
//! [`ErrorCode::ServerError`] and its detail goes to the log, not the caller.

use std::fmt;

use thiserror::Error;
use tracing::error;

use tas_core::{CoreError, DocumentError};
use tas_ecdh::EcdhError;
use tas_registry::RegistryError;
use tas_store::StoreError;

/// Stable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // ─── Transaction state ───
    TransactionNotFound,
    SubTransactionNotFound,
    TransactionInvalid,
    TransactionExpired,

    // ─── Request validation ───
    InvalidRequest,
    InvalidDid,
    InvalidDidKeyUrl,
    InvalidNonce,
    InvalidAuthNonce,
    InvalidProofPurpose,
    InvalidSignature,
    InvalidPublicKey,
    MissingProof,
    SignerMismatch,
    VerificationMethodNotFound,
    UnsupportedCurve,
    NoMatchingCipherType,

    // ─── DID documents ───
    InvalidDidDoc,
    InvalidDidDocVersion,
    InvalidDidDocUpdated,
    DidDocContextMismatch,
    DidDocIdMismatch,
    DidDocControllerMismatch,
    DidDocCreatedMismatch,
    DidDocDeactivatedMismatch,
    InvalidDidDocStatus,
    DidDocumentRetrievalFailed,

    // ─── Server tokens ───
    ServerTokenNotFound,
    ServerTokenExpired,
    UnsupportedServerTokenPurpose,
    ServerTokenBindingMismatch,

    // ─── Registry ───
    RegistryEntryNotFound,
    RegistryConflict,
    RegistryRequestFailed,
    InvalidVcStatus,

    // ─── Crypto ───
    CryptoFailed,

    ServerError,
}

impl ErrorCode {
    /// The wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::TransactionNotFound => "TRANSACTION_NOT_FOUND",
            ErrorCode::SubTransactionNotFound => "SUB_TRANSACTION_NOT_FOUND",
            ErrorCode::TransactionInvalid => "TRANSACTION_INVALID",
            ErrorCode::TransactionExpired => "TRANSACTION_EXPIRED",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::InvalidDid => "INVALID_DID",
            ErrorCode::InvalidDidKeyUrl => "INVALID_DID_KEY_URL",
            ErrorCode::InvalidNonce => "INVALID_NONCE",
            ErrorCode::InvalidAuthNonce => "INVALID_AUTH_NONCE",
            ErrorCode::InvalidProofPurpose => "INVALID_PROOF_PURPOSE",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::InvalidPublicKey => "INVALID_PUBLIC_KEY",
            ErrorCode::MissingProof => "MISSING_PROOF",
            ErrorCode::SignerMismatch => "SIGNER_MISMATCH",
            ErrorCode::VerificationMethodNotFound => "VERIFICATION_METHOD_NOT_FOUND",
            ErrorCode::UnsupportedCurve => "UNSUPPORTED_CURVE",
            ErrorCode::NoMatchingCipherType => "NO_MATCHING_CIPHER_TYPE",
            ErrorCode::InvalidDidDoc => "INVALID_DIDDOC",
            ErrorCode::InvalidDidDocVersion => "INVALID_DIDDOC_VERSION",
            ErrorCode::InvalidDidDocUpdated => "INVALID_DIDDOC_UPDATED",
            ErrorCode::DidDocContextMismatch => "DIDDOC_CONTEXT_MISMATCH",
            ErrorCode::DidDocIdMismatch => "DIDDOC_ID_MISMATCH",
            ErrorCode::DidDocControllerMismatch => "DIDDOC_CONTROLLER_MISMATCH",
            ErrorCode::DidDocCreatedMismatch => "DIDDOC_CREATED_MISMATCH",
            ErrorCode::DidDocDeactivatedMismatch => "DIDDOC_DEACTIVATED_MISMATCH",
            ErrorCode::InvalidDidDocStatus => "INVALID_DIDDOC_STATUS",
            ErrorCode::DidDocumentRetrievalFailed => "DID_DOCUMENT_RETRIEVAL_FAILED",
            ErrorCode::ServerTokenNotFound => "SERVER_TOKEN_NOT_FOUND",
            ErrorCode::ServerTokenExpired => "SERVER_TOKEN_EXPIRED",
            ErrorCode::UnsupportedServerTokenPurpose => "UNSUPPORTED_SERVER_TOKEN_PURPOSE",
            ErrorCode::ServerTokenBindingMismatch => "SERVER_TOKEN_BINDING_MISMATCH",
            ErrorCode::RegistryEntryNotFound => "REGISTRY_ENTRY_NOT_FOUND",
            ErrorCode::RegistryConflict => "REGISTRY_CONFLICT",
            ErrorCode::RegistryRequestFailed => "REGISTRY_REQUEST_FAILED",
            ErrorCode::InvalidVcStatus => "INVALID_VC_STATUS",
            ErrorCode::CryptoFailed => "CRYPTO_FAILED",
            ErrorCode::ServerError => "SERVER_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tagged service error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct TasError {
    pub code: ErrorCode,
    pub message: String,
}

impl TasError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// An unclassified failure. The detail is logged and withheld.
    pub fn server(detail: impl fmt::Display) -> Self {
        error!(%detail, "unclassified failure");
        Self::new(ErrorCode::ServerError, "internal server error")
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, TasError>;

impl From<CoreError> for TasError {
    fn from(e: CoreError) -> Self {
        let code = match &e {
            CoreError::InvalidSignature | CoreError::MissingProofValue => ErrorCode::InvalidSignature,
            CoreError::InvalidPublicKey => ErrorCode::InvalidPublicKey,
            CoreError::InvalidDid(_) => ErrorCode::InvalidDid,
            CoreError::InvalidDidKeyUrl(_) => ErrorCode::InvalidDidKeyUrl,
            CoreError::InvalidProofPurpose(_) => ErrorCode::InvalidProofPurpose,
            CoreError::MissingProof | CoreError::UnprovenKey(_) => ErrorCode::MissingProof,
            CoreError::VerificationMethodNotFound(_) => ErrorCode::VerificationMethodNotFound,
            CoreError::SignerMismatch { .. } => ErrorCode::SignerMismatch,
            CoreError::AuthNonceMismatch => ErrorCode::InvalidAuthNonce,
            CoreError::UnsupportedCurve(_) => ErrorCode::UnsupportedCurve,
            CoreError::Multibase(_) | CoreError::DecodingError(_) => ErrorCode::InvalidRequest,
            CoreError::InvalidPrivateKey
            | CoreError::SigningFailed(_)
            | CoreError::UnknownKey(_)
            | CoreError::EncodingError(_) => ErrorCode::ServerError,
        };
        if code == ErrorCode::ServerError {
            return TasError::server(e);
        }
        TasError::new(code, e.to_string())
    }
}

impl From<DocumentError> for TasError {
    fn from(e: DocumentError) -> Self {
        let code = match &e {
            DocumentError::InvalidVersion { .. } => ErrorCode::InvalidDidDocVersion,
            DocumentError::InvalidUpdated { .. } => ErrorCode::InvalidDidDocUpdated,
            DocumentError::ContextMismatch => ErrorCode::DidDocContextMismatch,
            DocumentError::IdMismatch { .. } => ErrorCode::DidDocIdMismatch,
            DocumentError::ControllerMismatch { .. } => ErrorCode::DidDocControllerMismatch,
            DocumentError::CreatedMismatch => ErrorCode::DidDocCreatedMismatch,
            DocumentError::DeactivatedMismatch => ErrorCode::DidDocDeactivatedMismatch,
            DocumentError::InvalidTimestamp(_) | DocumentError::StructuralError(_) => {
                ErrorCode::InvalidDidDoc
            }
        };
        TasError::new(code, e.to_string())
    }
}

impl From<EcdhError> for TasError {
    fn from(e: EcdhError) -> Self {
        let code = match e {
            EcdhError::CoreError(inner) => return inner.into(),
            EcdhError::InvalidNonce(_) => ErrorCode::InvalidNonce,
            EcdhError::UnsupportedCurve(_) => ErrorCode::UnsupportedCurve,
            EcdhError::NoMatchingCipher => ErrorCode::NoMatchingCipherType,
            EcdhError::SignerMismatch { .. } => ErrorCode::SignerMismatch,
            EcdhError::InvalidProofPurpose(_) => ErrorCode::InvalidProofPurpose,
            EcdhError::InvalidPublicKey => ErrorCode::InvalidPublicKey,
            EcdhError::InvalidKeyLength { .. }
            | EcdhError::InvalidIv(_)
            | EcdhError::EncryptionError(_)
            | EcdhError::DecryptionError(_) => ErrorCode::CryptoFailed,
        };
        TasError::new(code, e.to_string())
    }
}

impl From<RegistryError> for TasError {
    fn from(e: RegistryError) -> Self {
        let code = match e {
            RegistryError::Core(inner) => return inner.into(),
            RegistryError::NotFound(_) => ErrorCode::RegistryEntryNotFound,
            RegistryError::Conflict(_) => ErrorCode::RegistryConflict,
            RegistryError::Rejected { .. }
            | RegistryError::Timeout(_)
            | RegistryError::Unavailable(_)
            | RegistryError::Decode(_) => ErrorCode::RegistryRequestFailed,
        };
        TasError::new(code, e.to_string())
    }
}

impl From<StoreError> for TasError {
    fn from(e: StoreError) -> Self {
        TasError::server(e)
    }
}

impl From<serde_json::Error> for TasError {
    fn from(e: serde_json::Error) -> Self {
        TasError::server(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_code() {
        let err = TasError::new(ErrorCode::TransactionExpired, "tx expired");
        assert_eq!(err.to_string(), "TRANSACTION_EXPIRED: tx expired");
    }

    #[test]
    fn test_store_errors_are_opaque() {
        let err: TasError = StoreError::Migration("disk I/O error".into()).into();
        assert_eq!(err.code, ErrorCode::ServerError);
        assert!(!err.message.contains("disk"));
    }

    #[test]
    fn test_document_errors_are_distinct() {
        let codes: Vec<ErrorCode> = vec![
            DocumentError::InvalidVersion {
                current: "1".into(),
                proposed: "3".into(),
            }
            .into(),
            DocumentError::InvalidUpdated {
                current: "a".into(),
                proposed: "b".into(),
            }
            .into(),
            DocumentError::ContextMismatch.into(),
            DocumentError::IdMismatch {
                current: "a".into(),
                proposed: "b".into(),
            }
            .into(),
            DocumentError::ControllerMismatch {
                current: "a".into(),
                proposed: "b".into(),
            }
            .into(),
            DocumentError::CreatedMismatch.into(),
            DocumentError::DeactivatedMismatch.into(),
        ]
        .into_iter()
        .map(|e: TasError| e.code)
        .collect();

        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn test_ecdh_codes() {
        let err: TasError = EcdhError::NoMatchingCipher.into();
        assert_eq!(err.code.as_str(), "NO_MATCHING_CIPHER_TYPE");
        let err: TasError = EcdhError::CoreError(CoreError::InvalidProofPurpose("x".into())).into();
        assert_eq!(err.code, ErrorCode::InvalidProofPurpose);
    }
}
