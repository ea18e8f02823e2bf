//! # TAS Core
//!
//! Pure primitives for the Trust Anchor Service: identifiers, DID documents,
//! proofs, canonical encoding, and the records every other layer persists.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Proof`] and [`Proofed`] - Embedded proofs on any signed payload
//! - [`DidDocument`] - A versioned DID document
//! - [`InvokedDidDoc`] - A document wrapped in the controller's invocation proof
//! - [`Transaction`] / [`SubTransaction`] - The step-sequenced protocol log
//!
//! ## Signing
//!
//! Every signature covers `SHA-256(canonical_json(payload without proofValue))`.
//! See the [`canonical`] and [`signature`] modules.

pub mod canonical;
pub mod crypto;
pub mod did;
pub mod document;
pub mod error;
pub mod multibase;
pub mod proof;
pub mod records;
pub mod signature;
pub mod validation;

pub use canonical::{canonical_bytes, digest, signing_message, strip_proof};
pub use crypto::{EccCurveType, Keypair, PublicKey, Sha256Hash, Signature};
pub use did::{Did, DidKeyUrl};
pub use document::{DidAuth, DidDocument, InvokedDidDoc, Provider, VerificationMethod};
pub use error::{CoreError, DocumentError};
pub use proof::{Proof, ProofPurpose, Proofed};
pub use records::{
    EcdhRecord, NewSubTransaction, NewTransaction, ServerTokenPurpose, ServerTokenRecord,
    SubTransaction, SubTransactionStatus, SubTransactionType, SymmetricCipherType,
    SymmetricPaddingType, Transaction, TransactionStatus, TransactionType, TransactionUpdate,
    UnknownVariant,
};
pub use signature::{
    generate_nonce, resolve_verification_method_id, sign_invoked_document, sign_proofs,
    verify_did_auth, verify_proof, verify_self_proofs, verify_self_proofs_for, KeyRing, KeySigner,
};
pub use validation::{validate_document_update, validate_new_document};
