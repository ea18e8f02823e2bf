//! DID documents and the invocation envelope used to register them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::PublicKey;
use crate::did::{Did, DidKeyUrl};
use crate::error::{CoreError, DocumentError};
use crate::multibase;
use crate::proof::{Proof, ProofPurpose, Proofed};

/// Default JSON-LD context for DID documents.
pub const DID_CONTEXT_V1: &str = "https://www.w3.org/ns/did/v1";

/// Verification method key type for secp256r1.
pub const SECP256R1_KEY_TYPE: &str = "Secp256r1VerificationKey2018";

/// A public key published in a DID document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// Key id, the fragment of the key URL (e.g. `assert`).
    pub id: String,
    #[serde(rename = "type")]
    pub key_type: String,
    pub controller: String,
    pub public_key_multibase: String,
    /// Authentication type flags required to use the key.
    #[serde(default)]
    pub auth_type: u32,
}

impl VerificationMethod {
    /// Create a secp256r1 verification method.
    pub fn secp256r1(id: &str, controller: &Did, public_key: &PublicKey) -> Self {
        Self {
            id: id.to_string(),
            key_type: SECP256R1_KEY_TYPE.to_string(),
            controller: controller.to_string(),
            public_key_multibase: public_key.to_multibase(),
            auth_type: 1,
        }
    }

    /// Decode the published key.
    pub fn public_key(&self) -> Result<PublicKey, CoreError> {
        PublicKey::from_multibase(&self.public_key_multibase)
    }
}

/// A versioned DID document.
///
/// Documents are never edited in place: an update is a whole new document
/// whose `versionId` is exactly one higher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    pub id: String,
    pub controller: String,
    pub created: String,
    pub updated: String,
    pub version_id: String,
    pub deactivated: bool,
    pub verification_method: Vec<VerificationMethod>,
    #[serde(default)]
    pub assertion_method: Vec<String>,
    #[serde(default)]
    pub authentication: Vec<String>,
    #[serde(default)]
    pub key_agreement: Vec<String>,
    #[serde(default)]
    pub capability_invocation: Vec<String>,
    #[serde(default, rename = "proof", skip_serializing_if = "Vec::is_empty")]
    pub proofs: Vec<Proof>,
}

impl DidDocument {
    /// The document's DID.
    pub fn did(&self) -> Result<Did, CoreError> {
        Did::parse(&self.id)
    }

    /// Parse the version id.
    pub fn version(&self) -> Result<u64, DocumentError> {
        self.version_id.parse::<u64>().map_err(|_| {
            DocumentError::StructuralError(format!("versionId '{}' is not an integer", self.version_id))
        })
    }

    /// Parse the `created` timestamp.
    pub fn created_at(&self) -> Result<DateTime<Utc>, DocumentError> {
        parse_timestamp(&self.created)
    }

    /// Parse the `updated` timestamp.
    pub fn updated_at(&self) -> Result<DateTime<Utc>, DocumentError> {
        parse_timestamp(&self.updated)
    }

    /// Find a verification method by key id.
    pub fn verification_method(&self, key_id: &str) -> Option<&VerificationMethod> {
        self.verification_method.iter().find(|vm| vm.id == key_id)
    }

    /// The key ids listed under a verification relationship.
    pub fn relation(&self, purpose: ProofPurpose) -> &[String] {
        match purpose {
            ProofPurpose::AssertionMethod => &self.assertion_method,
            ProofPurpose::Authentication => &self.authentication,
            ProofPurpose::KeyAgreement => &self.key_agreement,
            ProofPurpose::CapabilityInvocation => &self.capability_invocation,
        }
    }

    /// Resolve the public key bound to a key URL inside this document.
    pub fn public_key_for(&self, url: &DidKeyUrl) -> Result<PublicKey, CoreError> {
        if url.did().as_str() != self.id {
            return Err(CoreError::SignerMismatch {
                signer: url.did().to_string(),
                expected: self.id.clone(),
            });
        }
        self.verification_method(url.key_id())
            .ok_or_else(|| CoreError::VerificationMethodNotFound(url.to_string()))?
            .public_key()
    }

    /// Resolve the public key for a purpose by the fixed key-id convention.
    pub fn public_key_for_purpose(&self, purpose: ProofPurpose) -> Result<PublicKey, CoreError> {
        let vm = self
            .verification_method(purpose.key_id())
            .ok_or_else(|| CoreError::VerificationMethodNotFound(format!("{}#{}", self.id, purpose.key_id())))?;
        vm.public_key()
    }

    /// A copy of this document without any embedded proofs.
    pub fn without_proofs(&self) -> Self {
        let mut doc = self.clone();
        doc.proofs.clear();
        doc
    }
}

impl Proofed for DidDocument {
    fn proofs_mut(&mut self) -> Vec<&mut Proof> {
        self.proofs.iter_mut().collect()
    }

    fn proofs(&self) -> Vec<&Proof> {
        self.proofs.iter().collect()
    }
}

/// Parse an RFC 3339 timestamp.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DocumentError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| DocumentError::InvalidTimestamp(s.to_string()))
}

/// The party countersigning an invoked document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub did: String,
    pub cert_vc_ref: String,
}

/// A DID document wrapped in a controller's capability-invocation proof.
///
/// This is what the registry receives: the controller (the TAS) vouches for
/// the encoded document with its `#invoke` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokedDidDoc {
    /// Multibase-encoded JSON of the document, own proofs stripped.
    pub did_doc: String,
    pub proof: Option<Proof>,
    pub controller: Provider,
    /// Multibase-encoded 16-byte nonce.
    pub nonce: String,
}

crate::impl_single_proof!(InvokedDidDoc);

impl InvokedDidDoc {
    /// Decode the wrapped document.
    pub fn decode_document(&self) -> Result<DidDocument, CoreError> {
        let bytes = multibase::decode(&self.did_doc)?;
        serde_json::from_slice(&bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }
}

/// A DID holder's answer to a transaction's auth nonce.
///
/// Signed with an `authentication` key of the DID's current document, it
/// shows the caller controls the DID a step acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidAuth {
    pub did: String,
    /// The nonce handed out at propose time, echoed back.
    pub auth_nonce: String,
    pub proof: Option<Proof>,
}

crate::impl_single_proof!(DidAuth);

impl DidAuth {
    /// An unsigned answer with a proof slot for `<did>#auth`.
    pub fn new(did: &Did, auth_nonce: &str) -> Self {
        let purpose = ProofPurpose::Authentication;
        Self {
            did: did.to_string(),
            auth_nonce: auth_nonce.to_string(),
            proof: Some(Proof::new(&did.key_url(purpose.key_id()), purpose)),
        }
    }
}
