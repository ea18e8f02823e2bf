//! Embedded proofs and the `Proofed` abstraction.
//!
//! Every signed payload in the system carries one or more [`Proof`]s. The
//! [`Proofed`] trait exposes them so stripping, hashing, signing, and
//! verifying are written once for all payload types.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::did::DidKeyUrl;
use crate::error::CoreError;

/// Signature suite identifier for secp256r1 proofs.
pub const SECP256R1_PROOF_TYPE: &str = "Secp256r1Signature2018";

/// The intended use of a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProofPurpose {
    AssertionMethod,
    Authentication,
    KeyAgreement,
    CapabilityInvocation,
}

impl ProofPurpose {
    /// All purposes, in relation order.
    pub const ALL: [ProofPurpose; 4] = [
        ProofPurpose::AssertionMethod,
        ProofPurpose::Authentication,
        ProofPurpose::KeyAgreement,
        ProofPurpose::CapabilityInvocation,
    ];

    /// The verification method fragment this purpose is bound to.
    pub const fn key_id(&self) -> &'static str {
        match self {
            ProofPurpose::AssertionMethod => "assert",
            ProofPurpose::Authentication => "auth",
            ProofPurpose::KeyAgreement => "keyagree",
            ProofPurpose::CapabilityInvocation => "invoke",
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            ProofPurpose::AssertionMethod => "assertionMethod",
            ProofPurpose::Authentication => "authentication",
            ProofPurpose::KeyAgreement => "keyAgreement",
            ProofPurpose::CapabilityInvocation => "capabilityInvocation",
        }
    }
}

impl fmt::Display for ProofPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProofPurpose {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProofPurpose::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| CoreError::InvalidProofPurpose(s.to_string()))
    }
}

/// A detached-value proof embedded in a signed payload.
///
/// `proof_value` is absent until the payload is signed and is never part of
/// the signed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    #[serde(rename = "type")]
    pub proof_type: String,
    pub created: String,
    pub verification_method: String,
    pub proof_purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_value: Option<String>,
}

impl Proof {
    /// Create an unsigned proof for the given key URL and purpose.
    pub fn new(verification_method: &DidKeyUrl, purpose: ProofPurpose) -> Self {
        Self::created_at(verification_method, purpose, Utc::now())
    }

    /// Create an unsigned proof with an explicit creation time.
    pub fn created_at(
        verification_method: &DidKeyUrl,
        purpose: ProofPurpose,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            proof_type: SECP256R1_PROOF_TYPE.to_string(),
            created: created.to_rfc3339_opts(SecondsFormat::Secs, true),
            verification_method: verification_method.to_string(),
            proof_purpose: purpose.as_str().to_string(),
            proof_value: None,
        }
    }

    /// Parse the proof purpose.
    pub fn purpose(&self) -> Result<ProofPurpose, CoreError> {
        self.proof_purpose.parse()
    }

    /// Parse the verification method URL.
    pub fn key_url(&self) -> Result<DidKeyUrl, CoreError> {
        DidKeyUrl::parse(&self.verification_method)
    }

    /// Whether the proof has been signed.
    pub fn is_signed(&self) -> bool {
        self.proof_value.is_some()
    }
}

/// A payload that embeds proofs.
///
/// Implementors hand out mutable access to every embedded proof; the proof
/// codec and signature engine derive everything else from that.
pub trait Proofed: Serialize + Clone {
    /// All embedded proofs, in document order.
    fn proofs_mut(&mut self) -> Vec<&mut Proof>;

    /// All embedded proofs, read-only.
    fn proofs(&self) -> Vec<&Proof>;

    /// The single proof of a one-proof payload.
    fn proof(&self) -> Result<&Proof, CoreError> {
        self.proofs().into_iter().next().ok_or(CoreError::MissingProof)
    }
}

/// Implement [`Proofed`] for a struct with a `proof: Option<Proof>` field.
#[macro_export]
macro_rules! impl_single_proof {
    ($ty:ty) => {
        impl $crate::proof::Proofed for $ty {
            fn proofs_mut(&mut self) -> Vec<&mut $crate::proof::Proof> {
                self.proof.iter_mut().collect()
            }

            fn proofs(&self) -> Vec<&$crate::proof::Proof> {
                self.proof.iter().collect()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purpose_key_ids() {
        assert_eq!(ProofPurpose::AssertionMethod.key_id(), "assert");
        assert_eq!(ProofPurpose::Authentication.key_id(), "auth");
        assert_eq!(ProofPurpose::KeyAgreement.key_id(), "keyagree");
        assert_eq!(ProofPurpose::CapabilityInvocation.key_id(), "invoke");
    }

    #[test]
    fn test_purpose_parse() {
        assert_eq!(
            "keyAgreement".parse::<ProofPurpose>().unwrap(),
            ProofPurpose::KeyAgreement
        );
        assert!(matches!(
            "signing".parse::<ProofPurpose>(),
            Err(CoreError::InvalidProofPurpose(_))
        ));
    }

    #[test]
    fn test_unsigned_proof_omits_value() {
        let url = DidKeyUrl::parse("did:omn:tas#assert").unwrap();
        let proof = Proof::new(&url, ProofPurpose::AssertionMethod);
        let json = serde_json::to_value(&proof).unwrap();

        assert_eq!(json["type"], SECP256R1_PROOF_TYPE);
        assert_eq!(json["proofPurpose"], "assertionMethod");
        assert!(json.get("proofValue").is_none());
    }
}
