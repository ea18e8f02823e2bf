//! Signing and verifying proof-bearing payloads.
//!
//! Every signature in the system is an ECDSA/secp256r1 signature over
//! [`signing_message`] of the payload. Key material sits behind the
//! [`KeySigner`] trait so a host can back it with an HSM or wallet file.

use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::{HashMap, HashSet};

use crate::canonical::{canonical_bytes, signing_message};
use crate::crypto::{Keypair, PublicKey, Signature};
use crate::did::{Did, DidKeyUrl};
use crate::document::{DidAuth, DidDocument, InvokedDidDoc, Provider};
use crate::error::CoreError;
use crate::multibase;
use crate::proof::{Proof, ProofPurpose, Proofed};

/// Length of invocation and protocol nonces.
pub const NONCE_LEN: usize = 16;

/// Source of named signing keys.
pub trait KeySigner: Send + Sync {
    /// Public key for a key id (`assert`, `auth`, `keyagree`, `invoke`).
    fn public_key(&self, key_id: &str) -> Result<PublicKey, CoreError>;

    /// Sign a message with the named key.
    fn sign(&self, key_id: &str, message: &[u8]) -> Result<Signature, CoreError>;
}

/// In-process key ring holding one keypair per key id.
#[derive(Debug, Clone, Default)]
pub struct KeyRing {
    keys: HashMap<String, Keypair>,
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ring with a fresh key for every proof purpose.
    pub fn generate() -> Self {
        let mut ring = Self::new();
        for purpose in ProofPurpose::ALL {
            ring.insert(purpose.key_id(), Keypair::generate());
        }
        ring
    }

    /// Add or replace a key.
    pub fn insert(&mut self, key_id: &str, keypair: Keypair) {
        self.keys.insert(key_id.to_string(), keypair);
    }

    /// Builder-style [`KeyRing::insert`].
    pub fn with_key(mut self, key_id: &str, keypair: Keypair) -> Self {
        self.insert(key_id, keypair);
        self
    }

    pub fn keypair(&self, key_id: &str) -> Option<&Keypair> {
        self.keys.get(key_id)
    }

    fn lookup(&self, key_id: &str) -> Result<&Keypair, CoreError> {
        self.keys
            .get(key_id)
            .ok_or_else(|| CoreError::UnknownKey(key_id.to_string()))
    }
}

impl KeySigner for KeyRing {
    fn public_key(&self, key_id: &str) -> Result<PublicKey, CoreError> {
        Ok(self.lookup(key_id)?.public_key())
    }

    fn sign(&self, key_id: &str, message: &[u8]) -> Result<Signature, CoreError> {
        self.lookup(key_id)?.sign(message)
    }
}

/// Sign a raw message with a named key.
pub fn sign(signer: &dyn KeySigner, key_id: &str, message: &[u8]) -> Result<Signature, CoreError> {
    signer.sign(key_id, message)
}

/// Verify a raw signature.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> Result<(), CoreError> {
    public_key.verify(message, signature)
}

/// Fill in `proofValue` for every proof embedded in `value`.
///
/// Each proof is signed with the key named by its verification method's
/// fragment. All proofs sign the same message, since proof values are
/// stripped before hashing.
pub fn sign_proofs<T: Proofed>(value: &mut T, signer: &dyn KeySigner) -> Result<(), CoreError> {
    if value.proofs().is_empty() {
        return Err(CoreError::MissingProof);
    }

    let message = signing_message(value)?;
    for proof in value.proofs_mut() {
        let url = proof.key_url()?;
        let signature = signer.sign(url.key_id(), message.as_bytes())?;
        proof.proof_value = Some(signature.to_multibase());
    }
    Ok(())
}

/// Verify the single proof of a one-proof payload.
pub fn verify_proof<T: Proofed>(value: &T, public_key: &PublicKey) -> Result<(), CoreError> {
    let proof = value.proof()?;
    let message = signing_message(value)?;
    verify_embedded(proof, message.as_bytes(), public_key)
}

fn verify_embedded(proof: &Proof, message: &[u8], public_key: &PublicKey) -> Result<(), CoreError> {
    let value = proof
        .proof_value
        .as_deref()
        .ok_or(CoreError::MissingProofValue)?;
    let signature = Signature::from_multibase(value).map_err(|_| CoreError::InvalidSignature)?;
    public_key.verify(message, &signature)
}

/// Generate a random 16-byte nonce, multibase-encoded.
pub fn generate_nonce() -> String {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    multibase::encode(&nonce)
}

/// Wrap `target` in an invocation envelope signed by the controller.
///
/// The target's own proofs are removed before encoding. The envelope is
/// signed with the controller's `#invoke` key and the signature is verified
/// again before returning, so a misconfigured signer fails here.
pub fn sign_invoked_document(
    target: &DidDocument,
    signer: &dyn KeySigner,
    controller: &Did,
    cert_vc_ref: &str,
) -> Result<InvokedDidDoc, CoreError> {
    let purpose = ProofPurpose::CapabilityInvocation;
    let encoded = canonical_bytes(&target.without_proofs())?;

    let mut envelope = InvokedDidDoc {
        did_doc: multibase::encode(&encoded),
        proof: Some(Proof::new(&controller.key_url(purpose.key_id()), purpose)),
        controller: Provider {
            did: controller.to_string(),
            cert_vc_ref: cert_vc_ref.to_string(),
        },
        nonce: generate_nonce(),
    };
    sign_proofs(&mut envelope, signer)?;

    let public_key = signer.public_key(purpose.key_id())?;
    verify_proof(&envelope, &public_key)?;

    Ok(envelope)
}

/// Verify a document's proofs against its own published keys, for every
/// verification relationship.
pub fn verify_self_proofs(doc: &DidDocument) -> Result<(), CoreError> {
    verify_self_proofs_for(doc, &ProofPurpose::ALL)
}

/// Verify a document's proofs against its own published keys for the given
/// relationships.
///
/// Every key listed under a requested relationship must carry a proof with
/// that purpose, signed by the same document's DID, that verifies against
/// the key the document publishes. Proofs for relationships outside
/// `purposes` are ignored.
pub fn verify_self_proofs_for(doc: &DidDocument, purposes: &[ProofPurpose]) -> Result<(), CoreError> {
    let did = doc.did()?;
    let message = signing_message(doc)?;
    let mut proven: HashSet<(ProofPurpose, String)> = HashSet::new();

    for proof in doc.proofs.iter() {
        let url = proof.key_url()?;
        if url.did() != &did {
            return Err(CoreError::SignerMismatch {
                signer: url.did().to_string(),
                expected: did.to_string(),
            });
        }

        let purpose = proof.purpose()?;
        if !purposes.contains(&purpose) {
            continue;
        }
        if !doc.relation(purpose).iter().any(|k| k == url.key_id()) {
            return Err(CoreError::InvalidProofPurpose(format!(
                "{} is not listed under {}",
                url, purpose
            )));
        }

        let public_key = doc.public_key_for(&url)?;
        verify_embedded(proof, message.as_bytes(), &public_key)?;
        proven.insert((purpose, url.key_id().to_string()));
    }

    for purpose in purposes {
        for key_id in doc.relation(*purpose) {
            if !proven.contains(&(*purpose, key_id.clone())) {
                return Err(CoreError::UnprovenKey(format!("{}#{}", did, key_id)));
            }
        }
    }
    Ok(())
}

/// Verify a DID-auth answer against the DID's current document.
///
/// The answer must name `current`, echo `auth_nonce`, and carry an
/// `authentication` proof by a key `current` lists under that relation.
pub fn verify_did_auth(auth: &DidAuth, current: &DidDocument, auth_nonce: &str) -> Result<(), CoreError> {
    if auth.did != current.id {
        return Err(CoreError::SignerMismatch {
            signer: auth.did.clone(),
            expected: current.id.clone(),
        });
    }
    if auth.auth_nonce != auth_nonce {
        return Err(CoreError::AuthNonceMismatch);
    }

    let proof = auth.proof()?;
    let purpose = proof.purpose()?;
    if purpose != ProofPurpose::Authentication {
        return Err(CoreError::InvalidProofPurpose(purpose.to_string()));
    }
    let url = proof.key_url()?;
    if !current.relation(purpose).iter().any(|k| k == url.key_id()) {
        return Err(CoreError::InvalidProofPurpose(format!(
            "{} is not listed under {}",
            url, purpose
        )));
    }

    let public_key = current.public_key_for(&url)?;
    verify_proof(auth, &public_key)
}

/// Map a proof purpose to the key URL that must sign for it.
pub fn resolve_verification_method_id(doc: &DidDocument, purpose: &str) -> Result<DidKeyUrl, CoreError> {
    let purpose: ProofPurpose = purpose.parse()?;
    Ok(doc.did()?.key_url(purpose.key_id()))
}
