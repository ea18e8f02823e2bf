//! Server side of the key agreement handshake.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tas_core::{
    sign_proofs, verify_proof, Did, DidKeyUrl, EccCurveType, EcdhRecord, KeySigner, Proof,
    ProofPurpose, Proofed, PublicKey, Sha256Hash, SymmetricCipherType, SymmetricPaddingType,
};

use crate::crypto::{derive_session_key, merge_nonce, EcdhKeyPair, Nonce, SessionKey};
use crate::error::{EcdhError, Result};
use crate::messages::{AckEcdh, EcdhRequest};

/// Server-side cipher policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcdhConfig {
    /// The one cipher the server accepts.
    pub cipher: SymmetricCipherType,
    pub padding: SymmetricPaddingType,
}

impl Default for EcdhConfig {
    fn default() -> Self {
        Self {
            cipher: SymmetricCipherType::Aes256Cbc,
            padding: SymmetricPaddingType::Pkcs5,
        }
    }
}

/// Outcome of a successful negotiation.
#[derive(Debug, Clone)]
pub struct NegotiatedSession {
    pub client_did: Did,
    pub cipher: SymmetricCipherType,
    pub padding: SymmetricPaddingType,
    pub session_key: SessionKey,
    pub merged_nonce: Sha256Hash,
    /// Signed acknowledgment to return to the client.
    pub ack: AckEcdh,
}

impl NegotiatedSession {
    /// The record persisted for the transaction.
    pub fn to_record(&self, transaction_id: i64, now: DateTime<Utc>) -> EcdhRecord {
        EcdhRecord {
            transaction_id,
            client_did: self.client_did.to_string(),
            session_key: self.session_key.to_multibase(),
            merged_nonce: Some(self.merged_nonce.to_multibase()),
            cipher: self.cipher,
            padding: self.padding,
            created_at: now,
        }
    }
}

/// Negotiates session keys with clients.
#[derive(Debug, Clone, Default)]
pub struct KeyAgreement {
    config: EcdhConfig,
}

impl KeyAgreement {
    pub fn new(config: EcdhConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EcdhConfig {
        &self.config
    }

    /// Syntactic checks on the client's proof.
    ///
    /// Returns the key URL whose public key must be resolved to verify the
    /// request signature.
    pub fn client_key_url(request: &EcdhRequest) -> Result<DidKeyUrl> {
        let client = Did::parse(&request.client)?;
        let proof = request.proof()?;
        let url = proof.key_url()?;

        if url.did() != &client {
            return Err(EcdhError::SignerMismatch {
                claimed: client.to_string(),
                signer: url.did().to_string(),
            });
        }

        let purpose = proof.purpose()?;
        if purpose != ProofPurpose::KeyAgreement {
            return Err(EcdhError::InvalidProofPurpose(purpose.to_string()));
        }

        Ok(url)
    }

    /// Pick the session cipher.
    ///
    /// Without candidates the server default is used; otherwise the server
    /// cipher must be among them.
    pub fn negotiate_cipher(
        &self,
        candidates: Option<&[SymmetricCipherType]>,
    ) -> Result<SymmetricCipherType> {
        match candidates {
            None => Ok(self.config.cipher),
            Some(list) if list.contains(&self.config.cipher) => Ok(self.config.cipher),
            Some(_) => Err(EcdhError::NoMatchingCipher),
        }
    }

    /// Run the server side of the handshake.
    ///
    /// `client_keyagree_key` is the key published under the request proof's
    /// key URL in the client's DID document.
    pub fn negotiate(
        &self,
        request: &EcdhRequest,
        client_keyagree_key: &PublicKey,
        signer: &dyn KeySigner,
        server_did: &Did,
    ) -> Result<NegotiatedSession> {
        // 1. Client proof
        let url = Self::client_key_url(request)?;
        verify_proof(request, client_keyagree_key)?;

        // 2. Client nonce
        let client_nonce = Nonce::from_multibase(&request.client_nonce)?;

        // 3. Server key pair on the requested curve
        let curve: EccCurveType = request
            .curve
            .parse()
            .map_err(|_| EcdhError::UnsupportedCurve(request.curve.clone()))?;
        let client_public =
            PublicKey::from_multibase(&request.public_key).map_err(|_| EcdhError::InvalidPublicKey)?;
        let server_keys = EcdhKeyPair::generate(curve);

        // 4. Cipher and padding
        let cipher = self.negotiate_cipher(request.candidate.as_deref())?;
        let padding = self.config.padding;

        // 5. Server nonce
        let server_nonce = Nonce::generate();
        let merged_nonce = merge_nonce(&client_nonce, &server_nonce);

        // 6. Session key
        let shared = server_keys.diffie_hellman(&client_public)?;
        let session_key = derive_session_key(&shared, &merged_nonce, cipher);

        // 7. Signed acknowledgment
        let purpose = ProofPurpose::KeyAgreement;
        let mut ack = AckEcdh {
            server: server_did.to_string(),
            server_nonce: server_nonce.to_multibase(),
            public_key: server_keys.public_key().to_multibase(),
            cipher,
            padding,
            proof: Some(Proof::new(&server_did.key_url(purpose.key_id()), purpose)),
        };
        sign_proofs(&mut ack, signer)?;

        debug!(client = %url.did(), %cipher, %padding, "key agreement negotiated");

        Ok(NegotiatedSession {
            client_did: url.did().clone(),
            cipher,
            padding,
            session_key,
            merged_nonce,
            ack,
        })
    }
}
