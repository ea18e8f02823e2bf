//! Client side of the key agreement handshake.
//!
//! Wallets and client apps build their request with [`EcdhClient`] and turn
//! the server's [`AckEcdh`] into a [`ClientSession`] that derives the same
//! session key.

use tas_core::{
    sign_proofs, verify_proof, Did, EccCurveType, KeySigner, Proof, ProofPurpose, Proofed,
    PublicKey, SymmetricCipherType,
};

use crate::cipher::SessionCipher;
use crate::crypto::{derive_session_key, merge_nonce, EcdhKeyPair, Nonce, SessionKey};
use crate::error::{EcdhError, Result};
use crate::messages::{AckEcdh, EcdhRequest};

/// One pending key agreement from the client's point of view.
#[derive(Debug)]
pub struct EcdhClient {
    did: Did,
    keys: EcdhKeyPair,
    nonce: Nonce,
    candidates: Option<Vec<SymmetricCipherType>>,
}

impl EcdhClient {
    /// Start a key agreement with a fresh ephemeral key and nonce.
    pub fn new(did: Did) -> Self {
        Self {
            did,
            keys: EcdhKeyPair::generate(EccCurveType::Secp256r1),
            nonce: Nonce::generate(),
            candidates: None,
        }
    }

    /// Restrict the ciphers the client will accept.
    pub fn with_candidates(mut self, candidates: Vec<SymmetricCipherType>) -> Self {
        self.candidates = Some(candidates);
        self
    }

    pub fn did(&self) -> &Did {
        &self.did
    }

    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    /// Build the request, signed with the client's `#keyagree` key.
    pub fn request(&self, signer: &dyn KeySigner) -> Result<EcdhRequest> {
        let purpose = ProofPurpose::KeyAgreement;
        let mut request = EcdhRequest {
            client: self.did.to_string(),
            client_nonce: self.nonce.to_multibase(),
            curve: EccCurveType::Secp256r1.to_string(),
            public_key: self.keys.public_key().to_multibase(),
            candidate: self.candidates.clone(),
            proof: Some(Proof::new(&self.did.key_url(purpose.key_id()), purpose)),
        };
        sign_proofs(&mut request, signer)?;
        Ok(request)
    }

    /// Verify the server's acknowledgment and derive the session.
    ///
    /// `server_keyagree_key` is the key published under the ack proof's key
    /// URL in the server's DID document.
    pub fn complete(&self, ack: &AckEcdh, server_keyagree_key: &PublicKey) -> Result<ClientSession> {
        let proof = ack.proof()?;
        let url = proof.key_url()?;
        if url.did().as_str() != ack.server {
            return Err(EcdhError::SignerMismatch {
                claimed: ack.server.clone(),
                signer: url.did().to_string(),
            });
        }
        let purpose = proof.purpose()?;
        if purpose != ProofPurpose::KeyAgreement {
            return Err(EcdhError::InvalidProofPurpose(purpose.to_string()));
        }
        verify_proof(ack, server_keyagree_key)?;

        if let Some(candidates) = &self.candidates {
            if !candidates.contains(&ack.cipher) {
                return Err(EcdhError::NoMatchingCipher);
            }
        }

        let server_nonce = Nonce::from_multibase(&ack.server_nonce)?;
        let server_public =
            PublicKey::from_multibase(&ack.public_key).map_err(|_| EcdhError::InvalidPublicKey)?;
        let merged = merge_nonce(&self.nonce, &server_nonce);
        let shared = self.keys.diffie_hellman(&server_public)?;
        let session_key = derive_session_key(&shared, &merged, ack.cipher);

        Ok(ClientSession {
            server_did: ack.server.clone(),
            cipher: SessionCipher::new(ack.cipher, ack.padding, session_key.clone())?,
            session_key,
        })
    }
}

/// An established session on the client.
#[derive(Debug, Clone)]
pub struct ClientSession {
    server_did: String,
    session_key: SessionKey,
    cipher: SessionCipher,
}

impl ClientSession {
    pub fn server_did(&self) -> &str {
        &self.server_did
    }

    pub fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    pub fn cipher(&self) -> &SessionCipher {
        &self.cipher
    }

    pub fn encrypt(&self, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        self.cipher.encrypt(iv, plaintext)
    }

    pub fn decrypt(&self, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.cipher.decrypt(iv, ciphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agreement::KeyAgreement;
    use crate::cipher::generate_iv;
    use tas_core::KeyRing;

    #[test]
    fn test_request_shape() {
        let ring = KeyRing::generate();
        let client = EcdhClient::new(Did::parse("did:omn:wallet").unwrap());
        let request = client.request(&ring).unwrap();

        assert_eq!(request.curve, "Secp256r1");
        assert!(request.candidate.is_none());
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("clientNonce").is_some());
        assert!(json.get("candidate").is_none());
        verify_proof(&request, &ring.public_key("keyagree").unwrap()).unwrap();
    }

    #[test]
    fn test_sessions_interoperate() {
        let server_ring = KeyRing::generate();
        let client_ring = KeyRing::generate();
        let server_did = Did::parse("did:omn:tas").unwrap();
        let client = EcdhClient::new(Did::parse("did:omn:wallet").unwrap())
            .with_candidates(vec![SymmetricCipherType::Aes256Cbc]);

        let request = client.request(&client_ring).unwrap();
        let negotiated = KeyAgreement::default()
            .negotiate(
                &request,
                &client_ring.public_key("keyagree").unwrap(),
                &server_ring,
                &server_did,
            )
            .unwrap();
        let session = client
            .complete(
                &negotiated.ack,
                &server_ring.public_key("keyagree").unwrap(),
            )
            .unwrap();

        let server_cipher =
            SessionCipher::new(negotiated.cipher, negotiated.padding, negotiated.session_key)
                .unwrap();
        let iv = generate_iv();
        let ct = server_cipher.encrypt(&iv, b"server token payload").unwrap();
        assert_eq!(session.decrypt(&iv, &ct).unwrap(), b"server token payload");
    }

    #[test]
    fn test_forged_ack_rejected() {
        let server_ring = KeyRing::generate();
        let client_ring = KeyRing::generate();
        let server_did = Did::parse("did:omn:tas").unwrap();
        let client = EcdhClient::new(Did::parse("did:omn:wallet").unwrap());

        let request = client.request(&client_ring).unwrap();
        let mut negotiated = KeyAgreement::default()
            .negotiate(
                &request,
                &client_ring.public_key("keyagree").unwrap(),
                &server_ring,
                &server_did,
            )
            .unwrap();
        // A man in the middle swaps the server key
        negotiated.ack.public_key = EcdhKeyPair::generate(EccCurveType::Secp256r1)
            .public_key()
            .to_multibase();

        assert!(client
            .complete(
                &negotiated.ack,
                &server_ring.public_key("keyagree").unwrap()
            )
            .is_err());
    }
}
