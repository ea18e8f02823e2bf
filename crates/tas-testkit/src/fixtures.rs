//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use chrono::{Duration, SecondsFormat};
use uuid::Uuid;

use tas::{
    OpenedToken, ServerTokenPresentation, ServerTokenSeed, TasConfig, TokenBearer, TrustAnchor,
};
use tas_core::document::DID_CONTEXT_V1;
use tas_core::{
    sign_proofs, Did, DidAuth, DidDocument, KeyRing, KeySigner, Proof, ProofPurpose, PublicKey,
    ServerTokenPurpose, TransactionType, VerificationMethod,
};
use tas_ecdh::{ClientSession, EcdhClient, EcdhRequest};
use tas_registry::MemoryRegistry;
use tas_store::{MemoryStore, Store};

/// `created` of every fixture document.
pub const GENESIS: &str = "2024-01-01T00:00:00Z";

/// App id bound into fixture server tokens.
pub const TEST_APP_ID: &str = "AID-0001";

/// Wallet id bound into fixture server tokens.
pub const TEST_WALLET_ID: &str = "WID-0001";

/// A DID holder with one key per verification relationship.
#[derive(Debug, Clone)]
pub struct Identity {
    pub did: Did,
    pub keys: KeyRing,
}

impl Identity {
    /// Create an identity with fresh keys.
    pub fn new(did: &str) -> Self {
        Self {
            did: Did::parse(did).expect("fixture DID must be valid"),
            keys: KeyRing::generate(),
        }
    }

    /// The public key used for a relationship.
    pub fn public_key(&self, purpose: ProofPurpose) -> PublicKey {
        self.keys
            .public_key(purpose.key_id())
            .expect("generated key ring holds every purpose")
    }

    /// Version 1 of this identity's document, self-signed for every
    /// relationship.
    pub fn document(&self, controller: &Did) -> DidDocument {
        let mut doc = DidDocument {
            context: vec![DID_CONTEXT_V1.to_string()],
            id: self.did.to_string(),
            controller: controller.to_string(),
            created: GENESIS.into(),
            updated: GENESIS.into(),
            version_id: "1".into(),
            deactivated: false,
            verification_method: vec![],
            assertion_method: vec![],
            authentication: vec![],
            key_agreement: vec![],
            capability_invocation: vec![],
            proofs: vec![],
        };

        for purpose in ProofPurpose::ALL {
            let key_id = purpose.key_id();
            doc.verification_method.push(VerificationMethod::secp256r1(
                key_id,
                &self.did,
                &self.public_key(purpose),
            ));
            let relation = match purpose {
                ProofPurpose::AssertionMethod => &mut doc.assertion_method,
                ProofPurpose::Authentication => &mut doc.authentication,
                ProofPurpose::KeyAgreement => &mut doc.key_agreement,
                ProofPurpose::CapabilityInvocation => &mut doc.capability_invocation,
            };
            relation.push(key_id.to_string());
        }

        self.sign_document(&mut doc);
        doc
    }

    /// Replace the document's proofs with one fresh proof per listed key.
    pub fn sign_document(&self, doc: &mut DidDocument) {
        let created = doc.updated_at().expect("fixture documents carry RFC 3339 timestamps");
        let mut proofs = Vec::new();
        for purpose in ProofPurpose::ALL {
            for key_id in doc.relation(purpose) {
                proofs.push(Proof::created_at(&self.did.key_url(key_id), purpose, created));
            }
        }
        doc.proofs = proofs;
        sign_proofs(doc, &self.keys).expect("fixture keys sign every relation");
    }

    /// The direct successor of `current`: next version, one day later.
    pub fn next_version(&self, current: &DidDocument) -> DidDocument {
        let mut doc = current.without_proofs();
        let version = current.version().expect("fixture version is numeric");
        let updated = current.updated_at().expect("fixture timestamps parse") + Duration::days(1);

        doc.version_id = (version + 1).to_string();
        doc.updated = updated.to_rfc3339_opts(SecondsFormat::Secs, true);
        self.sign_document(&mut doc);
        doc
    }

    /// Answer a transaction's auth nonce with this identity's `#auth` key.
    pub fn did_auth(&self, auth_nonce: &str) -> DidAuth {
        let mut auth = DidAuth::new(&self.did, auth_nonce);
        sign_proofs(&mut auth, &self.keys).expect("fixture keys hold an auth key");
        auth
    }

    /// Start a key agreement as this identity.
    pub fn ecdh_client(&self) -> EcdhClient {
        EcdhClient::new(self.did.clone())
    }

    /// Build a signed key agreement request.
    pub fn ecdh_request(&self, client: &EcdhClient) -> EcdhRequest {
        client
            .request(&self.keys)
            .expect("fixture keys sign key agreement requests")
    }
}

/// A client's view of a transaction that has reached its action step.
#[derive(Debug, Clone)]
pub struct Session {
    pub tx_id: Uuid,
    pub auth_nonce: String,
    pub ecdh: ClientSession,
    pub seed: ServerTokenSeed,
    pub token: OpenedToken,
    pub presentation: ServerTokenPresentation,
    /// The presentation as the fixture app and wallet.
    pub bearer: TokenBearer,
}

/// A service wired to an in-memory registry that knows the service's own
/// document.
pub struct TestAnchor<S: Store = MemoryStore> {
    pub tas: Identity,
    pub registry: Arc<MemoryRegistry>,
    pub anchor: TrustAnchor<S>,
}

impl TestAnchor<MemoryStore> {
    pub fn new() -> Self {
        Self::with_config(TasConfig::default())
    }

    pub fn with_config(config: TasConfig) -> Self {
        Self::with_store(config, MemoryStore::new())
    }
}

impl Default for TestAnchor<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Store> TestAnchor<S> {
    /// Build the fixture over any store.
    pub fn with_store(config: TasConfig, store: S) -> Self {
        let tas = Identity::new(&config.tas_did);
        let registry = Arc::new(
            MemoryRegistry::new()
                .with_controller_key(tas.public_key(ProofPurpose::CapabilityInvocation)),
        );
        registry
            .insert_document(tas.document(&tas.did))
            .expect("fresh registry accepts the service document");

        let anchor = TrustAnchor::new(
            config,
            Arc::new(store),
            registry.clone(),
            Arc::new(tas.keys.clone()),
        )
        .expect("fixture config is valid");

        Self {
            tas,
            registry,
            anchor,
        }
    }

    /// Seed an identity's document straight into the registry.
    pub fn enroll(&self, identity: &Identity) -> DidDocument {
        let doc = identity.document(&self.tas.did);
        self.registry
            .insert_document(doc.clone())
            .expect("memory registry accepts seeded documents");
        doc
    }

    /// Run key agreement for a proposed transaction.
    pub async fn negotiate(&self, client: &Identity, tx_id: &Uuid) -> tas::Result<ClientSession> {
        let ecdh = client.ecdh_client();
        let request = client.ecdh_request(&ecdh);
        let ack = self.anchor.request_ecdh(tx_id, &request).await?;
        Ok(ecdh.complete(&ack, &self.tas.public_key(ProofPurpose::KeyAgreement))?)
    }

    /// Propose, negotiate and mint a token, leaving the transaction at its
    /// action step.
    pub async fn open_session(
        &self,
        client: &Identity,
        tx_type: TransactionType,
        purpose: ServerTokenPurpose,
    ) -> tas::Result<Session> {
        let proposal = self.anchor.propose(tx_type).await?;
        let ecdh = self.negotiate(client, &proposal.tx_id).await?;

        let seed = ServerTokenSeed {
            purpose,
            wallet_id: TEST_WALLET_ID.into(),
            app_id: TEST_APP_ID.into(),
        };
        let minted = self
            .anchor
            .request_create_token(&proposal.tx_id, &seed)
            .await?;
        let token = minted.open(ecdh.cipher())?;
        let presentation = minted.presentation(&token.token_hash);
        let bearer = TokenBearer::new(presentation.clone(), TEST_APP_ID, TEST_WALLET_ID);

        Ok(Session {
            tx_id: proposal.tx_id,
            auth_nonce: proposal.auth_nonce,
            ecdh,
            seed,
            token,
            presentation,
            bearer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tas_core::{validate_document_update, verify_self_proofs};

    #[test]
    fn test_documents_are_self_signed() {
        let holder = Identity::new("did:omn:holder");
        let doc = holder.document(&Did::parse("did:omn:tas").unwrap());

        assert_eq!(doc.proofs.len(), ProofPurpose::ALL.len());
        verify_self_proofs(&doc).unwrap();
    }

    #[test]
    fn test_next_version_is_a_valid_update() {
        let holder = Identity::new("did:omn:holder");
        let v1 = holder.document(&Did::parse("did:omn:tas").unwrap());
        let v2 = holder.next_version(&v1);

        assert_eq!(v2.version_id, "2");
        validate_document_update(&v1, &v2).unwrap();
        verify_self_proofs(&v2).unwrap();
    }

    #[test]
    fn test_did_auth_verifies_against_document() {
        let holder = Identity::new("did:omn:holder");
        let doc = holder.document(&Did::parse("did:omn:tas").unwrap());
        let auth = holder.did_auth("zNonce");

        tas_core::verify_did_auth(&auth, &doc, "zNonce").unwrap();
    }

    #[test]
    fn test_identities_have_distinct_keys() {
        let a = Identity::new("did:omn:a");
        let b = Identity::new("did:omn:b");
        assert_ne!(
            a.public_key(ProofPurpose::KeyAgreement),
            b.public_key(ProofPurpose::KeyAgreement)
        );
    }

    #[tokio::test]
    async fn test_open_session_reaches_action_step() {
        let fixture = TestAnchor::new();
        let wallet = Identity::new("did:omn:wallet");
        fixture.enroll(&wallet);

        let session = fixture
            .open_session(
                &wallet,
                TransactionType::UserRegistration,
                ServerTokenPurpose::CreateDid,
            )
            .await
            .unwrap();

        let steps = fixture.anchor.steps(&session.tx_id).await.unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(session.token.data.app_id, TEST_APP_ID);
    }
}
