//! The TrustAnchor: the protocol surface an orchestrator drives.
//!
//! Every request step follows the same shape. The ledger claims the step
//! before anything else happens, so a concurrent duplicate is turned away
//! without touching the registry. The work then runs against the presented
//! token and, on success, the step is recorded. A step that fails releases
//! its claim and leaves the log untouched, so the client may retry until
//! the transaction expires.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use tas_core::{
    sign_invoked_document, validate_document_update, validate_new_document, verify_did_auth,
    verify_self_proofs, Did, DidAuth, DidDocument, KeySigner, ProofPurpose, ServerTokenRecord,
    SubTransaction, SubTransactionStatus, SubTransactionType, Transaction, TransactionStatus,
    TransactionType, TransactionUpdate,
};
use tas_ecdh::{AckEcdh, EcdhRequest, KeyAgreement};
use tas_registry::{
    CacheRefresher, DidDocStatus, DidDocumentCache, Registry, RoleType, VcMeta, VcStatus,
};
use tas_store::{InsertResult, Store};

use crate::config::TasConfig;
use crate::error::{ErrorCode, Result, TasError};
use crate::ledger::{PendingStep, TransactionLedger};
use crate::token::{
    ensure_binding, MintedToken, ServerTokenPresentation, ServerTokenSeed, ServerTokenService,
    TokenBearer,
};
use crate::workflow::Workflow;

/// Keys the service signs with.
const SIGNING_PURPOSES: [ProofPurpose; 3] = [
    ProofPurpose::AssertionMethod,
    ProofPurpose::KeyAgreement,
    ProofPurpose::CapabilityInvocation,
];

/// Role user documents are anchored with on update.
pub const USER_DOCUMENT_ROLE: RoleType = RoleType::Etc;

/// Answer to a propose request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub tx_id: Uuid,
    /// Multibase 16-byte nonce the client signs in later steps.
    pub auth_nonce: String,
}

/// The Trust Anchor Service.
pub struct TrustAnchor<S: Store> {
    config: TasConfig,
    did: Did,
    store: Arc<S>,
    ledger: TransactionLedger<S>,
    tokens: ServerTokenService<S>,
    agreement: KeyAgreement,
    registry: Arc<dyn Registry>,
    cache: Arc<DidDocumentCache>,
    signer: Arc<dyn KeySigner>,
}

impl<S: Store> TrustAnchor<S> {
    /// Assemble the service.
    ///
    /// Fails if the configured DID is malformed or the signer lacks one of
    /// the `#assert`, `#keyagree` or `#invoke` keys.
    pub fn new(
        config: TasConfig,
        store: Arc<S>,
        registry: Arc<dyn Registry>,
        signer: Arc<dyn KeySigner>,
    ) -> Result<Self> {
        let did = config.did()?;
        for purpose in SIGNING_PURPOSES {
            signer.public_key(purpose.key_id())?;
        }

        let ledger = TransactionLedger::new(store.clone(), config.transaction_ttl());
        let tokens = ServerTokenService::new(
            store.clone(),
            signer.clone(),
            did.clone(),
            config.cert_vc_ref.clone(),
            config.server_token_ttl(),
        );
        let cache = Arc::new(DidDocumentCache::new(registry.clone(), config.cache.ttl()));

        Ok(Self {
            agreement: KeyAgreement::new(config.ecdh),
            config,
            did,
            store,
            ledger,
            tokens,
            registry,
            cache,
            signer,
        })
    }

    pub fn config(&self) -> &TasConfig {
        &self.config
    }

    pub fn did(&self) -> &Did {
        &self.did
    }

    pub fn ledger(&self) -> &TransactionLedger<S> {
        &self.ledger
    }

    pub fn cache(&self) -> &Arc<DidDocumentCache> {
        &self.cache
    }

    /// Start the background cache refresher on the configured interval.
    pub fn start_cache_refresh(&self) -> CacheRefresher {
        self.cache.start(self.config.cache.refresh_interval())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Handshake
    // ─────────────────────────────────────────────────────────────────────────

    /// Open a transaction and record its PROPOSE step.
    pub async fn propose(&self, tx_type: TransactionType) -> Result<Proposal> {
        let transaction = self.ledger.create(tx_type).await?;
        self.ledger
            .append_step(
                transaction.id,
                SubTransactionType::Propose,
                SubTransactionStatus::Success,
            )
            .await?;

        Ok(Proposal {
            tx_id: transaction.tx_id,
            auth_nonce: transaction.auth_nonce,
        })
    }

    /// Negotiate the session key of a transaction.
    ///
    /// The client's `keyAgreement` key is resolved from its DID document.
    /// A transaction negotiates once; a replay fails `TRANSACTION_INVALID`.
    pub async fn request_ecdh(&self, tx_id: &Uuid, request: &EcdhRequest) -> Result<AckEcdh> {
        let pending = self
            .ledger
            .begin(tx_id, SubTransactionType::RequestEcdh)
            .await?;
        let outcome = self.negotiate(&pending, request).await;
        self.ledger.finish(&pending, outcome).await
    }

    /// Mint the transaction's server token.
    pub async fn request_create_token(
        &self,
        tx_id: &Uuid,
        seed: &ServerTokenSeed,
    ) -> Result<MintedToken> {
        let pending = self
            .ledger
            .begin(tx_id, SubTransactionType::RequestCreateToken)
            .await?;
        let outcome = self.mint_token(&pending, seed).await;
        self.ledger.finish(&pending, outcome).await
    }

    /// Check a presented token and its binding without advancing the
    /// transaction.
    pub async fn validate_server_token(
        &self,
        tx_id: &Uuid,
        presentation: &ServerTokenPresentation,
        app_id: &str,
        wallet_id: &str,
    ) -> Result<ServerTokenRecord> {
        let transaction = self.ledger.find(tx_id).await?;
        let record = self.check_token(&transaction, presentation).await?;
        ensure_binding(&record, app_id, wallet_id)?;
        Ok(record)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // DID documents
    // ─────────────────────────────────────────────────────────────────────────

    /// Anchor a new, self-signed DID document under the service's
    /// invocation proof.
    pub async fn request_register_did(
        &self,
        tx_id: &Uuid,
        bearer: &TokenBearer,
        doc: &DidDocument,
        role: RoleType,
    ) -> Result<()> {
        let pending = self
            .ledger
            .begin(tx_id, SubTransactionType::RequestRegisterDid)
            .await?;
        let outcome = self.register_did(&pending, bearer, doc, role).await;
        let did = self.ledger.finish(&pending, outcome).await?;

        info!(%tx_id, %did, %role, "DID document registered");
        Ok(())
    }

    /// Anchor the next version of a registered DID document.
    ///
    /// `auth` must answer the transaction's auth nonce under the `#auth`
    /// key of the version being replaced. The current version is read from
    /// the registry, not the cache, so a stale entry cannot let a version
    /// conflict or a retired key through.
    pub async fn request_update_did(
        &self,
        tx_id: &Uuid,
        bearer: &TokenBearer,
        auth: &DidAuth,
        doc: &DidDocument,
    ) -> Result<()> {
        let pending = self
            .ledger
            .begin(tx_id, SubTransactionType::RequestUpdateDid)
            .await?;
        let outcome = self.update_did(&pending, bearer, auth, doc).await;
        let did = self.ledger.finish(&pending, outcome).await?;

        info!(%tx_id, %did, version = %doc.version_id, "DID document updated");
        Ok(())
    }

    /// Reactivate a deactivated DID.
    ///
    /// `auth` must answer the transaction's auth nonce under the `#auth`
    /// key of the deactivated document.
    pub async fn request_restore_did(
        &self,
        tx_id: &Uuid,
        bearer: &TokenBearer,
        auth: &DidAuth,
        did: &Did,
    ) -> Result<()> {
        let pending = self
            .ledger
            .begin(tx_id, SubTransactionType::RequestRestoreDid)
            .await?;
        let outcome = self.restore_did(&pending, bearer, auth, did).await;
        self.ledger.finish(&pending, outcome).await?;

        info!(%tx_id, %did, "DID restored");
        Ok(())
    }

    /// Resolve a DID document through the cache.
    pub async fn resolve_did(&self, did: &Did) -> Result<Arc<DidDocument>> {
        self.cache.get(did).await.map_err(retrieval_failed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Verifiable credentials
    // ─────────────────────────────────────────────────────────────────────────

    /// Anchor the metadata of a newly issued VC.
    pub async fn request_issue_vc(
        &self,
        tx_id: &Uuid,
        bearer: &TokenBearer,
        meta: &VcMeta,
    ) -> Result<()> {
        let pending = self
            .ledger
            .begin(tx_id, SubTransactionType::RequestIssueVc)
            .await?;
        let outcome = self.issue_vc(&pending, bearer, meta).await;
        self.ledger.finish(&pending, outcome).await?;

        info!(%tx_id, vc = %meta.id, issuer = %meta.issuer, "VC anchored");
        Ok(())
    }

    /// Mark an anchored VC revoked.
    pub async fn request_revoke_vc(
        &self,
        tx_id: &Uuid,
        bearer: &TokenBearer,
        vc_id: &str,
    ) -> Result<()> {
        let pending = self
            .ledger
            .begin(tx_id, SubTransactionType::RequestRevokeVc)
            .await?;
        let outcome = self.revoke_vc(&pending, bearer, vc_id).await;
        self.ledger.finish(&pending, outcome).await?;

        info!(%tx_id, vc = %vc_id, "VC revoked");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Completion
    // ─────────────────────────────────────────────────────────────────────────

    /// Record CONFIRM and complete the transaction.
    pub async fn confirm(&self, tx_id: &Uuid) -> Result<Transaction> {
        self.ledger.advance(tx_id, SubTransactionType::Confirm).await?;

        // Reload: earlier steps may have written the subject DID or VC id
        let mut transaction = self.ledger.find(tx_id).await?;
        self.ledger
            .update_status(&mut transaction, TransactionStatus::Completed)
            .await?;

        info!(%tx_id, tx_type = %transaction.tx_type, "transaction completed");
        Ok(transaction)
    }

    pub async fn transaction(&self, tx_id: &Uuid) -> Result<Transaction> {
        self.ledger.find(tx_id).await
    }

    /// The recorded steps of a transaction, in order.
    pub async fn steps(&self, tx_id: &Uuid) -> Result<Vec<SubTransaction>> {
        let transaction = self.ledger.find(tx_id).await?;
        self.ledger.steps(transaction.id).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Step bodies
    //
    // Each runs between a claimed `begin` and `finish`, so only one request
    // per step gets here.
    // ─────────────────────────────────────────────────────────────────────────

    async fn negotiate(&self, pending: &PendingStep, request: &EcdhRequest) -> Result<AckEcdh> {
        let tx_id = pending.transaction.tx_id;
        let url = KeyAgreement::client_key_url(request)?;
        let doc = match url.version_id() {
            Some(_) => Arc::new(
                self.registry
                    .find_did_doc_by_key_url(&url)
                    .await
                    .map_err(retrieval_failed)?,
            ),
            None => self.resolve_did(url.did()).await?,
        };
        if !doc
            .relation(ProofPurpose::KeyAgreement)
            .iter()
            .any(|k| k == url.key_id())
        {
            return Err(TasError::new(
                ErrorCode::InvalidProofPurpose,
                format!("{url} is not a keyAgreement key"),
            ));
        }
        let client_key = doc.public_key_for(&url)?;

        let session =
            self.agreement
                .negotiate(request, &client_key, self.signer.as_ref(), &self.did)?;
        let record = session.to_record(pending.transaction.id, Utc::now());
        if let InsertResult::Conflict { .. } = self.store.insert_ecdh(&record).await? {
            return Err(TasError::new(
                ErrorCode::TransactionInvalid,
                format!("transaction {tx_id} already negotiated"),
            ));
        }

        info!(%tx_id, client = %session.client_did, cipher = %session.cipher, "key agreement complete");
        Ok(session.ack)
    }

    async fn mint_token(&self, pending: &PendingStep, seed: &ServerTokenSeed) -> Result<MintedToken> {
        let tx_type = pending.transaction.tx_type;
        if !Workflow::of(tx_type).allows_purpose(seed.purpose) {
            return Err(TasError::new(
                ErrorCode::UnsupportedServerTokenPurpose,
                format!("{} cannot be minted for {tx_type}", seed.purpose),
            ));
        }

        let ecdh = self
            .store
            .get_ecdh(pending.transaction.id)
            .await?
            .ok_or_else(|| {
                TasError::server(format!(
                    "no key agreement for transaction {}",
                    pending.transaction.tx_id
                ))
            })?;
        self.tokens.mint(seed, &pending.transaction, &ecdh).await
    }

    async fn register_did(
        &self,
        pending: &PendingStep,
        bearer: &TokenBearer,
        doc: &DidDocument,
        role: RoleType,
    ) -> Result<Did> {
        self.check_bearer(&pending.transaction, bearer).await?;

        validate_new_document(doc)?;
        verify_self_proofs(doc)?;
        let did = doc.did()?;

        self.anchor_document(doc, role).await?;
        self.bind_did(pending, &did).await?;
        Ok(did)
    }

    async fn update_did(
        &self,
        pending: &PendingStep,
        bearer: &TokenBearer,
        auth: &DidAuth,
        doc: &DidDocument,
    ) -> Result<Did> {
        self.check_bearer(&pending.transaction, bearer).await?;

        let did = doc.did()?;
        let status = self.registry.find_did_doc_status(&did).await?;
        if status != DidDocStatus::Activated {
            return Err(TasError::new(
                ErrorCode::InvalidDidDocStatus,
                format!("{did} is {status}"),
            ));
        }
        let current = self
            .registry
            .find_did_doc(&did, None)
            .await
            .map_err(retrieval_failed)?;
        verify_did_auth(auth, &current, &pending.transaction.auth_nonce)?;
        validate_document_update(&current, doc)?;
        verify_self_proofs(doc)?;

        self.anchor_document(doc, USER_DOCUMENT_ROLE).await?;
        self.bind_did(pending, &did).await?;
        Ok(did)
    }

    async fn restore_did(
        &self,
        pending: &PendingStep,
        bearer: &TokenBearer,
        auth: &DidAuth,
        did: &Did,
    ) -> Result<()> {
        self.check_bearer(&pending.transaction, bearer).await?;

        let status = self.registry.find_did_doc_status(did).await?;
        if status != DidDocStatus::Deactivated {
            return Err(TasError::new(
                ErrorCode::InvalidDidDocStatus,
                format!("only a deactivated DID can be restored, {did} is {status}"),
            ));
        }
        let current = self
            .registry
            .find_did_doc(did, None)
            .await
            .map_err(retrieval_failed)?;
        verify_did_auth(auth, &current, &pending.transaction.auth_nonce)?;

        self.registry
            .update_did_doc_status(did, DidDocStatus::Activated)
            .await?;
        self.bind_did(pending, did).await
    }

    async fn issue_vc(&self, pending: &PendingStep, bearer: &TokenBearer, meta: &VcMeta) -> Result<()> {
        self.check_bearer(&pending.transaction, bearer).await?;

        if meta.status != VcStatus::Active {
            return Err(TasError::new(
                ErrorCode::InvalidVcStatus,
                format!("a new VC must be {}, got {}", VcStatus::Active, meta.status),
            ));
        }
        let issuer = Did::parse(&meta.issuer)?;
        let subject = Did::parse(&meta.subject)?;
        self.resolve_did(&issuer).await?;
        self.resolve_did(&subject).await?;
        let status = self.registry.find_did_doc_status(&subject).await?;
        if status != DidDocStatus::Activated {
            return Err(TasError::new(
                ErrorCode::InvalidDidDocStatus,
                format!("holder {subject} is {status}"),
            ));
        }

        self.registry.register_vc_meta(meta).await?;

        let mut transaction = pending.transaction.clone();
        self.ledger
            .update(
                &mut transaction,
                TransactionUpdate {
                    certificate_id: Some(meta.id.clone()),
                    did: Some(subject.as_str().to_string()),
                    ..Default::default()
                },
            )
            .await
    }

    async fn revoke_vc(&self, pending: &PendingStep, bearer: &TokenBearer, vc_id: &str) -> Result<()> {
        self.check_bearer(&pending.transaction, bearer).await?;

        let meta = self.registry.find_vc_meta(vc_id).await?;
        if meta.status == VcStatus::Revoked {
            return Err(TasError::new(
                ErrorCode::InvalidVcStatus,
                format!("{vc_id} is already revoked"),
            ));
        }
        self.registry
            .update_vc_status(vc_id, VcStatus::Revoked)
            .await?;

        let mut transaction = pending.transaction.clone();
        self.ledger
            .update_certificate_id(&mut transaction, vc_id)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate the bearer's token and that it was minted for the bearer's
    /// app and wallet.
    async fn check_bearer(
        &self,
        transaction: &Transaction,
        bearer: &TokenBearer,
    ) -> Result<ServerTokenRecord> {
        let record = self.check_token(transaction, &bearer.presentation).await?;
        ensure_binding(&record, &bearer.app_id, &bearer.wallet_id)?;
        Ok(record)
    }

    async fn check_token(
        &self,
        transaction: &Transaction,
        presentation: &ServerTokenPresentation,
    ) -> Result<ServerTokenRecord> {
        if presentation.tx_id != transaction.tx_id {
            warn!(tx_id = %transaction.tx_id, presented = %presentation.tx_id, "token presented for another transaction");
            return Err(TasError::new(
                ErrorCode::ServerTokenNotFound,
                "server token belongs to another transaction",
            ));
        }
        let allowed = Workflow::of(transaction.tx_type).token_purposes;
        self.tokens
            .validate(&presentation.token_hash, transaction.id, allowed)
            .await
    }

    async fn anchor_document(&self, doc: &DidDocument, role: RoleType) -> Result<()> {
        let invoked = sign_invoked_document(
            doc,
            self.signer.as_ref(),
            &self.did,
            &self.config.cert_vc_ref,
        )?;
        self.registry.register_did_doc(&invoked, role).await?;
        Ok(())
    }

    async fn bind_did(&self, pending: &PendingStep, did: &Did) -> Result<()> {
        let mut transaction = pending.transaction.clone();
        self.ledger.update_did(&mut transaction, did.as_str()).await?;
        self.cache.invalidate(did);
        debug!(tx_id = %transaction.tx_id, %did, "step bound to DID");
        Ok(())
    }
}

fn retrieval_failed(e: tas_registry::RegistryError) -> TasError {
    TasError::new(ErrorCode::DidDocumentRetrievalFailed, e.to_string())
}
