//! In-memory implementation of the Registry trait.
//!
//! Keeps the full version history of every DID, like a ledger would. Used by
//! tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use tas_core::{verify_proof, CoreError, Did, DidDocument, InvokedDidDoc, Proofed, PublicKey};

use crate::error::{RegistryError, Result};
use crate::traits::Registry;
use crate::types::{DidDocStatus, RoleType, VcMeta, VcStatus};

/// In-memory registry.
pub struct MemoryRegistry {
    inner: RwLock<MemoryRegistryInner>,
    /// When set, invocation proofs must verify against this key.
    controller_key: Option<PublicKey>,
    available: AtomicBool,
    fetches: AtomicUsize,
}

#[derive(Default)]
struct MemoryRegistryInner {
    /// Every version per DID, oldest first.
    documents: HashMap<String, Vec<DidDocument>>,
    statuses: HashMap<String, DidDocStatus>,
    roles: HashMap<String, RoleType>,
    vc_metas: HashMap<String, VcMeta>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryRegistryInner::default()),
            controller_key: None,
            available: AtomicBool::new(true),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Require every registration to carry an invocation proof by this key.
    pub fn with_controller_key(mut self, key: PublicKey) -> Self {
        self.controller_key = Some(key);
        self
    }

    /// Seed a document directly, bypassing the invocation envelope.
    pub fn insert_document(&self, doc: DidDocument) -> Result<()> {
        let mut inner = self.write()?;
        inner
            .statuses
            .entry(doc.id.clone())
            .or_insert(DidDocStatus::Activated);
        inner.documents.entry(doc.id.clone()).or_default().push(doc);
        Ok(())
    }

    /// Simulate an outage. While unavailable every call fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of document lookups served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// The role a DID was registered with.
    pub fn role(&self, did: &Did) -> Result<Option<RoleType>> {
        Ok(self.read()?.roles.get(did.as_str()).copied())
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RegistryError::Unavailable("memory registry is offline".into()))
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryRegistryInner>> {
        self.inner
            .read()
            .map_err(|e| RegistryError::Unavailable(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryRegistryInner>> {
        self.inner
            .write()
            .map_err(|e| RegistryError::Unavailable(e.to_string()))
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn register_did_doc(&self, invoked: &InvokedDidDoc, role: RoleType) -> Result<()> {
        self.check_available()?;

        if !invoked.proof()?.is_signed() {
            return Err(CoreError::MissingProofValue.into());
        }
        if let Some(key) = &self.controller_key {
            verify_proof(invoked, key)?;
        }

        let doc = invoked.decode_document()?;
        let proposed = doc
            .version()
            .map_err(|e| RegistryError::Conflict(e.to_string()))?;

        let mut inner = self.write()?;
        let latest = inner
            .documents
            .get(&doc.id)
            .and_then(|versions| versions.last())
            .map(|d| d.version())
            .transpose()
            .map_err(|e| RegistryError::Conflict(e.to_string()))?
            .unwrap_or(0);
        if proposed != latest + 1 {
            return Err(RegistryError::Conflict(format!(
                "{} is at version {}, got {}",
                doc.id, latest, proposed
            )));
        }

        debug!(did = %doc.id, version = proposed, %role, "registered DID document");
        inner
            .statuses
            .entry(doc.id.clone())
            .or_insert(DidDocStatus::Activated);
        inner.roles.insert(doc.id.clone(), role);
        inner.documents.entry(doc.id.clone()).or_default().push(doc);
        Ok(())
    }

    async fn find_did_doc(&self, did: &Did, version_id: Option<u64>) -> Result<DidDocument> {
        self.check_available()?;
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let inner = self.read()?;
        let versions = inner
            .documents
            .get(did.as_str())
            .ok_or_else(|| RegistryError::NotFound(did.to_string()))?;

        let found = match version_id {
            None => versions.last(),
            Some(v) => versions
                .iter()
                .find(|d| d.version().map(|n| n == v).unwrap_or(false)),
        };
        found
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("{}?versionId={:?}", did, version_id)))
    }

    async fn find_did_doc_status(&self, did: &Did) -> Result<DidDocStatus> {
        self.check_available()?;
        self.read()?
            .statuses
            .get(did.as_str())
            .copied()
            .ok_or_else(|| RegistryError::NotFound(did.to_string()))
    }

    async fn update_did_doc_status(&self, did: &Did, status: DidDocStatus) -> Result<()> {
        self.check_available()?;
        let mut inner = self.write()?;
        let entry = inner
            .statuses
            .get_mut(did.as_str())
            .ok_or_else(|| RegistryError::NotFound(did.to_string()))?;
        *entry = status;
        debug!(%did, %status, "DID document status updated");
        Ok(())
    }

    async fn register_vc_meta(&self, meta: &VcMeta) -> Result<()> {
        self.check_available()?;
        let mut inner = self.write()?;
        if inner.vc_metas.contains_key(&meta.id) {
            return Err(RegistryError::Conflict(format!("VC {} already anchored", meta.id)));
        }
        inner.vc_metas.insert(meta.id.clone(), meta.clone());
        Ok(())
    }

    async fn find_vc_meta(&self, vc_id: &str) -> Result<VcMeta> {
        self.check_available()?;
        self.read()?
            .vc_metas
            .get(vc_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(vc_id.to_string()))
    }

    async fn update_vc_status(&self, vc_id: &str, status: VcStatus) -> Result<()> {
        self.check_available()?;
        let mut inner = self.write()?;
        let meta = inner
            .vc_metas
            .get_mut(vc_id)
            .ok_or_else(|| RegistryError::NotFound(vc_id.to_string()))?;
        meta.status = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tas_core::document::{VerificationMethod, DID_CONTEXT_V1};
    use tas_core::{sign_invoked_document, KeyRing, KeySigner};

    fn document(version: u64) -> DidDocument {
        let did = Did::parse("did:omn:user").unwrap();
        let key = KeyRing::generate().public_key("assert").unwrap();
        DidDocument {
            context: vec![DID_CONTEXT_V1.to_string()],
            id: did.to_string(),
            controller: "did:omn:tas".into(),
            created: "2024-01-01T00:00:00Z".into(),
            updated: format!("2024-01-0{}T00:00:00Z", version),
            version_id: version.to_string(),
            deactivated: false,
            verification_method: vec![VerificationMethod::secp256r1("assert", &did, &key)],
            assertion_method: vec!["assert".into()],
            authentication: vec![],
            key_agreement: vec![],
            capability_invocation: vec![],
            proofs: vec![],
        }
    }

    fn invoke(doc: &DidDocument, tas: &KeyRing) -> InvokedDidDoc {
        let controller = Did::parse("did:omn:tas").unwrap();
        sign_invoked_document(doc, tas, &controller, "urn:cert:tas").unwrap()
    }

    #[tokio::test]
    async fn test_register_and_find_versions() {
        let tas = KeyRing::generate();
        let registry =
            MemoryRegistry::new().with_controller_key(tas.public_key("invoke").unwrap());
        let did = Did::parse("did:omn:user").unwrap();

        registry
            .register_did_doc(&invoke(&document(1), &tas), RoleType::Wallet)
            .await
            .unwrap();
        registry
            .register_did_doc(&invoke(&document(2), &tas), RoleType::Wallet)
            .await
            .unwrap();

        assert_eq!(registry.find_did_doc(&did, None).await.unwrap().version_id, "2");
        assert_eq!(registry.find_did_doc(&did, Some(1)).await.unwrap().version_id, "1");
        assert!(matches!(
            registry.find_did_doc(&did, Some(3)).await,
            Err(RegistryError::NotFound(_))
        ));
        assert_eq!(
            registry.find_did_doc_status(&did).await.unwrap(),
            DidDocStatus::Activated
        );
        assert_eq!(registry.role(&did).unwrap(), Some(RoleType::Wallet));
        assert_eq!(registry.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_version_gap_rejected() {
        let tas = KeyRing::generate();
        let registry = MemoryRegistry::new();

        let result = registry
            .register_did_doc(&invoke(&document(2), &tas), RoleType::Wallet)
            .await;
        assert!(matches!(result, Err(RegistryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_foreign_controller_rejected() {
        let tas = KeyRing::generate();
        let registry = MemoryRegistry::new()
            .with_controller_key(KeyRing::generate().public_key("invoke").unwrap());

        let result = registry
            .register_did_doc(&invoke(&document(1), &tas), RoleType::Wallet)
            .await;
        assert!(matches!(
            result,
            Err(RegistryError::Core(CoreError::InvalidSignature))
        ));
    }

    #[tokio::test]
    async fn test_unavailable() {
        let registry = MemoryRegistry::new();
        registry.insert_document(document(1)).unwrap();
        registry.set_available(false);

        let did = Did::parse("did:omn:user").unwrap();
        assert!(matches!(
            registry.find_did_doc(&did, None).await,
            Err(RegistryError::Unavailable(_))
        ));
        registry.set_available(true);
        assert!(registry.find_did_doc(&did, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_vc_meta_lifecycle() {
        let registry = MemoryRegistry::new();
        let meta = VcMeta {
            id: "urn:uuid:vc-1".into(),
            issuer: "did:omn:issuer".into(),
            subject: "did:omn:user".into(),
            credential_schema: "https://schema.example/pid".into(),
            status: VcStatus::Active,
            issuance_date: "2024-01-01T00:00:00Z".into(),
            valid_from: "2024-01-01T00:00:00Z".into(),
            valid_until: "2025-01-01T00:00:00Z".into(),
        };

        registry.register_vc_meta(&meta).await.unwrap();
        assert!(matches!(
            registry.register_vc_meta(&meta).await,
            Err(RegistryError::Conflict(_))
        ));

        registry
            .update_vc_status("urn:uuid:vc-1", VcStatus::Revoked)
            .await
            .unwrap();
        assert_eq!(
            registry.find_vc_meta("urn:uuid:vc-1").await.unwrap().status,
            VcStatus::Revoked
        );
        assert!(matches!(
            registry.update_vc_status("urn:uuid:nope", VcStatus::Revoked).await,
            Err(RegistryError::NotFound(_))
        ));
    }
}
