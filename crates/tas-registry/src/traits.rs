//! Registry trait: the external store of DID documents and VC metadata.
//!
//! Implementations may front a ledger binding or a remote repository. The
//! service constructs one instance at startup and shares it by `Arc`.

use async_trait::async_trait;

use tas_core::{Did, DidDocument, DidKeyUrl, InvokedDidDoc};

use crate::error::Result;
use crate::types::{DidDocStatus, RoleType, VcMeta, VcStatus};

/// Registry trait for anchoring and resolving documents.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Registry: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // DID documents
    // ─────────────────────────────────────────────────────────────────────────

    /// Anchor a document countersigned by its controller.
    ///
    /// A first registration must carry version 1; later ones must follow
    /// the stored version by exactly one.
    async fn register_did_doc(&self, invoked: &InvokedDidDoc, role: RoleType) -> Result<()>;

    /// Fetch a document, the latest version unless `version_id` pins one.
    async fn find_did_doc(&self, did: &Did, version_id: Option<u64>) -> Result<DidDocument>;

    /// Fetch the document a key URL points into, honoring `?versionId=`.
    async fn find_did_doc_by_key_url(&self, url: &DidKeyUrl) -> Result<DidDocument> {
        self.find_did_doc(url.did(), url.version_id()).await
    }

    async fn find_did_doc_status(&self, did: &Did) -> Result<DidDocStatus>;

    async fn update_did_doc_status(&self, did: &Did, status: DidDocStatus) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // VC metadata
    // ─────────────────────────────────────────────────────────────────────────

    async fn register_vc_meta(&self, meta: &VcMeta) -> Result<()>;

    async fn find_vc_meta(&self, vc_id: &str) -> Result<VcMeta>;

    async fn update_vc_status(&self, vc_id: &str, status: VcStatus) -> Result<()>;
}
