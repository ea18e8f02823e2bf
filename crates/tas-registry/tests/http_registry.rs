//! Contract tests for HttpRegistry against a mock repository.
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | POST | `/api/v1/did-docs` | `register_did_doc_*` |
//! | GET | `/api/v1/did-docs/{did}` | `find_did_doc_*` |
//! | GET/PUT | `/api/v1/did-docs/{did}/status` | `did_doc_status_*` |
//! | POST | `/api/v1/vc-metas` | `register_vc_meta_*` |
//! | GET | `/api/v1/vc-metas/{id}` | `find_vc_meta_*` |
//! | PUT | `/api/v1/vc-metas/{id}/status` | `update_vc_status_*` |

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tas_core::document::{VerificationMethod, DID_CONTEXT_V1};
use tas_core::{sign_invoked_document, Did, DidDocument, DidKeyUrl, KeyRing, KeySigner};
use tas_registry::{
    DidDocStatus, HttpRegistry, Registry, RegistryConfig, RegistryError, RoleType, VcMeta,
    VcStatus,
};

fn client(server: &MockServer) -> HttpRegistry {
    HttpRegistry::new(&RegistryConfig {
        base_url: server.uri(),
        timeout_secs: 1,
    })
    .unwrap()
}

fn document(version: u64) -> DidDocument {
    let did = Did::parse("did:omn:alice").unwrap();
    let key = KeyRing::generate().public_key("auth").unwrap();
    DidDocument {
        context: vec![DID_CONTEXT_V1.to_string()],
        id: did.to_string(),
        controller: "did:omn:tas".into(),
        created: "2024-01-01T00:00:00Z".into(),
        updated: "2024-01-01T00:00:00Z".into(),
        version_id: version.to_string(),
        deactivated: false,
        verification_method: vec![VerificationMethod::secp256r1("auth", &did, &key)],
        assertion_method: vec![],
        authentication: vec!["auth".into()],
        key_agreement: vec![],
        capability_invocation: vec![],
        proofs: vec![],
    }
}

fn vc_meta() -> VcMeta {
    VcMeta {
        id: "urn:uuid:vc-1".into(),
        issuer: "did:omn:issuer".into(),
        subject: "did:omn:alice".into(),
        credential_schema: "https://schema.example/pid".into(),
        status: VcStatus::Active,
        issuance_date: "2024-01-01T00:00:00Z".into(),
        valid_from: "2024-01-01T00:00:00Z".into(),
        valid_until: "2025-01-01T00:00:00Z".into(),
    }
}

// ── POST /api/v1/did-docs ────────────────────────────────────────────

#[tokio::test]
async fn register_did_doc_posts_envelope_and_role() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/did-docs"))
        .and(body_partial_json(json!({ "roleType": "WALLET" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let tas = KeyRing::generate();
    let invoked = sign_invoked_document(
        &document(1),
        &tas,
        &Did::parse("did:omn:tas").unwrap(),
        "urn:cert:tas",
    )
    .unwrap();

    client(&server)
        .register_did_doc(&invoked, RoleType::Wallet)
        .await
        .unwrap();
}

#[tokio::test]
async fn register_did_doc_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/did-docs"))
        .respond_with(ResponseTemplate::new(409).set_body_string("version mismatch"))
        .mount(&server)
        .await;

    let tas = KeyRing::generate();
    let invoked = sign_invoked_document(
        &document(3),
        &tas,
        &Did::parse("did:omn:tas").unwrap(),
        "urn:cert:tas",
    )
    .unwrap();

    let result = client(&server)
        .register_did_doc(&invoked, RoleType::Wallet)
        .await;
    match result {
        Err(RegistryError::Conflict(body)) => assert_eq!(body, "version mismatch"),
        other => panic!("expected conflict, got {other:?}"),
    }
}

// ── GET /api/v1/did-docs/{did} ───────────────────────────────────────

#[tokio::test]
async fn find_did_doc_returns_document() {
    let server = MockServer::start().await;
    let doc = document(2);
    Mock::given(method("GET"))
        .and(path("/api/v1/did-docs/did:omn:alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&doc))
        .mount(&server)
        .await;

    let found = client(&server)
        .find_did_doc(&Did::parse("did:omn:alice").unwrap(), None)
        .await
        .unwrap();
    assert_eq!(found, doc);
}

#[tokio::test]
async fn find_did_doc_by_key_url_pins_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/did-docs/did:omn:alice"))
        .and(query_param("versionId", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document(1)))
        .expect(1)
        .mount(&server)
        .await;

    let url = DidKeyUrl::parse("did:omn:alice?versionId=1#auth").unwrap();
    let found = client(&server).find_did_doc_by_key_url(&url).await.unwrap();
    assert_eq!(found.version_id, "1");
}

#[tokio::test]
async fn find_did_doc_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/did-docs/did:omn:ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = client(&server)
        .find_did_doc(&Did::parse("did:omn:ghost").unwrap(), None)
        .await;
    assert!(matches!(result, Err(RegistryError::NotFound(_))));
}

#[tokio::test]
async fn find_did_doc_server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/did-docs/did:omn:alice"))
        .respond_with(ResponseTemplate::new(503).set_body_string("ledger down"))
        .mount(&server)
        .await;

    let result = client(&server)
        .find_did_doc(&Did::parse("did:omn:alice").unwrap(), None)
        .await;
    assert!(matches!(result, Err(RegistryError::Unavailable(_))));
}

#[tokio::test]
async fn find_did_doc_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/did-docs/did:omn:alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 42 })))
        .mount(&server)
        .await;

    let result = client(&server)
        .find_did_doc(&Did::parse("did:omn:alice").unwrap(), None)
        .await;
    assert!(matches!(result, Err(RegistryError::Decode(_))));
}

#[tokio::test]
async fn find_did_doc_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/did-docs/did:omn:alice"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(document(1))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let result = client(&server)
        .find_did_doc(&Did::parse("did:omn:alice").unwrap(), None)
        .await;
    assert!(matches!(result, Err(RegistryError::Timeout(_))));
}

#[tokio::test]
async fn find_did_doc_unreachable() {
    let registry = HttpRegistry::new(&RegistryConfig {
        base_url: "http://127.0.0.1:9".into(),
        timeout_secs: 1,
    })
    .unwrap();

    let result = registry
        .find_did_doc(&Did::parse("did:omn:alice").unwrap(), None)
        .await;
    assert!(matches!(
        result,
        Err(RegistryError::Unavailable(_)) | Err(RegistryError::Timeout(_))
    ));
}

// ── /api/v1/did-docs/{did}/status ────────────────────────────────────

#[tokio::test]
async fn did_doc_status_read_and_update() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/did-docs/did:omn:alice/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "DEACTIVATED" })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/did-docs/did:omn:alice/status"))
        .and(body_partial_json(json!({ "status": "ACTIVATED" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let registry = client(&server);
    let did = Did::parse("did:omn:alice").unwrap();
    assert_eq!(
        registry.find_did_doc_status(&did).await.unwrap(),
        DidDocStatus::Deactivated
    );
    registry
        .update_did_doc_status(&did, DidDocStatus::Activated)
        .await
        .unwrap();
}

// ── /api/v1/vc-metas ─────────────────────────────────────────────────

#[tokio::test]
async fn register_vc_meta_posts_meta() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/vc-metas"))
        .and(body_partial_json(json!({ "id": "urn:uuid:vc-1", "status": "ACTIVE" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).register_vc_meta(&vc_meta()).await.unwrap();
}

#[tokio::test]
async fn find_vc_meta_returns_meta() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/vc-metas/urn:uuid:vc-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vc_meta()))
        .mount(&server)
        .await;

    let meta = client(&server).find_vc_meta("urn:uuid:vc-1").await.unwrap();
    assert_eq!(meta, vc_meta());
}

#[tokio::test]
async fn find_vc_meta_escapes_reserved_characters() {
    let server = MockServer::start().await;
    let mut meta = vc_meta();
    meta.id = "urn:vc/1?x#y".into();
    Mock::given(method("GET"))
        .and(path("/api/v1/vc-metas/urn:vc%2F1%3Fx%23y"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&meta))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/vc-metas/urn:vc%2F1%3Fx%23y/status"))
        .and(body_partial_json(json!({ "status": "REVOKED" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let registry = client(&server);
    assert_eq!(registry.find_vc_meta("urn:vc/1?x#y").await.unwrap(), meta);
    registry
        .update_vc_status("urn:vc/1?x#y", VcStatus::Revoked)
        .await
        .unwrap();
}

#[tokio::test]
async fn update_vc_status_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/vc-metas/urn:uuid:vc-1/status"))
        .respond_with(ResponseTemplate::new(400).set_body_string("already revoked"))
        .mount(&server)
        .await;

    let result = client(&server)
        .update_vc_status("urn:uuid:vc-1", VcStatus::Revoked)
        .await;
    match result {
        Err(RegistryError::Rejected { status, body, .. }) => {
            assert_eq!(status, 400);
            assert_eq!(body, "already revoked");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}
