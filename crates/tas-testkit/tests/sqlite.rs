//! The full protocol over on-disk SQLite.

use std::sync::Arc;

use tokio::sync::Barrier;

use tas::core::{ServerTokenPurpose, SubTransactionType, TransactionStatus, TransactionType};
use tas::registry::{Registry, RoleType, VcMeta, VcStatus};
use tas::store::{SqliteStore, Store};
use tas::{ErrorCode, TasConfig};
use tas_testkit::fixtures::{Identity, TestAnchor};

fn vc_meta(id: &str, issuer: &Identity, holder: &Identity) -> VcMeta {
    VcMeta {
        id: id.into(),
        issuer: issuer.did.to_string(),
        subject: holder.did.to_string(),
        credential_schema: "https://schema.example/id".into(),
        status: VcStatus::Active,
        issuance_date: "2024-01-01T00:00:00Z".into(),
        valid_from: "2024-01-01T00:00:00Z".into(),
        valid_until: "2030-01-01T00:00:00Z".into(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_registration_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tas.db");

    let fixture = TestAnchor::with_store(TasConfig::default(), SqliteStore::open(&path).unwrap());
    let wallet = Identity::new("did:omn:wallet");
    fixture.enroll(&wallet);
    let user = Identity::new("did:omn:user");

    let session = fixture
        .open_session(&wallet, TransactionType::UserRegistration, ServerTokenPurpose::CreateDid)
        .await
        .unwrap();
    fixture
        .anchor
        .request_register_did(
            &session.tx_id,
            &session.bearer,
            &user.document(&fixture.tas.did),
            RoleType::Etc,
        )
        .await
        .unwrap();
    fixture.anchor.confirm(&session.tx_id).await.unwrap();
    drop(fixture);

    let store = SqliteStore::open(&path).unwrap();
    let transaction = store
        .get_transaction_by_tx_id(&session.tx_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(transaction.status, TransactionStatus::Completed);
    assert_eq!(transaction.did.as_deref(), Some("did:omn:user"));

    let steps = store.list_sub_transactions(transaction.id).await.unwrap();
    assert_eq!(
        steps.iter().map(|s| s.step).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );
    assert_eq!(steps[4].sub_type, SubTransactionType::Confirm);

    let ecdh = store.get_ecdh(transaction.id).await.unwrap().unwrap();
    assert_eq!(ecdh.client_did, "did:omn:wallet");
    assert_eq!(
        ecdh.session_key,
        session.ecdh.session_key().to_multibase()
    );

    let token = store
        .find_server_token(&session.token.token_hash, transaction.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(token.purpose, ServerTokenPurpose::CreateDid);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sqlite_rejects_replay() {
    let fixture = TestAnchor::with_store(TasConfig::default(), SqliteStore::open_memory().unwrap());
    let wallet = Identity::new("did:omn:wallet");
    let issuer = Identity::new("did:omn:issuer");
    let holder = Identity::new("did:omn:holder");
    fixture.enroll(&wallet);
    fixture.enroll(&issuer);
    fixture.enroll(&holder);

    let session = fixture
        .open_session(&wallet, TransactionType::IssueVc, ServerTokenPurpose::IssueVc)
        .await
        .unwrap();
    let meta = vc_meta("urn:vc:sqlite", &issuer, &holder);
    fixture
        .anchor
        .request_issue_vc(&session.tx_id, &session.bearer, &meta)
        .await
        .unwrap();

    // The action step is recorded once
    let err = fixture
        .anchor
        .request_issue_vc(&session.tx_id, &session.bearer, &meta)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TransactionInvalid);

    let transaction = fixture.anchor.confirm(&session.tx_id).await.unwrap();
    assert_eq!(transaction.certificate_id.as_deref(), Some("urn:vc:sqlite"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_issue_anchors_one_credential() {
    let fixture = Arc::new(TestAnchor::with_store(
        TasConfig::default(),
        SqliteStore::open_memory().unwrap(),
    ));
    let wallet = Identity::new("did:omn:wallet");
    let issuer = Identity::new("did:omn:issuer");
    let holder = Identity::new("did:omn:holder");
    fixture.enroll(&wallet);
    fixture.enroll(&issuer);
    fixture.enroll(&holder);

    let session = fixture
        .open_session(&wallet, TransactionType::IssueVc, ServerTokenPurpose::IssueVc)
        .await
        .unwrap();

    let racers = 8;
    let barrier = Arc::new(Barrier::new(racers));
    let mut handles = Vec::new();
    for n in 0..racers {
        let fixture = fixture.clone();
        let barrier = barrier.clone();
        let tx_id = session.tx_id;
        let bearer = session.bearer.clone();
        let meta = vc_meta(&format!("urn:vc:{n}"), &issuer, &holder);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            fixture
                .anchor
                .request_issue_vc(&tx_id, &bearer, &meta)
                .await
                .map(|()| meta.id)
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(id) => winners.push(id),
            Err(e) => assert_eq!(e.code, ErrorCode::TransactionInvalid),
        }
    }
    assert_eq!(winners.len(), 1);

    // Losers were turned away before touching the registry
    let mut anchored = Vec::new();
    for n in 0..racers {
        let id = format!("urn:vc:{n}");
        if fixture.registry.find_vc_meta(&id).await.is_ok() {
            anchored.push(id);
        }
    }
    assert_eq!(anchored, winners);

    let transaction = fixture.anchor.confirm(&session.tx_id).await.unwrap();
    assert_eq!(transaction.certificate_id.as_ref(), Some(&winners[0]));
    assert_eq!(transaction.did.as_deref(), Some("did:omn:holder"));
    assert_eq!(fixture.anchor.steps(&session.tx_id).await.unwrap().len(), 5);
}
