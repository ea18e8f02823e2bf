//! Protocol properties over generated inputs.

use proptest::prelude::*;

use tas::core::{
    ProofPurpose, ServerTokenPurpose, SubTransactionType, SymmetricPaddingType, TransactionType,
};
use tas::ecdh::EcdhConfig;
use tas::{TasConfig, Workflow};
use tas_testkit::fixtures::{Identity, TestAnchor};
use tas_testkit::generators::{sub_transaction_type, transaction_type, TokenParams};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn purpose_for(tx_type: TransactionType) -> ServerTokenPurpose {
    Workflow::of(tx_type).token_purposes[0]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Every suite the service may be configured with delivers a token the
    /// client can open and present.
    #[test]
    fn prop_token_delivery_every_suite(params: TokenParams) {
        let tx_type = TransactionType::ALL
            .iter()
            .copied()
            .find(|t| Workflow::of(*t).allows_purpose(params.seed.purpose))
            .unwrap();

        runtime().block_on(async {
            let fixture = TestAnchor::with_config(TasConfig {
                ecdh: EcdhConfig { cipher: params.cipher, padding: params.padding },
                ..TasConfig::default()
            });
            let wallet = Identity::new("did:omn:wallet");
            fixture.enroll(&wallet);

            let proposal = fixture.anchor.propose(tx_type).await.unwrap();
            let session = fixture.negotiate(&wallet, &proposal.tx_id).await.unwrap();
            prop_assert_eq!(session.cipher().cipher(), params.cipher);

            let minted = fixture
                .anchor
                .request_create_token(&proposal.tx_id, &params.seed)
                .await
                .unwrap();
            let opened = minted.open(session.cipher()).unwrap();
            prop_assert_eq!(&opened.data.app_id, &params.seed.app_id);
            prop_assert_eq!(&opened.data.wallet_id, &params.seed.wallet_id);

            let record = fixture
                .anchor
                .validate_server_token(
                    &proposal.tx_id,
                    &minted.presentation(&opened.token_hash),
                    &params.seed.app_id,
                    &params.seed.wallet_id,
                )
                .await
                .unwrap();
            prop_assert_eq!(record.purpose, params.seed.purpose);

            if params.padding == SymmetricPaddingType::NoPad {
                let ct = tas::core::multibase::decode(&minted.encrypted_std).unwrap();
                prop_assert_eq!(ct.len() % tas::ecdh::BLOCK_LEN, 0);
            }
            Ok(())
        })?;
    }

    /// Whatever order steps are attempted in, the log only ever holds a
    /// gapless prefix of the workflow.
    #[test]
    fn prop_step_log_is_a_workflow_prefix(
        tx_type in transaction_type(),
        attempts in proptest::collection::vec(sub_transaction_type(), 1..12),
    ) {
        runtime().block_on(async {
            let fixture = TestAnchor::new();
            let proposal = fixture.anchor.propose(tx_type).await.unwrap();
            let ledger = fixture.anchor.ledger();

            for step_type in attempts {
                let _ = ledger.advance(&proposal.tx_id, step_type).await;
            }

            let steps = fixture.anchor.steps(&proposal.tx_id).await.unwrap();
            let workflow = Workflow::of(tx_type);
            prop_assert!(steps.len() <= workflow.steps.len());
            for (i, step) in steps.iter().enumerate() {
                prop_assert_eq!(step.step as usize, i + 1);
                prop_assert_eq!(step.sub_type, workflow.steps[i]);
            }
            Ok(())
        })?;
    }
}

#[tokio::test]
async fn test_every_workflow_reaches_its_action_step() {
    for tx_type in TransactionType::ALL {
        let fixture = TestAnchor::new();
        let wallet = Identity::new("did:omn:wallet");
        fixture.enroll(&wallet);

        let session = fixture
            .open_session(&wallet, *tx_type, purpose_for(*tx_type))
            .await
            .unwrap();
        let steps = fixture.anchor.steps(&session.tx_id).await.unwrap();
        assert_eq!(steps.last().unwrap().sub_type, SubTransactionType::RequestCreateToken);

        tas::core::verify_proof(
            &session.token.data,
            &fixture.tas.public_key(ProofPurpose::AssertionMethod),
        )
        .unwrap();
    }
}
