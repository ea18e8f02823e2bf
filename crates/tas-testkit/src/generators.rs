//! Proptest generators for property-based testing.

use proptest::prelude::*;

use tas::ServerTokenSeed;
use tas_core::{
    ServerTokenPurpose, SubTransactionType, SymmetricCipherType, SymmetricPaddingType,
    TransactionType,
};

/// Generate a cipher suite.
pub fn cipher_type() -> impl Strategy<Value = SymmetricCipherType> {
    prop::sample::select(SymmetricCipherType::ALL.to_vec())
}

/// Generate a padding mode.
pub fn padding_type() -> impl Strategy<Value = SymmetricPaddingType> {
    prop::sample::select(SymmetricPaddingType::ALL.to_vec())
}

/// Generate a transaction type.
pub fn transaction_type() -> impl Strategy<Value = TransactionType> {
    prop::sample::select(TransactionType::ALL.to_vec())
}

/// Generate any step type, valid for the workflow or not.
pub fn sub_transaction_type() -> impl Strategy<Value = SubTransactionType> {
    prop::sample::select(SubTransactionType::ALL.to_vec())
}

/// Generate a token purpose.
pub fn server_token_purpose() -> impl Strategy<Value = ServerTokenPurpose> {
    prop::sample::select(ServerTokenPurpose::ALL.to_vec())
}

/// Generate a DID under the `omn` method.
pub fn did_string() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,16}".prop_map(|id| format!("did:omn:{id}"))
}

/// Generate a 16-byte protocol nonce.
pub fn nonce_bytes() -> impl Strategy<Value = [u8; 16]> {
    any::<[u8; 16]>()
}

/// Generate an app or wallet id.
pub fn client_id(prefix: &'static str) -> impl Strategy<Value = String> {
    "[0-9]{4,8}".prop_map(move |n| format!("{prefix}-{n}"))
}

/// Parameters for minting a token under a negotiated suite.
#[derive(Debug, Clone)]
pub struct TokenParams {
    pub cipher: SymmetricCipherType,
    pub padding: SymmetricPaddingType,
    pub seed: ServerTokenSeed,
}

impl Arbitrary for TokenParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (cipher_type(), padding_type(), server_token_seed())
            .prop_map(|(cipher, padding, seed)| TokenParams {
                cipher,
                padding,
                seed,
            })
            .boxed()
    }
}

/// Generate a token request.
pub fn server_token_seed() -> impl Strategy<Value = ServerTokenSeed> {
    (
        server_token_purpose(),
        client_id("WID"),
        client_id("AID"),
    )
        .prop_map(|(purpose, wallet_id, app_id)| ServerTokenSeed {
            purpose,
            wallet_id,
            app_id,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::test_runner::TestRunner;
    use tas_core::Did;

    #[test]
    fn test_generated_dids_parse() {
        let mut runner = TestRunner::default();
        runner
            .run(&did_string(), |did| {
                prop_assert!(Did::parse(&did).is_ok());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_client_ids_carry_prefix() {
        let mut runner = TestRunner::default();
        runner
            .run(&server_token_seed(), |seed| {
                prop_assert!(seed.wallet_id.starts_with("WID-"));
                prop_assert!(seed.app_id.starts_with("AID-"));
                Ok(())
            })
            .unwrap();
    }
}
