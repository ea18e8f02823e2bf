//! Server tokens: transaction- and purpose-bound capabilities.
//!
//! The token is the hash of a service-signed [`ServerTokenData`], not the
//! data itself. The signed data travels to the client encrypted under the
//! session key, so only the party that completed key agreement learns which
//! purpose, wallet and app the token is bound to.

use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use tas_core::{
    canonical_bytes, digest, generate_nonce, multibase, sign_proofs, Did, EcdhRecord, KeySigner,
    Proof, ProofPurpose, Provider, ServerTokenPurpose, ServerTokenRecord, SymmetricPaddingType,
    Transaction,
};
use tas_ecdh::{generate_iv, SessionCipher, SessionKey, BLOCK_LEN};
use tas_store::{InsertResult, Store};

use crate::error::{ErrorCode, Result, TasError};

/// What the client asks a token for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTokenSeed {
    pub purpose: ServerTokenPurpose,
    pub wallet_id: String,
    pub app_id: String,
}

/// The signed structure a token commits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTokenData {
    pub purpose: ServerTokenPurpose,
    pub wallet_id: String,
    pub app_id: String,
    pub valid_until: String,
    pub provider: Provider,
    pub nonce: String,
    pub proof: Option<Proof>,
}

tas_core::impl_single_proof!(ServerTokenData);

/// Mint response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintedToken {
    /// Multibase IV.
    pub iv: String,
    /// Multibase ciphertext of the canonical signed token data.
    pub encrypted_std: String,
    pub tx_id: Uuid,
}

/// A decrypted mint response, as the client sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedToken {
    pub data: ServerTokenData,
    pub token_hash: String,
}

impl MintedToken {
    /// Decrypt with the client's session cipher and derive the token hash.
    pub fn open(&self, cipher: &SessionCipher) -> Result<OpenedToken> {
        let iv = multibase::decode(&self.iv)?;
        let ciphertext = multibase::decode(&self.encrypted_std)?;
        let plaintext = cipher.decrypt(&iv, &ciphertext)?;

        // NOPAD payloads carry trailing spaces, which JSON ignores
        let data: ServerTokenData = serde_json::from_slice(&plaintext).map_err(|e| {
            TasError::new(ErrorCode::InvalidRequest, format!("token payload: {e}"))
        })?;
        let token_hash = token_hash(&data)?;
        Ok(OpenedToken { data, token_hash })
    }

    /// The presentation to send with later steps.
    pub fn presentation(&self, token_hash: &str) -> ServerTokenPresentation {
        ServerTokenPresentation {
            token_hash: token_hash.to_string(),
            tx_id: self.tx_id,
        }
    }
}

/// What a client presents to use a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTokenPresentation {
    pub token_hash: String,
    pub tx_id: Uuid,
}

/// A presented token plus the app and wallet the caller authenticated as.
///
/// Every step that spends a token checks it against both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBearer {
    #[serde(flatten)]
    pub presentation: ServerTokenPresentation,
    pub app_id: String,
    pub wallet_id: String,
}

impl TokenBearer {
    pub fn new(
        presentation: ServerTokenPresentation,
        app_id: impl Into<String>,
        wallet_id: impl Into<String>,
    ) -> Self {
        Self {
            presentation,
            app_id: app_id.into(),
            wallet_id: wallet_id.into(),
        }
    }
}

/// `multibase(SHA-256(canonical_json(signed data)))`.
pub fn token_hash(data: &ServerTokenData) -> Result<String> {
    Ok(digest(&canonical_bytes(data)?).to_multibase())
}

/// Check that a validated token is bound to the authenticated party.
pub fn ensure_binding(record: &ServerTokenRecord, app_id: &str, wallet_id: &str) -> Result<()> {
    if record.app_id != app_id || record.wallet_id != wallet_id {
        return Err(TasError::new(
            ErrorCode::ServerTokenBindingMismatch,
            "server token is bound to another app or wallet",
        ));
    }
    Ok(())
}

/// Mints and validates server tokens.
pub struct ServerTokenService<S: Store> {
    store: Arc<S>,
    signer: Arc<dyn KeySigner>,
    provider: Did,
    cert_vc_ref: String,
    ttl: Duration,
}

impl<S: Store> ServerTokenService<S> {
    pub fn new(
        store: Arc<S>,
        signer: Arc<dyn KeySigner>,
        provider: Did,
        cert_vc_ref: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            signer,
            provider,
            cert_vc_ref: cert_vc_ref.into(),
            ttl,
        }
    }

    /// Build and sign token data. Returns it with its token hash.
    pub fn build(&self, seed: &ServerTokenSeed, now: DateTime<Utc>) -> Result<(ServerTokenData, String)> {
        let purpose = ProofPurpose::AssertionMethod;
        let mut data = ServerTokenData {
            purpose: seed.purpose,
            wallet_id: seed.wallet_id.clone(),
            app_id: seed.app_id.clone(),
            valid_until: (now + self.ttl).to_rfc3339_opts(SecondsFormat::Secs, true),
            provider: Provider {
                did: self.provider.to_string(),
                cert_vc_ref: self.cert_vc_ref.clone(),
            },
            nonce: generate_nonce(),
            proof: Some(Proof::created_at(
                &self.provider.key_url(purpose.key_id()),
                purpose,
                now,
            )),
        };
        sign_proofs(&mut data, self.signer.as_ref())?;
        let hash = token_hash(&data)?;
        Ok((data, hash))
    }

    /// Mint a token for a transaction and persist its record.
    ///
    /// One token per transaction: a second mint fails `TRANSACTION_INVALID`.
    pub async fn mint(
        &self,
        seed: &ServerTokenSeed,
        transaction: &Transaction,
        ecdh: &EcdhRecord,
    ) -> Result<MintedToken> {
        let now = Utc::now();
        let (data, hash) = self.build(seed, now)?;

        let key = SessionKey::from_multibase(&ecdh.session_key, ecdh.cipher)?;
        let cipher = SessionCipher::new(ecdh.cipher, ecdh.padding, key)?;
        let iv = generate_iv();
        let mut plaintext = canonical_bytes(&data)?;
        if ecdh.padding == SymmetricPaddingType::NoPad {
            let rem = plaintext.len() % BLOCK_LEN;
            if rem != 0 {
                plaintext.resize(plaintext.len() + BLOCK_LEN - rem, b' ');
            }
        }
        let encrypted = cipher.encrypt(&iv, &plaintext)?;

        let record = ServerTokenRecord {
            transaction_id: transaction.id,
            purpose: seed.purpose,
            token_hash: hash,
            app_id: seed.app_id.clone(),
            wallet_id: seed.wallet_id.clone(),
            expired_at: now + self.ttl,
            created_at: now,
        };
        if let InsertResult::Conflict { .. } = self.store.insert_server_token(&record).await? {
            return Err(TasError::new(
                ErrorCode::TransactionInvalid,
                format!("transaction {} already has a server token", transaction.tx_id),
            ));
        }

        info!(tx_id = %transaction.tx_id, purpose = %seed.purpose, "server token minted");
        Ok(MintedToken {
            iv: multibase::encode(&iv),
            encrypted_std: multibase::encode(&encrypted),
            tx_id: transaction.tx_id,
        })
    }

    /// Look up a presented token and check it is live and fit for purpose.
    ///
    /// The caller still has to check the returned app and wallet ids
    /// against the authenticated party (see [`ensure_binding`]).
    pub async fn validate(
        &self,
        token_hash: &str,
        transaction_id: i64,
        allowed: &[ServerTokenPurpose],
    ) -> Result<ServerTokenRecord> {
        let record = self
            .store
            .find_server_token(token_hash, transaction_id)
            .await?
            .ok_or_else(|| TasError::new(ErrorCode::ServerTokenNotFound, "unknown server token"))?;

        if record.is_expired_at(Utc::now()) {
            return Err(TasError::new(
                ErrorCode::ServerTokenExpired,
                format!("server token expired at {}", record.expired_at),
            ));
        }
        if !allowed.contains(&record.purpose) {
            return Err(TasError::new(
                ErrorCode::UnsupportedServerTokenPurpose,
                format!("{} is not accepted here", record.purpose),
            ));
        }
        Ok(record)
    }
}
