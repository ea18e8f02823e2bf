//! Key agreement payloads exchanged with the client.

use serde::{Deserialize, Serialize};

use tas_core::{Proof, SymmetricCipherType, SymmetricPaddingType};

/// A client's key agreement request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcdhRequest {
    /// Client DID.
    pub client: String,
    /// Multibase 16-byte nonce.
    pub client_nonce: String,
    /// Curve name, e.g. `Secp256r1`.
    pub curve: String,
    /// Multibase compressed ephemeral public key.
    pub public_key: String,
    /// Ciphers the client can use, in preference order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<Vec<SymmetricCipherType>>,
    /// `keyAgreement` proof by the client's `#keyagree` key.
    pub proof: Option<Proof>,
}

tas_core::impl_single_proof!(EcdhRequest);

/// The server's signed acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckEcdh {
    /// Server DID.
    pub server: String,
    pub server_nonce: String,
    /// Multibase compressed ephemeral public key.
    pub public_key: String,
    pub cipher: SymmetricCipherType,
    pub padding: SymmetricPaddingType,
    pub proof: Option<Proof>,
}

tas_core::impl_single_proof!(AckEcdh);
