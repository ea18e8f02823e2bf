//! Cryptographic primitives: secp256r1 ECDSA and SHA-256 hashing.
//!
//! Public keys travel in SEC1 compressed form and are multibase-encoded on
//! the wire. Signatures are fixed 64-byte `r || s`.

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::multibase;

/// Length of a compressed secp256r1 public key.
pub const COMPRESSED_KEY_LEN: usize = 33;

/// A 32-byte SHA-256 hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Hash(pub [u8; 32]);

impl Sha256Hash {
    /// Compute the SHA-256 hash of data.
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Hash the concatenation of two byte strings.
    pub fn hash_concat(a: &[u8], b: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(a);
        hasher.update(b);
        Self(hasher.finalize().into())
    }

    /// Get raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Encode as base58btc multibase.
    pub fn to_multibase(&self) -> String {
        multibase::encode(&self.0)
    }
}

impl fmt::Debug for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SHA256({}...)", &self.to_hex()[..8])
    }
}

impl AsRef<[u8]> for Sha256Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Sha256Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Elliptic curves accepted for signing and key agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EccCurveType {
    #[serde(rename = "Secp256r1")]
    Secp256r1,
}

impl EccCurveType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EccCurveType::Secp256r1 => "Secp256r1",
        }
    }
}

impl fmt::Display for EccCurveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EccCurveType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Secp256r1" | "secp256r1" | "P-256" => Ok(EccCurveType::Secp256r1),
            other => Err(CoreError::UnsupportedCurve(other.to_string())),
        }
    }
}

/// A compressed secp256r1 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; COMPRESSED_KEY_LEN]);

impl PublicKey {
    /// Parse from SEC1 bytes (compressed or uncompressed); stored compressed.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        let key = VerifyingKey::from_sec1_bytes(bytes).map_err(|_| CoreError::InvalidPublicKey)?;
        Ok(Self::from_verifying_key(&key))
    }

    fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(true);
        let mut arr = [0u8; COMPRESSED_KEY_LEN];
        arr.copy_from_slice(point.as_bytes());
        Self(arr)
    }

    /// Parse from a multibase string.
    pub fn from_multibase(s: &str) -> Result<Self, CoreError> {
        let bytes = multibase::decode(s)?;
        Self::from_sec1_bytes(&bytes)
    }

    /// Encode as base58btc multibase.
    pub fn to_multibase(&self) -> String {
        multibase::encode(&self.0)
    }

    /// Get the compressed SEC1 bytes.
    pub const fn as_bytes(&self) -> &[u8; COMPRESSED_KEY_LEN] {
        &self.0
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CoreError> {
        let key = VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;
        let sig =
            EcdsaSignature::from_slice(&signature.0).map_err(|_| CoreError::InvalidSignature)?;
        key.verify(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}...)", &hex::encode(self.0)[..16])
    }
}

/// A 64-byte ECDSA signature (`r || s`).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Parse from a multibase string.
    pub fn from_multibase(s: &str) -> Result<Self, CoreError> {
        multibase::decode_array::<64>(s).map(Self)
    }

    /// Encode as base58btc multibase.
    pub fn to_multibase(&self) -> String {
        multibase::encode(&self.0)
    }

    /// Get raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &hex::encode(self.0)[..16])
    }
}

/// A secp256r1 signing keypair.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Create from a 32-byte secret scalar.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        let signing_key = SigningKey::from_slice(bytes).map_err(|_| CoreError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Get the compressed public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(self.signing_key.verifying_key())
    }

    /// Sign a message (SHA-256 is applied by ECDSA).
    pub fn sign(&self, message: &[u8]) -> Result<Signature, CoreError> {
        let sig: EcdsaSignature = self
            .signing_key
            .try_sign(message)
            .map_err(|e| CoreError::SigningFailed(e.to_string()))?;
        let mut arr = [0u8; 64];
        arr.copy_from_slice(&sig.to_bytes());
        Ok(Signature(arr))
    }

    /// Get the raw secret scalar.
    pub fn secret_bytes(&self) -> [u8; 32] {
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&self.signing_key.to_bytes());
        arr
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}
