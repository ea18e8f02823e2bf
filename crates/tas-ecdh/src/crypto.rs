//! Key agreement primitives: ephemeral P-256 keys, nonces, and session-key
//! derivation.
//!
//! `session_key = truncate(SHA256(ECDH(priv, peer) || SHA256(client_nonce || server_nonce)), keylen)`

use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::SecretKey;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;

use tas_core::{multibase, EccCurveType, PublicKey, Sha256Hash, SymmetricCipherType};

use crate::error::{EcdhError, Result};

/// Length of protocol nonces.
pub const NONCE_LEN: usize = 16;

/// An ephemeral key pair for one key agreement.
pub struct EcdhKeyPair {
    secret: SecretKey,
}

impl EcdhKeyPair {
    /// Generate a fresh key pair on the given curve.
    pub fn generate(curve: EccCurveType) -> Self {
        match curve {
            EccCurveType::Secp256r1 => Self {
                secret: SecretKey::random(&mut OsRng),
            },
        }
    }

    /// Create from a 32-byte secret scalar.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes).map_err(|_| EcdhError::InvalidPublicKey)?;
        Ok(Self { secret })
    }

    /// The compressed public key.
    pub fn public_key(&self) -> PublicKey {
        let point = self.secret.public_key().to_encoded_point(true);
        let mut arr = [0u8; tas_core::crypto::COMPRESSED_KEY_LEN];
        arr.copy_from_slice(point.as_bytes());
        PublicKey(arr)
    }

    /// Compute the raw shared secret (the x-coordinate) with a peer.
    pub fn diffie_hellman(&self, peer: &PublicKey) -> Result<SharedSecret> {
        let peer = p256::PublicKey::from_sec1_bytes(peer.as_bytes())
            .map_err(|_| EcdhError::InvalidPublicKey)?;
        let shared = p256::ecdh::diffie_hellman(self.secret.to_nonzero_scalar(), peer.as_affine());
        let mut arr = [0u8; 32];
        arr.copy_from_slice(shared.raw_secret_bytes());
        Ok(SharedSecret(arr))
    }
}

impl fmt::Debug for EcdhKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EcdhKeyPair({:?})", self.public_key())
    }
}

/// Raw ECDH output.
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// A 16-byte protocol nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nonce(pub [u8; NONCE_LEN]);

impl Nonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parse a multibase nonce, which must decode to exactly 16 bytes.
    pub fn from_multibase(s: &str) -> Result<Self> {
        let bytes = multibase::decode(s)?;
        let arr: [u8; NONCE_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| EcdhError::InvalidNonce(bytes.len()))?;
        Ok(Self(arr))
    }

    pub fn to_multibase(&self) -> String {
        multibase::encode(&self.0)
    }

    pub const fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}

/// `SHA256(client_nonce || server_nonce)`.
pub fn merge_nonce(client: &Nonce, server: &Nonce) -> Sha256Hash {
    Sha256Hash::hash_concat(client.as_bytes(), server.as_bytes())
}

/// A symmetric session key of 16 or 32 bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey(Vec<u8>);

impl SessionKey {
    /// Wrap raw key bytes, checking the length against the cipher.
    pub fn from_bytes(bytes: Vec<u8>, cipher: SymmetricCipherType) -> Result<Self> {
        if bytes.len() != cipher.key_len() {
            return Err(EcdhError::InvalidKeyLength {
                expected: cipher.key_len(),
                got: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    pub fn from_multibase(s: &str, cipher: SymmetricCipherType) -> Result<Self> {
        Self::from_bytes(multibase::decode(s)?, cipher)
    }

    pub fn to_multibase(&self) -> String {
        multibase::encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionKey({} bytes)", self.0.len())
    }
}

/// Derive the session key from the shared secret and merged nonce.
pub fn derive_session_key(
    shared: &SharedSecret,
    merged_nonce: &Sha256Hash,
    cipher: SymmetricCipherType,
) -> SessionKey {
    let digest = Sha256Hash::hash_concat(shared.as_bytes(), merged_nonce.as_bytes());
    SessionKey(digest.as_bytes()[..cipher.key_len()].to_vec())
}
