//! Multibase text encoding for keys, signatures, nonces, and ciphertexts.
//!
//! Values are emitted as base58btc (`z` prefix). Hex (`f` prefix) is accepted
//! on decode for peers that prefer it.

use crate::error::CoreError;

/// Supported multibase alphabets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultibaseEncoding {
    /// `z` - Bitcoin base58.
    Base58Btc,
    /// `f` - lowercase base16.
    Base16,
}

impl MultibaseEncoding {
    /// The single-character prefix for this alphabet.
    pub const fn prefix(self) -> char {
        match self {
            MultibaseEncoding::Base58Btc => 'z',
            MultibaseEncoding::Base16 => 'f',
        }
    }

    fn from_prefix(c: char) -> Option<Self> {
        match c {
            'z' => Some(MultibaseEncoding::Base58Btc),
            'f' => Some(MultibaseEncoding::Base16),
            _ => None,
        }
    }
}

/// Encode bytes as base58btc multibase.
pub fn encode(bytes: &[u8]) -> String {
    encode_with(MultibaseEncoding::Base58Btc, bytes)
}

/// Encode bytes with an explicit alphabet.
pub fn encode_with(encoding: MultibaseEncoding, bytes: &[u8]) -> String {
    let body = match encoding {
        MultibaseEncoding::Base58Btc => bs58::encode(bytes).into_string(),
        MultibaseEncoding::Base16 => hex::encode(bytes),
    };
    format!("{}{}", encoding.prefix(), body)
}

/// Decode a multibase string.
pub fn decode(s: &str) -> Result<Vec<u8>, CoreError> {
    let mut chars = s.chars();
    let prefix = chars
        .next()
        .ok_or_else(|| CoreError::Multibase("empty string".into()))?;
    let encoding = MultibaseEncoding::from_prefix(prefix)
        .ok_or_else(|| CoreError::Multibase(format!("unsupported prefix '{}'", prefix)))?;
    let body = chars.as_str();

    match encoding {
        MultibaseEncoding::Base58Btc => bs58::decode(body)
            .into_vec()
            .map_err(|e| CoreError::Multibase(e.to_string())),
        MultibaseEncoding::Base16 => {
            hex::decode(body).map_err(|e| CoreError::Multibase(e.to_string()))
        }
    }
}

/// Decode a multibase string that must hold exactly `N` bytes.
pub fn decode_array<const N: usize>(s: &str) -> Result<[u8; N], CoreError> {
    let bytes = decode(s)?;
    bytes.as_slice().try_into().map_err(|_| {
        CoreError::Multibase(format!("expected {} bytes, got {}", N, bytes.len()))
    })
}
