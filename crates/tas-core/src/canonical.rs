//! Canonical JSON encoding for deterministic signing.
//!
//! This module implements the proof codec used by every signed payload:
//! - Object keys sorted lexicographically by UTF-8 bytes, recursively
//! - No insignificant whitespace
//! - Strings escaped exactly as `serde_json` escapes them
//! - `proofValue` stripped before hashing
//!
//! The signing message of a payload is
//! `SHA-256(canonical_bytes(strip_proof(payload)))`.

use serde::Serialize;
use serde_json::Value;

use crate::crypto::Sha256Hash;
use crate::error::CoreError;
use crate::proof::Proofed;

/// Encode any serializable value to canonical JSON bytes.
pub fn canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CoreError> {
    let value = serde_json::to_value(value).map_err(|e| CoreError::EncodingError(e.to_string()))?;
    Ok(canonical_value_bytes(&value))
}

/// Encode a JSON value to canonical bytes.
pub fn canonical_value_bytes(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Recursively encode a JSON value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.extend_from_slice(b"null"),
        Value::Bool(b) => buf.extend_from_slice(if *b { b"true" } else { b"false" }),
        Value::Number(n) => buf.extend_from_slice(n.to_string().as_bytes()),
        Value::String(s) => encode_string(buf, s),
        Value::Array(arr) => {
            buf.push(b'[');
            for (i, item) in arr.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                encode_value_to(buf, item);
            }
            buf.push(b']');
        }
        Value::Object(map) => {
            // Sort by key bytes regardless of the map's iteration order
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            buf.push(b'{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                encode_string(buf, key);
                buf.push(b':');
                encode_value_to(buf, value);
            }
            buf.push(b'}');
        }
    }
}

fn encode_string(buf: &mut Vec<u8>, s: &str) {
    // Serializing a &str cannot fail
    match serde_json::to_string(s) {
        Ok(escaped) => buf.extend_from_slice(escaped.as_bytes()),
        Err(_) => buf.extend_from_slice(b"\"\""),
    }
}

/// Compute the SHA-256 digest of bytes.
pub fn digest(bytes: &[u8]) -> Sha256Hash {
    Sha256Hash::hash(bytes)
}

/// Return a copy of the payload with every `proofValue` removed.
///
/// All other fields, including the remaining proof fields, are kept.
pub fn strip_proof<T: Proofed>(value: &T) -> T {
    let mut stripped = value.clone();
    for proof in stripped.proofs_mut() {
        proof.proof_value = None;
    }
    stripped
}

/// The message that is signed for a proof-bearing payload.
pub fn signing_message<T: Proofed>(value: &T) -> Result<Sha256Hash, CoreError> {
    let bytes = canonical_bytes(&strip_proof(value))?;
    Ok(digest(&bytes))
}
