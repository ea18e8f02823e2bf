//! Golden test vectors for canonical JSON.
//!
//! Every signature and token hash covers canonical bytes, so any
//! implementation talking to the service must reproduce these exactly.

use serde_json::Value;

use tas_core::canonical::canonical_value_bytes;
use tas_core::digest;

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct CanonicalVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Input JSON, in arbitrary key order.
    pub input: &'static str,
    /// Expected canonical encoding.
    pub canonical: &'static str,
    /// Expected SHA-256 of the canonical encoding (hex).
    pub sha256: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<CanonicalVector> {
    vec![
        CanonicalVector {
            name: "flat object with unsorted keys",
            input: r#"{"b":1,"a":"x","c":[3,2,1]}"#,
            canonical: r#"{"a":"x","b":1,"c":[3,2,1]}"#,
            sha256: "a4cabc3a50b17862a15f620eea5fc04491c86ab99d257d097f6ba43d0905bd0c",
        },
        CanonicalVector {
            name: "nested objects inside arrays",
            input: r#"{"z":{"y":true,"x":null},"a":[{"d":1,"c":2}]}"#,
            canonical: r#"{"a":[{"c":2,"d":1}],"z":{"x":null,"y":true}}"#,
            sha256: "2879e8f5c13859cdb160da9908061c8e788d5e3982afa1d24e87b08a4f9da9a9",
        },
        CanonicalVector {
            name: "escaped string",
            input: r#"{"msg":"line\nbreak \"quoted\""}"#,
            canonical: r#"{"msg":"line\nbreak \"quoted\""}"#,
            sha256: "08e8106c22fce10c8807d0fa9d6c0040f4cedfee9c7e381a49f62288e4e132b6",
        },
        CanonicalVector {
            name: "proof without proofValue",
            input: r#"{"type":"Secp256r1Signature2018","created":"2024-01-01T00:00:00Z","verificationMethod":"did:omn:tas#assert","proofPurpose":"assertionMethod"}"#,
            canonical: r#"{"created":"2024-01-01T00:00:00Z","proofPurpose":"assertionMethod","type":"Secp256r1Signature2018","verificationMethod":"did:omn:tas#assert"}"#,
            sha256: "b9d84090573fba35b1aeb13b55efc59eb1cc9e9585bec403e0699e11f897d278",
        },
        CanonicalVector {
            name: "keys sort by byte value",
            input: r#"{"b":1,"B":2,"@context":[]}"#,
            canonical: r#"{"@context":[],"B":2,"b":1}"#,
            sha256: "e7e36593c6350935933a231a0e9718254ae7f8212f07250a303983210fa7c734",
        },
        CanonicalVector {
            name: "non-ASCII text stays UTF-8",
            input: r#"{"name":"café","age":30}"#,
            canonical: r#"{"age":30,"name":"café"}"#,
            sha256: "77dfacc234c527961bac26cd48e89fec627b98ab5aa9f9e55cf6d8eb94025b0d",
        },
        CanonicalVector {
            name: "empty object",
            input: "{}",
            canonical: "{}",
            sha256: "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a",
        },
    ]
}

/// Canonicalize a vector's input.
pub fn canonicalize(vector: &CanonicalVector) -> Vec<u8> {
    match serde_json::from_str::<Value>(vector.input) {
        Ok(value) => canonical_value_bytes(&value),
        Err(_) => Vec::new(),
    }
}

/// Check every vector. Returns `(name, matches, digest)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let bytes = canonicalize(v);
            let hex = digest(&bytes).to_hex();
            let matches = bytes == v.canonical.as_bytes() && hex == v.sha256;
            (v.name.to_string(), matches, hex)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_match() {
        for (name, matches, hex) in verify_all_vectors() {
            assert!(matches, "vector '{name}' produced {hex}");
        }
    }

    #[test]
    fn test_canonical_output_is_a_fixed_point() {
        for vector in all_vectors() {
            let once = canonicalize(&vector);
            let value: Value = serde_json::from_slice(&once).unwrap();
            assert_eq!(
                canonical_value_bytes(&value),
                once,
                "vector '{}' is not stable",
                vector.name
            );
        }
    }
}
