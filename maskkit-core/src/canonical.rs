//! Representation-independent request encoding.
//!
//! A request is signed over its canonical byte form, not over whatever byte
//! order the wire JSON happened to arrive in: objects are rewritten with
//! their keys sorted recursively, the result is encoded as CBOR, and the
//! digest is domain-separated. Two JSON texts with the same meaning always
//! produce the same signature input.

use sha2::{Digest, Sha256};

use crate::error::Error;

/// Label prepended to canonical request bytes before hashing.
const LABEL_SIGNED_REQUEST: &[u8] = b"maskkit:signed-request";

/// Encodes `request` into its canonical byte form.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if CBOR encoding fails.
pub fn canonical_encode(request: &serde_json::Value) -> Result<Vec<u8>, Error> {
    let canonical = to_canonical(request);
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(&canonical, &mut bytes).map_err(|err| Error::Serialization {
        error: err.to_string(),
    })?;
    Ok(bytes)
}

/// The digest a request signature commits to.
///
/// # Errors
///
/// Returns [`Error::Serialization`] if canonical encoding fails.
pub fn request_digest(request: &serde_json::Value) -> Result<[u8; 32], Error> {
    let bytes = canonical_encode(request)?;
    let mut hasher = Sha256::new();
    hasher.update(LABEL_SIGNED_REQUEST);
    hasher.update(&bytes);
    Ok(hasher.finalize().into())
}

/// Rewrites a JSON value with all object keys sorted, as CBOR.
fn to_canonical(value: &serde_json::Value) -> ciborium::Value {
    match value {
        serde_json::Value::Null => ciborium::Value::Null,
        serde_json::Value::Bool(b) => ciborium::Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                ciborium::Value::Integer(i.into())
            } else if let Some(u) = n.as_u64() {
                ciborium::Value::Integer(u.into())
            } else {
                // Arbitrary-precision floats are not representation
                // independent; callers should avoid them in signed payloads.
                ciborium::Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => ciborium::Value::Text(s.clone()),
        serde_json::Value::Array(items) => {
            ciborium::Value::Array(items.iter().map(to_canonical).collect())
        }
        serde_json::Value::Object(map) => {
            let mut entries: Vec<(&String, &serde_json::Value)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            ciborium::Value::Map(
                entries
                    .into_iter()
                    .map(|(key, val)| (ciborium::Value::Text(key.clone()), to_canonical(val)))
                    .collect(),
            )
        }
    }
}
