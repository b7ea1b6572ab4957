//! Canonical JSON and content digests.
//!
//! Two structurally equal payloads must hash the same no matter how their
//! maps were built, so object keys are sorted explicitly rather than
//! relying on the map type `serde_json` happens to be compiled with.

use crate::CodecError;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Render a JSON value canonically: object keys sorted by byte order at
/// every depth, no insignificant whitespace.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(val, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        // Scalars have exactly one rendering in serde_json.
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Lowercase hex SHA-256 of raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Digest of a JSON value: SHA-256 over its canonical rendering.
pub fn hash_value(value: &Value) -> String {
    sha256_hex(canonical_json(value).as_bytes())
}

/// Digest of any serializable payload.
pub fn hash_payload<T: Serialize + ?Sized>(payload: &T) -> Result<String, CodecError> {
    let value = serde_json::to_value(payload)?;
    Ok(hash_value(&value))
}

/// The payload hashed in place of a response when the call failed.
pub fn error_payload(message: &str) -> Value {
    serde_json::json!({ "error": message })
}
