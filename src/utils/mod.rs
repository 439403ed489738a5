//! Utility functions and helpers.

pub mod filename;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Top-level payload field ignored when comparing snapshot contents.
const VOLATILE_FIELD: &str = "timestamp";

/// Content fingerprint of a snapshot payload.
///
/// SHA-256 over the canonical (key-sorted) JSON encoding, ignoring a
/// top-level `timestamp` field so that re-scrapes of unchanged state match.
pub fn fingerprint(payload: &Value) -> String {
    let canonical = match payload {
        Value::Object(map) if map.contains_key(VOLATILE_FIELD) => {
            let mut map = map.clone();
            map.remove(VOLATILE_FIELD);
            Value::Object(map).to_string()
        }
        other => other.to_string(),
    };
    hex::encode(Sha256::digest(canonical.as_bytes()))
}
