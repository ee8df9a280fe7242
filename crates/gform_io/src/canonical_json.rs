//! Canonical JSON utilities.
//! - Objects: keys sorted lexicographically (UTF-8 codepoint order)
//! - Arrays: order preserved (caller is responsible for stable ordering)
//! - Output: compact (no extra spaces, no trailing newline)
//!
//! This is the basis for `policy_hash`: callers serialize a `Policy` (or any
//! `Serialize` value) to canonical bytes, then SHA-256 them via `hasher`.

#![allow(clippy::needless_borrow)]

use crate::IoError;

#[cfg(feature = "serde")]
use serde::Serialize;
#[cfg(feature = "serde")]
use serde_json::Value;

/// Serialize any `Serialize` value to canonical JSON bytes.
#[cfg(feature = "serde")]
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, IoError> {
    let v = serde_json::to_value(value)?;
    Ok(to_canonical_json_bytes(&v))
}

/// Convert a `serde_json::Value` to canonical JSON bytes (compact, no trailing newline).
#[cfg(feature = "serde")]
pub fn to_canonical_json_bytes(v: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(1024);
    write_canonical_value(v, &mut out);
    out
}

#[cfg(feature = "serde")]
fn write_canonical_value(v: &Value, out: &mut Vec<u8>) {
    match v {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::String(s) => {
            let quoted = serde_json::to_string(s).expect("string serialization cannot fail");
            out.extend_from_slice(quoted.as_bytes());
        }
        Value::Array(arr) => {
            out.push(b'[');
            for (i, elem) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical_value(elem, out);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            out.push(b'{');
            let mut keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
            keys.sort_unstable();
            for (i, k) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                let quoted_key = serde_json::to_string(k).expect("key serialization cannot fail");
                out.extend_from_slice(quoted_key.as_bytes());
                out.push(b':');
                write_canonical_value(&map[k], out);
            }
            out.push(b'}');
        }
    }
}

#[cfg(test)]
#[cfg(feature = "serde")]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn policy_doc_keys_are_sorted_subspace_arrays_preserved() {
        // A PolicyDoc-shaped value with its top-level keys out of order and a
        // nested object (fallback) with its own keys out of order; subspaces'
        // array order must survive untouched since field-list order is
        // meaningful there.
        let v = json!({
            "subspaces": [["language"], ["area", "language"]],
            "group_size": 6,
            "fallback": { "max_group_size": 6, "min_group_size": 4 },
            "hard": { "categorical_equal": ["language"] }
        });
        let s = String::from_utf8(to_canonical_json_bytes(&v)).unwrap();
        assert_eq!(
            s,
            r#"{"fallback":{"max_group_size":6,"min_group_size":4},"group_size":6,"hard":{"categorical_equal":["language"]},"subspaces":[["language"],["area","language"]]}"#
        );
    }

    #[test]
    fn no_trailing_newline() {
        let v = json!({"group_size": 6});
        let bytes = to_canonical_json_bytes(&v);
        assert!(!bytes.ends_with(b"\n"));
    }
}
