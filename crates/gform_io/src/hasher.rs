//! SHA-256 hashing over canonical JSON bytes, plus the `policy_hash`
//! truncation rule (first 8 lowercase hex characters).
//!
//! Deterministic: same canonical structure => same lowercase hex across OS/arch.

#![forbid(unsafe_code)]

use crate::IoError;

#[cfg(feature = "hash")]
use digest::Digest;
#[cfg(feature = "hash")]
use sha2::Sha256;

#[cfg(all(feature = "hash", feature = "serde"))]
use crate::canonical_json::to_canonical_bytes;
#[cfg(all(feature = "hash", feature = "serde"))]
use serde::Serialize;

const POLICY_HASH_LEN: usize = 8;

/// Lowercase 64-hex SHA-256 of raw bytes.
#[cfg(feature = "hash")]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(not(feature = "hash"))]
pub fn sha256_hex(_bytes: &[u8]) -> String {
    String::new()
}

/// SHA-256 of the canonical JSON representation of `value`.
#[cfg(all(feature = "hash", feature = "serde"))]
pub fn sha256_canonical<T: Serialize>(value: &T) -> Result<String, IoError> {
    let bytes = to_canonical_bytes(value)?;
    Ok(sha256_hex(&bytes))
}

#[cfg(not(all(feature = "hash", feature = "serde")))]
pub fn sha256_canonical<T>(_value: &T) -> Result<String, IoError> {
    Err(IoError::Hash("hash+serde features required".into()))
}

/// True iff `s` is lowercase hex of the given length.
pub fn is_lowercase_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.as_bytes().iter().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Truncate a full hex digest to `len` characters.
pub fn short_hex(full_hex: &str, len: usize) -> Result<String, IoError> {
    if len == 0 || len > full_hex.len() {
        return Err(IoError::Hash("short_hex length out of range".into()));
    }
    if !full_hex.as_bytes().iter().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(IoError::Hash("short_hex expects lowercase hex".into()));
    }
    Ok(full_hex[..len].to_string())
}

/// `policy_hash` = first 8 lowercase hex chars of `sha256(canonical_json(policy))`.
#[cfg(all(feature = "hash", feature = "serde"))]
pub fn policy_hash<T: Serialize>(policy: &T) -> Result<gform_core::PolicyHash, IoError> {
    let full = sha256_canonical(policy)?;
    let short = short_hex(&full, POLICY_HASH_LEN)?;
    short
        .parse()
        .map_err(|e: gform_core::IdError| IoError::Invalid(e.to_string()))
}

#[cfg(not(all(feature = "hash", feature = "serde")))]
pub fn policy_hash<T>(_policy: &T) -> Result<gform_core::PolicyHash, IoError> {
    Err(IoError::Hash("hash+serde features required".into()))
}

#[cfg(test)]
#[cfg(all(feature = "hash", feature = "serde"))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn policy_hash_is_eight_lowercase_hex_and_deterministic() {
        let p = json!({"group_size": 6, "subspaces": [["language"]]});
        let a = policy_hash(&p).unwrap();
        let b = policy_hash(&p).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_hex().len(), 8);
    }

    #[test]
    fn short_hex_truncates() {
        let full = sha256_hex(b"hello");
        let short = short_hex(&full, 8).unwrap();
        assert_eq!(short, &full[..8]);
    }
}
