//! Canonical identifiers used across the group-formation engine.
//! Deterministic, ASCII-only, strict shapes; no I/O.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors returned when validating or parsing IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("identifier contains non-ASCII bytes")]
    NonAscii,
    #[error("identifier exceeds the maximum length")]
    TooLong,
    #[error("identifier does not match the expected shape")]
    BadShape,
}

const TOKEN_MAX_LEN: usize = 64;
const POLICY_HASH_LEN: usize = 8;

#[inline]
fn is_ascii_no_nul(s: &str) -> bool {
    !s.as_bytes().iter().any(|&b| b == 0 || b > 0x7F)
}

/// Field/option token shape: `^[A-Za-z0-9_.:-]{1,64}$` (ASCII only).
#[inline]
pub fn is_valid_token(s: &str) -> bool {
    let bs = s.as_bytes();
    let len = bs.len();
    if len == 0 || len > TOKEN_MAX_LEN || !is_ascii_no_nul(s) {
        return false;
    }
    bs.iter().all(|&b| {
        (b'A'..=b'Z').contains(&b)
            || (b'a'..=b'z').contains(&b)
            || (b'0'..=b'9').contains(&b)
            || b == b'_'
            || b == b'.'
            || b == b':'
            || b == b'-'
    })
}

#[inline]
fn is_lowercase_hex(s: &str, len: usize) -> bool {
    s.len() == len
        && is_ascii_no_nul(s)
        && s.as_bytes()
            .iter()
            .all(|&b| (b'0'..=b'9').contains(&b) || (b'a'..=b'f').contains(&b))
}

macro_rules! simple_string_newtype {
    ($(#[$m:meta])* $name:ident) => {
        $(#[$m])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(String);

        impl $name {
            #[inline] pub fn as_str(&self) -> &str { &self.0 }
        }

        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
        }

        impl TryFrom<&str> for $name {
            type Error = IdError;
            #[inline]
            fn try_from(value: &str) -> Result<Self, Self::Error> { value.parse() }
        }
    }
}

simple_string_newtype!(
    /// Interned survey field identifier: `^[A-Za-z0-9_.:-]{1,64}$`.
    FieldId
);
simple_string_newtype!(
    /// 8-lowercase-hex prefix of `sha256(canonical_json(policy))`.
    PolicyHash
);

impl FromStr for FieldId {
    type Err = IdError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_ascii_no_nul(s) {
            return Err(IdError::NonAscii);
        }
        if s.len() > TOKEN_MAX_LEN {
            return Err(IdError::TooLong);
        }
        if !is_valid_token(s) {
            return Err(IdError::BadShape);
        }
        Ok(FieldId(s.to_owned()))
    }
}

impl FromStr for PolicyHash {
    type Err = IdError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_lowercase_hex(s, POLICY_HASH_LEN) {
            return Err(IdError::BadShape);
        }
        Ok(PolicyHash(s.to_owned()))
    }
}

impl PolicyHash {
    #[inline]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_id_accepts_tokens_and_rejects_junk() {
        for ok in ["language", "area_code", "Q1.budget", "a-b:c"] {
            let f: FieldId = ok.parse().unwrap();
            assert_eq!(f.as_str(), ok);
        }
        for bad in ["", " ", "has space", &"x".repeat(65)] {
            assert!(bad.parse::<FieldId>().is_err());
        }
    }

    #[test]
    fn policy_hash_requires_exactly_eight_hex() {
        assert!("deadbeef".parse::<PolicyHash>().is_ok());
        assert!("DEADBEEF".parse::<PolicyHash>().is_err());
        assert!("deadbee".parse::<PolicyHash>().is_err());
        assert!("deadbeefx".parse::<PolicyHash>().is_err());
    }
}
