//! I/O layer for the group-formation engine: canonical JSON, SHA-256-based
//! policy hashing, the Policy Binder, survey schema parsing, and the
//! Normalizer. No network access; every input is a caller-supplied string or
//! path.

#![forbid(unsafe_code)]

pub mod canonical_json;
pub mod errors;
pub mod hasher;
pub mod normalizer;
pub mod policy;
pub mod schema;
pub mod shape;

pub use errors::{ConfigError, DataError, IoError, IoResult};
pub use shape::{validate_response_shape, ShapeIssue};

pub mod prelude {
    pub use crate::canonical_json::{to_canonical_bytes, to_canonical_json_bytes};
    pub use crate::errors::{ConfigError, DataError, IoError, IoResult};
    pub use crate::hasher::{policy_hash, sha256_canonical, sha256_hex, short_hex};
    pub use crate::normalizer::{canonicalize_text, normalize_record};
    pub use crate::policy::bind_policy;
    pub use crate::schema::parse_schema;
    pub use crate::shape::{validate_response_shape, ShapeIssue};
}
