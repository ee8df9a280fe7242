//! Unified error type for `gform_io`: wraps the policy binder's
//! `ConfigError` and the normalizer's `DataError` as variants, alongside
//! plain I/O/JSON/hash failures.

use thiserror::Error;

/// Policy document is malformed or self-contradictory. Fatal to the run;
/// raised synchronously by the policy binder before normalization begins.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown policy key: {0}")]
    UnknownKey(String),

    #[error("policy references unknown field: {0}")]
    UnknownField(String),

    #[error("numeric tolerance for {field} must be positive, got {value}")]
    NonPositiveTolerance { field: String, value: f64 },

    #[error("soft weight {name} must be non-negative, got {value}")]
    NegativeWeight { name: String, value: f64 },

    #[error("age_rules.bands must be non-empty when age_rules is present")]
    EmptyAgeBands,

    #[error("group_size must be >= 2, got {0}")]
    GroupSizeTooSmall(usize),

    #[error("min_group_size ({min}) must be <= group_size ({size}) <= max_group_size ({max})")]
    GroupSizeOutOfOrder { min: usize, size: usize, max: usize },

    #[error("field {field}'s wildcard expansion is not a subset of its declared options")]
    ExpansionNotSubset { field: String },

    #[error("malformed policy document: {0}")]
    Malformed(String),
}

/// A single response fails normalization. Excludes that record from the run's
/// FeaturesTable rather than aborting the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("participant {participant}: required field {field} is missing")]
    MissingRequiredField { participant: usize, field: String },

    #[error("participant {participant}: field {field} is not a valid number: {raw}")]
    UnparseableNumeric {
        participant: usize,
        field: String,
        raw: String,
    },

    #[error("participant {participant}: field {field} value {value} is outside declared bounds")]
    OutOfBounds {
        participant: usize,
        field: String,
        value: f64,
    },

    #[error("participant {participant}: field {field} has unknown option {value} and no wildcard match")]
    UnknownOption {
        participant: usize,
        field: String,
        value: String,
    },
}

#[derive(Debug, Error)]
pub enum IoError {
    #[error("io/path error: {0}")]
    Path(String),

    #[error("json error at {pointer}: {msg}")]
    Json { pointer: String, msg: String },

    #[error("hash error: {0}")]
    Hash(String),

    #[error("invalid: {0}")]
    Invalid(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),
}

pub type IoResult<T> = Result<T, IoError>;

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        IoError::Json {
            pointer: "/".to_string(),
            msg: e.to_string(),
        }
    }
}
