//! Algorithm layer for the group-formation engine: subspace partitioning,
//! compatibility matrix construction, memoized group scoring, and the greedy
//! group builder. Depends only on `gform_core`; no I/O, no policy parsing.

#![forbid(unsafe_code)]

pub mod builder;
pub mod compat;
pub mod scorer;
pub mod subspace;

pub use builder::build_group;
pub use compat::{build_compatibility_matrix, CompatibilityMatrix};
pub use scorer::{score_group, ScoreCache};
pub use subspace::{partition, subspace_key, Subspace};
