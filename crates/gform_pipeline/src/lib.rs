//! Orchestration layer for the group-formation engine: wires `gform_io`'s
//! normalizer and policy binder to `gform_algo`'s partition/match/score/build
//! stages and assembles a `gform_core::RunResult`. Single entry point, no
//! retained state between runs.

#![forbid(unsafe_code)]

pub mod errors;
pub mod run;

pub use errors::EngineError;
pub use run::{run, NormalizationReport};
