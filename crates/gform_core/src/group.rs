//! `Group`, `Explanation`, and the run-level `RunStats`/`RunResult` shapes
//! emitted by the run driver.

use crate::ids::PolicyHash;
use std::collections::BTreeMap;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    pub members: Vec<usize>,
    pub score: f64,
}

/// Per-term soft score contributions, kept separately from the scalar total
/// so explanations can show a breakdown without re-deriving it.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoreBreakdown {
    pub diversity_numeric: f64,
    pub similarity_bonus: f64,
    pub categorical_diversity: f64,
    pub multi_overlap_bonus: f64,
    pub total: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Explanation {
    pub policy_hash: PolicyHash,
    pub subspace_key: BTreeMap<String, String>,
    pub age_band: Option<String>,
    pub hard_constraint_summary: Vec<String>,
    pub soft_scores: ScoreBreakdown,
    /// Per member, the reasons it was compatible with the rest of the group
    /// (e.g. `"language=he"`, `"area_overlap"`, `"budget±2"`, `"age_band:20-29"`).
    pub bound_by: BTreeMap<usize, Vec<String>>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunStats {
    pub total_records: usize,
    pub total_groups: usize,
    pub ungrouped_indices: Vec<usize>,
    pub group_sizes: Vec<usize>,
    pub avg_group_size: f64,
    pub avg_group_score: f64,
    pub runtime_warnings: usize,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunResult {
    pub groups: Vec<Group>,
    pub explanations: Vec<Explanation>,
    pub stats: RunStats,
}
