//! The frozen, run-scoped configuration surface: `Policy` and `AgeRules`.
//! Bound once from an external `PolicyDoc` by `gform_io::policy` and then
//! passed explicitly through every call — no global singletons.

use crate::ids::FieldId;
use std::collections::{BTreeMap, BTreeSet};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct AgeBand {
    pub name: String,
    pub min: i32,
    pub max: i32,
    pub max_spread: Option<u32>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct GroupConstraints {
    pub max_age_difference: Option<u32>,
    pub max_age_std: Option<f64>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct AgeRules {
    pub field: FieldId,
    pub bands: Vec<AgeBand>,
    pub allow_cross_band: bool,
    pub boundary_slack_years: u32,
    pub group_constraints: GroupConstraints,
}

impl AgeRules {
    /// Every band whose `[min, max]` contains `age`, in declaration order.
    pub fn bands_containing(&self, age: i32) -> impl Iterator<Item = &AgeBand> {
        self.bands.iter().filter(move |b| age >= b.min && age <= b.max)
    }

    /// First band containing `age` — used for the record's `age_band` label.
    pub fn band_label(&self, age: i32) -> Option<&str> {
        self.bands_containing(age).next().map(|b| b.name.as_str())
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CategoricalSoftMode {
    Diversity,
    Balance,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreWeights {
    pub diversity_numeric: f64,
    pub similarity_bonus: f64,
    pub categorical_diversity: f64,
    pub multi_overlap_bonus: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            diversity_numeric: 1.0,
            similarity_bonus: 0.2,
            categorical_diversity: 0.4,
            multi_overlap_bonus: 0.5,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SoftSpec {
    pub numeric_features: Vec<FieldId>,
    pub categorical: BTreeMap<FieldId, CategoricalSoftMode>,
    pub multi_choice: Vec<FieldId>,
    pub weights: ScoreWeights,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HardSpec {
    pub categorical_equal: Vec<FieldId>,
    pub multi_overlap: Vec<FieldId>,
    pub numeric_tol: BTreeMap<FieldId, f64>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Fallback {
    pub min_group_size: usize,
    pub max_group_size: usize,
    pub defer_if_infeasible: bool,
    pub allow_partial_groups: bool,
}

impl Default for Fallback {
    fn default() -> Self {
        Fallback {
            min_group_size: 6,
            max_group_size: 6,
            defer_if_infeasible: true,
            allow_partial_groups: false,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Policy {
    pub group_size: usize,
    pub subspaces: Vec<Vec<FieldId>>,
    pub hard: HardSpec,
    pub age_rules: Option<AgeRules>,
    pub soft: SoftSpec,
    pub fallback: Fallback,
    pub flexible_answers: BTreeSet<String>,
}

impl Policy {
    pub fn min_group_size(&self) -> usize {
        self.fallback.min_group_size
    }

    pub fn max_group_size(&self) -> usize {
        self.fallback.max_group_size.max(self.group_size)
    }
}
