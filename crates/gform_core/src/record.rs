//! `FeatureRecord`: one normalized survey response. Produced once by
//! `gform_io`'s normalizer and cached for the lifetime of a run.

use crate::ids::FieldId;
use std::collections::{BTreeMap, BTreeSet};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureRecord {
    /// Row index in the run's FeaturesTable snapshot; the participant
    /// identity used throughout the engine.
    pub participant_index: usize,
    pub numeric: BTreeMap<FieldId, f64>,
    pub categorical: BTreeMap<FieldId, BTreeSet<String>>,
    pub multi: BTreeMap<FieldId, BTreeSet<String>>,
    pub age_band: Option<String>,
}

impl FeatureRecord {
    pub fn new(participant_index: usize) -> Self {
        FeatureRecord {
            participant_index,
            ..Default::default()
        }
    }

    pub fn numeric_value(&self, field: &FieldId) -> Option<f64> {
        self.numeric.get(field).copied()
    }

    pub fn categorical_set(&self, field: &FieldId) -> Option<&BTreeSet<String>> {
        self.categorical.get(field)
    }

    pub fn multi_set(&self, field: &FieldId) -> Option<&BTreeSet<String>> {
        self.multi.get(field)
    }
}
