//! Survey field schema: the immutable, load-time-frozen description of every
//! question the normalizer and policy binder can refer to.

use crate::ids::FieldId;
use std::collections::BTreeSet;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Scale,
    SingleSelect,
    MultiSelect,
    Text,
}

/// Where a field sits relative to grouping: does it gate feasibility, rank
/// candidates, merely identify the respondent, or exist only for
/// human-readable explanation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldRole {
    Hard,
    Soft,
    Identifier,
    Explain,
}

/// Per-field normalization behavior: wildcard tokens, their expansion set,
/// and any synonym remapping applied before wildcard detection.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldNormalization {
    pub wildcards: BTreeSet<String>,
    pub expansion: BTreeSet<String>,
    pub synonyms: std::collections::BTreeMap<String, String>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub id: FieldId,
    pub kind: FieldKind,
    pub options: BTreeSet<String>,
    pub numeric_min: Option<f64>,
    pub numeric_max: Option<f64>,
    pub role: FieldRole,
    pub normalization: FieldNormalization,
    pub text_max_len: Option<usize>,
}

impl FieldSpec {
    pub fn is_select(&self) -> bool {
        matches!(self.kind, FieldKind::SingleSelect | FieldKind::MultiSelect)
    }

    /// The set a wildcard on this field expands to: the declared expansion
    /// if non-empty, else every declared option, else the value itself
    /// (handled by the caller, since that requires the original value).
    pub fn expansion_or_all_options(&self) -> BTreeSet<String> {
        if !self.normalization.expansion.is_empty() {
            self.normalization.expansion.clone()
        } else {
            self.options.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(kind: FieldKind) -> FieldSpec {
        FieldSpec {
            id: "language".parse().unwrap(),
            kind,
            options: ["he", "en"].iter().map(|s| s.to_string()).collect(),
            numeric_min: None,
            numeric_max: None,
            role: FieldRole::Hard,
            normalization: FieldNormalization::default(),
            text_max_len: None,
        }
    }

    #[test]
    fn expansion_falls_back_to_all_options_when_unset() {
        let f = field(FieldKind::SingleSelect);
        assert_eq!(f.expansion_or_all_options(), f.options);
    }

    #[test]
    fn is_select_only_true_for_select_kinds() {
        assert!(field(FieldKind::SingleSelect).is_select());
        assert!(field(FieldKind::MultiSelect).is_select());
        assert!(!field(FieldKind::Numeric).is_select());
    }
}
