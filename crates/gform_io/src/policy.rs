//! The Policy Binder: parses an external PolicyDoc (JSON) into the frozen
//! `gform_core::Policy`, validating every cross-reference and constraint
//! before a run is allowed to start.

use crate::errors::ConfigError;
use gform_core::{
    AgeBand, AgeRules, CategoricalSoftMode, Fallback, FieldId, FieldSpec, GroupConstraints,
    HardSpec, Policy, ScoreWeights, SoftSpec,
};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
struct HardRaw {
    categorical_equal: Vec<String>,
    multi_overlap: Vec<String>,
    numeric_tol: BTreeMap<String, f64>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
struct GroupConstraintsRaw {
    max_age_difference: Option<u32>,
    max_age_std: Option<f64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AgeBandRaw {
    name: String,
    min: i32,
    max: i32,
    max_spread: Option<u32>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
struct AgeRulesRaw {
    field: Option<String>,
    bands: Vec<AgeBandRaw>,
    allow_cross_band: bool,
    boundary_slack_years: u32,
    group_constraints: GroupConstraintsRaw,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
struct WeightsRaw {
    diversity_numeric: Option<f64>,
    similarity_bonus: Option<f64>,
    categorical_diversity: Option<f64>,
    multi_overlap_bonus: Option<f64>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
struct SoftRaw {
    numeric_features: Vec<String>,
    categorical: BTreeMap<String, String>,
    multi_choice: BTreeMap<String, String>,
    weights: WeightsRaw,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, default)]
struct FallbackRaw {
    min_group_size: Option<usize>,
    max_group_size: Option<usize>,
    defer_if_infeasible: bool,
    allow_partial_groups: bool,
}

impl Default for FallbackRaw {
    fn default() -> Self {
        FallbackRaw {
            min_group_size: None,
            max_group_size: None,
            defer_if_infeasible: true,
            allow_partial_groups: false,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
struct NormalizationRaw {
    flexible_answers: Vec<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, default)]
struct PolicyDocRaw {
    group_size: usize,
    subspaces: Vec<Vec<String>>,
    hard: HardRaw,
    age_rules: Option<AgeRulesRaw>,
    soft: SoftRaw,
    fallback: FallbackRaw,
    normalization: NormalizationRaw,
}

impl Default for PolicyDocRaw {
    fn default() -> Self {
        PolicyDocRaw {
            group_size: 6,
            subspaces: Vec::new(),
            hard: HardRaw::default(),
            age_rules: None,
            soft: SoftRaw::default(),
            fallback: FallbackRaw::default(),
            normalization: NormalizationRaw::default(),
        }
    }
}

/// Parse and bind a PolicyDoc JSON document against a frozen field schema.
pub fn bind_policy(schema: &[FieldSpec], doc_json: &str) -> Result<Policy, ConfigError> {
    let raw: PolicyDocRaw = serde_json::from_str(doc_json)
        .map_err(|e| ConfigError::Malformed(e.to_string()))?;
    bind_policy_raw(schema, raw)
}

fn known_field<'a>(schema: &'a [FieldSpec], name: &str) -> Result<&'a FieldSpec, ConfigError> {
    schema
        .iter()
        .find(|f| f.id.as_str() == name)
        .ok_or_else(|| ConfigError::UnknownField(name.to_string()))
}

fn field_id(name: &str) -> Result<FieldId, ConfigError> {
    name.parse()
        .map_err(|_| ConfigError::UnknownField(name.to_string()))
}

fn bind_policy_raw(schema: &[FieldSpec], raw: PolicyDocRaw) -> Result<Policy, ConfigError> {
    if raw.group_size < 2 {
        return Err(ConfigError::GroupSizeTooSmall(raw.group_size));
    }
    for field in schema {
        check_expansion_subset(field)?;
    }
    for f in &raw.hard.categorical_equal {
        known_field(schema, f)?;
    }
    for f in &raw.hard.multi_overlap {
        known_field(schema, f)?;
    }
    for (f, tol) in &raw.hard.numeric_tol {
        known_field(schema, f)?;
        if *tol <= 0.0 {
            return Err(ConfigError::NonPositiveTolerance {
                field: f.clone(),
                value: *tol,
            });
        }
    }
    for sub in &raw.subspaces {
        for f in sub {
            known_field(schema, f)?;
        }
    }
    for f in &raw.soft.numeric_features {
        known_field(schema, f)?;
    }
    for f in raw.soft.categorical.keys() {
        known_field(schema, f)?;
    }
    for f in raw.soft.multi_choice.keys() {
        known_field(schema, f)?;
    }

    let hard = HardSpec {
        categorical_equal: raw
            .hard
            .categorical_equal
            .iter()
            .map(|s| field_id(s))
            .collect::<Result<_, _>>()?,
        multi_overlap: raw
            .hard
            .multi_overlap
            .iter()
            .map(|s| field_id(s))
            .collect::<Result<_, _>>()?,
        numeric_tol: raw
            .hard
            .numeric_tol
            .iter()
            .map(|(k, v)| Ok((field_id(k)?, *v)))
            .collect::<Result<_, ConfigError>>()?,
    };

    let age_rules = match raw.age_rules {
        None => None,
        Some(ar) => {
            if ar.bands.is_empty() {
                return Err(ConfigError::EmptyAgeBands);
            }
            let field_name = ar
                .field
                .ok_or_else(|| ConfigError::Malformed("age_rules.field is required".into()))?;
            known_field(schema, &field_name)?;
            let bands = ar
                .bands
                .into_iter()
                .map(|b| AgeBand {
                    name: b.name,
                    min: b.min,
                    max: b.max,
                    max_spread: b.max_spread,
                })
                .collect();
            Some(AgeRules {
                field: field_id(&field_name)?,
                bands,
                allow_cross_band: ar.allow_cross_band,
                boundary_slack_years: ar.boundary_slack_years,
                group_constraints: GroupConstraints {
                    max_age_difference: ar.group_constraints.max_age_difference,
                    max_age_std: ar.group_constraints.max_age_std,
                },
            })
        }
    };

    let mut weights = ScoreWeights::default();
    if let Some(v) = raw.soft.weights.diversity_numeric {
        check_nonneg("diversity_numeric", v)?;
        weights.diversity_numeric = v;
    }
    if let Some(v) = raw.soft.weights.similarity_bonus {
        check_nonneg("similarity_bonus", v)?;
        weights.similarity_bonus = v;
    }
    if let Some(v) = raw.soft.weights.categorical_diversity {
        check_nonneg("categorical_diversity", v)?;
        weights.categorical_diversity = v;
    }
    if let Some(v) = raw.soft.weights.multi_overlap_bonus {
        check_nonneg("multi_overlap_bonus", v)?;
        weights.multi_overlap_bonus = v;
    }

    let categorical = raw
        .soft
        .categorical
        .iter()
        .map(|(k, v)| {
            let mode = match v.as_str() {
                "diversity" => CategoricalSoftMode::Diversity,
                "balance" => CategoricalSoftMode::Balance,
                other => {
                    return Err(ConfigError::Malformed(format!(
                        "soft.categorical.{k}: unknown mode {other}"
                    )))
                }
            };
            Ok((field_id(k)?, mode))
        })
        .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;

    let soft = SoftSpec {
        numeric_features: raw
            .soft
            .numeric_features
            .iter()
            .map(|s| field_id(s))
            .collect::<Result<_, _>>()?,
        categorical,
        multi_choice: raw
            .soft
            .multi_choice
            .keys()
            .map(|s| field_id(s))
            .collect::<Result<_, _>>()?,
        weights,
    };

    let min_group_size = raw.fallback.min_group_size.unwrap_or(raw.group_size);
    let max_group_size = raw.fallback.max_group_size.unwrap_or(raw.group_size);
    if !(min_group_size <= raw.group_size && raw.group_size <= max_group_size) {
        return Err(ConfigError::GroupSizeOutOfOrder {
            min: min_group_size,
            size: raw.group_size,
            max: max_group_size,
        });
    }

    let subspaces = raw
        .subspaces
        .iter()
        .map(|sub| sub.iter().map(|s| field_id(s)).collect::<Result<Vec<_>, _>>())
        .collect::<Result<Vec<_>, ConfigError>>()?;

    let flexible_answers: BTreeSet<String> = raw.normalization.flexible_answers.into_iter().collect();

    Ok(Policy {
        group_size: raw.group_size,
        subspaces,
        hard,
        age_rules,
        soft,
        fallback: Fallback {
            min_group_size,
            max_group_size,
            defer_if_infeasible: raw.fallback.defer_if_infeasible,
            allow_partial_groups: raw.fallback.allow_partial_groups,
        },
        flexible_answers,
    })
}

fn check_nonneg(name: &'static str, v: f64) -> Result<(), ConfigError> {
    if v < 0.0 {
        return Err(ConfigError::NegativeWeight {
            name: name.to_string(),
            value: v,
        });
    }
    Ok(())
}

/// A field's wildcard expansion must be a subset of its declared options.
/// Promoted from the source system's debug-level warning to a binder-time
/// `ConfigError`: an expansion escaping its own field's options is a policy
/// authoring bug, not a runtime condition.
pub fn check_expansion_subset(field: &FieldSpec) -> Result<(), ConfigError> {
    if field.options.is_empty() {
        return Ok(());
    }
    if field
        .normalization
        .expansion
        .iter()
        .all(|v| field.options.contains(v))
    {
        Ok(())
    } else {
        Err(ConfigError::ExpansionNotSubset {
            field: field.id.as_str().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gform_core::{FieldKind, FieldNormalization, FieldRole};

    fn schema() -> Vec<FieldSpec> {
        vec![
            FieldSpec {
                id: "language".parse().unwrap(),
                kind: FieldKind::SingleSelect,
                options: ["he", "en"].iter().map(|s| s.to_string()).collect(),
                numeric_min: None,
                numeric_max: None,
                role: FieldRole::Hard,
                normalization: FieldNormalization::default(),
                text_max_len: None,
            },
            FieldSpec {
                id: "budget".parse().unwrap(),
                kind: FieldKind::Numeric,
                options: Default::default(),
                numeric_min: Some(0.0),
                numeric_max: Some(100.0),
                role: FieldRole::Hard,
                normalization: FieldNormalization::default(),
                text_max_len: None,
            },
        ]
    }

    #[test]
    fn binds_minimal_policy() {
        let doc = r#"{"group_size":6,"hard":{"categorical_equal":["language"]}}"#;
        let p = bind_policy(&schema(), doc).unwrap();
        assert_eq!(p.group_size, 6);
        assert_eq!(p.hard.categorical_equal.len(), 1);
        assert_eq!(p.min_group_size(), 6);
    }

    #[test]
    fn rejects_unknown_field() {
        let doc = r#"{"group_size":6,"hard":{"categorical_equal":["nope"]}}"#;
        assert!(matches!(
            bind_policy(&schema(), doc),
            Err(ConfigError::UnknownField(_))
        ));
    }

    #[test]
    fn rejects_non_positive_tolerance() {
        let doc = r#"{"group_size":6,"hard":{"numeric_tol":{"budget":0}}}"#;
        assert!(matches!(
            bind_policy(&schema(), doc),
            Err(ConfigError::NonPositiveTolerance { .. })
        ));
    }

    #[test]
    fn rejects_group_size_out_of_order() {
        let doc = r#"{"group_size":6,"fallback":{"min_group_size":7}}"#;
        assert!(matches!(
            bind_policy(&schema(), doc),
            Err(ConfigError::GroupSizeOutOfOrder { .. })
        ));
    }

    #[test]
    fn rejects_group_size_below_two() {
        for doc in [r#"{"group_size":0}"#, r#"{"group_size":1}"#] {
            assert!(matches!(
                bind_policy(&schema(), doc),
                Err(ConfigError::GroupSizeTooSmall(_))
            ));
        }
    }

    #[test]
    fn rejects_unknown_top_level_key() {
        let doc = r#"{"group_size":6,"bogus":true}"#;
        assert!(bind_policy(&schema(), doc).is_err());
    }
}
