//! The Normalizer: raw response row -> `FeatureRecord`.
//!
//! Canonicalization strips RTL/LTR marks and collapses whitespace runs before
//! any comparison happens, so a flexible-answer or synonym match never fails
//! because of an invisible directionality mark copied out of a browser.

use crate::errors::DataError;
use gform_core::{AgeRules, FeatureRecord, FieldKind, FieldSpec, Policy};
use serde_json::Value;
use std::collections::BTreeSet;

const RTL_MARK: char = '\u{200F}';
const LTR_MARK: char = '\u{200E}';

/// Strip RTL/LTR marks and collapse whitespace runs to single spaces.
pub fn canonicalize_text(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|&c| c != RTL_MARK && c != LTR_MARK).collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_flexible_answer(value: &str, field: &FieldSpec, policy: &Policy) -> bool {
    field.normalization.wildcards.contains(value) || policy.flexible_answers.contains(value)
}

fn resolve_synonym(value: &str, field: &FieldSpec) -> String {
    field
        .normalization
        .synonyms
        .get(value)
        .cloned()
        .unwrap_or_else(|| value.to_string())
}

fn expand_or_singleton(value: &str, field: &FieldSpec, policy: &Policy) -> BTreeSet<String> {
    if is_flexible_answer(value, field, policy) {
        let set = field.expansion_or_all_options();
        if set.is_empty() {
            [value.to_string()].into_iter().collect()
        } else {
            set
        }
    } else {
        [value.to_string()].into_iter().collect()
    }
}

fn normalize_select_value(
    participant: usize,
    field: &FieldSpec,
    policy: &Policy,
    raw_value: &str,
) -> Result<BTreeSet<String>, DataError> {
    let trimmed = canonicalize_text(raw_value);
    let resolved = resolve_synonym(&trimmed, field);
    let is_wild = is_flexible_answer(&resolved, field, policy);
    if !is_wild && !field.options.is_empty() && !field.options.contains(&resolved) {
        return Err(DataError::UnknownOption {
            participant,
            field: field.id.as_str().to_string(),
            value: resolved,
        });
    }
    Ok(expand_or_singleton(&resolved, field, policy))
}

/// Multi-select accepts a JSON array as the structured form; a bare comma
/// separated string is accepted as a documented legacy fallback.
fn multi_select_parts(raw: &Value) -> Vec<String> {
    match raw {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
        Value::String(s) => s.split(',').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect(),
        _ => Vec::new(),
    }
}

fn value_as_str(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_f64(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Normalize one raw response row into a `FeatureRecord`. `raw` maps field
/// names to JSON values (numbers, strings, or arrays for multi-select).
pub fn normalize_record(
    schema: &[FieldSpec],
    policy: &Policy,
    participant_index: usize,
    raw: &std::collections::BTreeMap<String, Value>,
) -> Result<FeatureRecord, DataError> {
    let mut record = FeatureRecord::new(participant_index);
    let age_field = policy.age_rules.as_ref().map(|ar| ar.field.as_str().to_string());

    for field in schema {
        let name = field.id.as_str();
        let present = raw.get(name);

        match field.kind {
            FieldKind::Numeric | FieldKind::Scale => {
                let Some(v) = present else {
                    if matches!(field.role, gform_core::FieldRole::Hard) {
                        return Err(DataError::MissingRequiredField {
                            participant: participant_index,
                            field: name.to_string(),
                        });
                    }
                    continue;
                };
                let parsed = value_as_f64(v).ok_or_else(|| DataError::UnparseableNumeric {
                    participant: participant_index,
                    field: name.to_string(),
                    raw: v.to_string(),
                })?;
                if let Some(min) = field.numeric_min {
                    if parsed < min {
                        return Err(DataError::OutOfBounds {
                            participant: participant_index,
                            field: name.to_string(),
                            value: parsed,
                        });
                    }
                }
                if let Some(max) = field.numeric_max {
                    if parsed > max {
                        return Err(DataError::OutOfBounds {
                            participant: participant_index,
                            field: name.to_string(),
                            value: parsed,
                        });
                    }
                }
                record.numeric.insert(field.id.clone(), parsed);

                if age_field.as_deref() == Some(name) {
                    if let Some(ar) = &policy.age_rules {
                        record.age_band = band_label_with_slack(ar, parsed);
                    }
                }
            }
            FieldKind::SingleSelect => {
                let Some(v) = present else {
                    if matches!(field.role, gform_core::FieldRole::Hard) {
                        return Err(DataError::MissingRequiredField {
                            participant: participant_index,
                            field: name.to_string(),
                        });
                    }
                    continue;
                };
                let Some(raw_str) = value_as_str(v) else {
                    return Err(DataError::UnknownOption {
                        participant: participant_index,
                        field: name.to_string(),
                        value: v.to_string(),
                    });
                };
                let set = normalize_select_value(participant_index, field, policy, &raw_str)?;
                record.categorical.insert(field.id.clone(), set);
            }
            FieldKind::MultiSelect => {
                let Some(v) = present else {
                    if matches!(field.role, gform_core::FieldRole::Hard) {
                        return Err(DataError::MissingRequiredField {
                            participant: participant_index,
                            field: name.to_string(),
                        });
                    }
                    continue;
                };
                let mut union = BTreeSet::new();
                for part in multi_select_parts(v) {
                    let expanded = normalize_select_value(participant_index, field, policy, &part)?;
                    union.extend(expanded);
                }
                record.multi.insert(field.id.clone(), union);
            }
            FieldKind::Text => {
                // Carried for explain only; not used by the engine. Validate
                // length if declared, otherwise drop it on the floor.
                if let Some(v) = present {
                    if let Some(s) = value_as_str(v) {
                        let canon = canonicalize_text(&s);
                        if let Some(max_len) = field.text_max_len {
                            if canon.chars().count() > max_len {
                                return Err(DataError::OutOfBounds {
                                    participant: participant_index,
                                    field: name.to_string(),
                                    value: canon.chars().count() as f64,
                                });
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(record)
}

/// Resolve the displayed age-band label, applying `boundary_slack_years` at
/// a band edge before falling back to the first strictly-containing band.
fn band_label_with_slack(ar: &AgeRules, age: f64) -> Option<String> {
    let age_i = age.round() as i32;
    if let Some(label) = ar.band_label(age_i) {
        return Some(label.to_string());
    }
    if ar.boundary_slack_years == 0 {
        return None;
    }
    let slack = ar.boundary_slack_years as i32;
    ar.bands
        .iter()
        .find(|b| age_i >= b.min - slack && age_i <= b.max + slack)
        .map(|b| b.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gform_core::{FieldNormalization, FieldRole, Policy};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn language_field() -> FieldSpec {
        FieldSpec {
            id: "language".parse().unwrap(),
            kind: FieldKind::SingleSelect,
            options: ["he", "en"].iter().map(|s| s.to_string()).collect(),
            numeric_min: None,
            numeric_max: None,
            role: FieldRole::Hard,
            normalization: FieldNormalization::default(),
            text_max_len: None,
        }
    }

    fn base_policy() -> Policy {
        Policy {
            group_size: 6,
            subspaces: vec![],
            hard: Default::default(),
            age_rules: None,
            soft: Default::default(),
            fallback: Default::default(),
            flexible_answers: ["doesn't matter".to_string()].into_iter().collect(),
        }
    }

    #[test]
    fn canonicalize_text_strips_direction_marks_and_collapses_whitespace() {
        let raw = format!("he{}  llo   world{}", RTL_MARK, LTR_MARK);
        assert_eq!(canonicalize_text(&raw), "hello world");
    }

    #[test]
    fn wildcard_expands_to_all_options() {
        let schema = vec![language_field()];
        let policy = base_policy();
        let mut raw = BTreeMap::new();
        raw.insert("language".to_string(), json!("doesn't matter"));
        let rec = normalize_record(&schema, &policy, 0, &raw).unwrap();
        let set = rec.categorical_set(&"language".parse().unwrap()).unwrap();
        assert_eq!(set, &schema[0].options);
    }

    #[test]
    fn unknown_option_without_wildcard_is_an_error() {
        let schema = vec![language_field()];
        let policy = base_policy();
        let mut raw = BTreeMap::new();
        raw.insert("language".to_string(), json!("fr"));
        assert!(matches!(
            normalize_record(&schema, &policy, 0, &raw),
            Err(DataError::UnknownOption { .. })
        ));
    }

    #[test]
    fn missing_hard_field_is_an_error() {
        let schema = vec![language_field()];
        let policy = base_policy();
        let raw = BTreeMap::new();
        assert!(matches!(
            normalize_record(&schema, &policy, 0, &raw),
            Err(DataError::MissingRequiredField { .. })
        ));
    }

    #[test]
    fn multi_select_accepts_comma_string_as_legacy_fallback() {
        let field = FieldSpec {
            id: "area".parse().unwrap(),
            kind: FieldKind::MultiSelect,
            options: ["north", "south"].iter().map(|s| s.to_string()).collect(),
            numeric_min: None,
            numeric_max: None,
            role: FieldRole::Hard,
            normalization: FieldNormalization::default(),
            text_max_len: None,
        };
        let schema = vec![field];
        let policy = base_policy();
        let mut raw = BTreeMap::new();
        raw.insert("area".to_string(), json!("north, south"));
        let rec = normalize_record(&schema, &policy, 0, &raw).unwrap();
        let set = rec.multi_set(&"area".parse().unwrap()).unwrap();
        assert_eq!(set.len(), 2);
    }
}
