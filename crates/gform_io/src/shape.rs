//! Pre-normalization shape validation: a lightweight pass over a raw response
//! that reports every shape problem at once instead of raising on the first
//! one, for surfaces that want to show a respondent all their form errors
//! together. Not a gate the engine itself depends on — `normalizer::
//! normalize_record`'s `DataError` path remains the authoritative check.

use gform_core::{FieldKind, FieldRole, FieldSpec, Policy};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeIssue {
    MissingRequiredField { field: String },
    UnparseableNumeric { field: String, raw: String },
    OutOfBounds { field: String, value: f64 },
    UnknownOption { field: String, value: String },
    TextTooLong { field: String, len: usize, max: usize },
}

fn value_as_f64(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn value_as_str(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn select_parts(raw: &Value) -> Vec<String> {
    match raw {
        Value::Array(items) => items.iter().filter_map(value_as_str).collect(),
        Value::String(s) => s.split(',').map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect(),
        other => value_as_str(other).into_iter().collect(),
    }
}

fn is_known_option(field: &FieldSpec, policy: &Policy, value: &str) -> bool {
    field.options.is_empty()
        || field.options.contains(value)
        || field.normalization.wildcards.contains(value)
        || policy.flexible_answers.contains(value)
}

/// Check one raw response against its schema's shape rules, collecting every
/// problem found rather than stopping at the first one.
pub fn validate_response_shape(
    schema: &[FieldSpec],
    policy: &Policy,
    raw: &BTreeMap<String, Value>,
) -> Vec<ShapeIssue> {
    let mut issues = Vec::new();

    for field in schema {
        let name = field.id.as_str();
        let present = raw.get(name);

        let Some(v) = present else {
            if matches!(field.role, FieldRole::Hard) {
                issues.push(ShapeIssue::MissingRequiredField { field: name.to_string() });
            }
            continue;
        };

        match field.kind {
            FieldKind::Numeric | FieldKind::Scale => match value_as_f64(v) {
                None => issues.push(ShapeIssue::UnparseableNumeric {
                    field: name.to_string(),
                    raw: v.to_string(),
                }),
                Some(parsed) => {
                    if field.numeric_min.is_some_and(|min| parsed < min)
                        || field.numeric_max.is_some_and(|max| parsed > max)
                    {
                        issues.push(ShapeIssue::OutOfBounds { field: name.to_string(), value: parsed });
                    }
                }
            },
            FieldKind::SingleSelect => match value_as_str(v) {
                None => issues.push(ShapeIssue::UnknownOption {
                    field: name.to_string(),
                    value: v.to_string(),
                }),
                Some(s) if !is_known_option(field, policy, s.trim()) => {
                    issues.push(ShapeIssue::UnknownOption { field: name.to_string(), value: s });
                }
                Some(_) => {}
            },
            FieldKind::MultiSelect => {
                for part in select_parts(v) {
                    if !is_known_option(field, policy, &part) {
                        issues.push(ShapeIssue::UnknownOption { field: name.to_string(), value: part });
                    }
                }
            }
            FieldKind::Text => {
                if let Some(s) = value_as_str(v) {
                    if let Some(max) = field.text_max_len {
                        let len = s.chars().count();
                        if len > max {
                            issues.push(ShapeIssue::TextTooLong { field: name.to_string(), len, max });
                        }
                    }
                }
            }
        }
    }

    issues
}
