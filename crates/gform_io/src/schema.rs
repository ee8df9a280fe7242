//! Parses a survey schema JSON document into a frozen `Vec<FieldSpec>`.
//! Treated as load-time-frozen input for the lifetime of a run, the same way
//! a registry of fixed reference data is loaded once and never mutated.

use crate::errors::ConfigError;
use gform_core::{FieldKind, FieldNormalization, FieldRole, FieldSpec};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields, default)]
struct NormalizationDocRaw {
    wildcards: BTreeSet<String>,
    expansion: BTreeSet<String>,
    synonyms: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, default)]
struct FieldDocRaw {
    name: String,
    kind: String,
    options: BTreeSet<String>,
    numeric_min: Option<f64>,
    numeric_max: Option<f64>,
    role: String,
    normalization: NormalizationDocRaw,
    text_max_len: Option<usize>,
}

impl Default for FieldDocRaw {
    fn default() -> Self {
        FieldDocRaw {
            name: String::new(),
            kind: String::new(),
            options: BTreeSet::new(),
            numeric_min: None,
            numeric_max: None,
            role: "soft".to_string(),
            normalization: NormalizationDocRaw::default(),
            text_max_len: None,
        }
    }
}

/// Parse a JSON array of field documents into `FieldSpec`s.
pub fn parse_schema(schema_json: &str) -> Result<Vec<FieldSpec>, ConfigError> {
    let raws: Vec<FieldDocRaw> =
        serde_json::from_str(schema_json).map_err(|e| ConfigError::Malformed(e.to_string()))?;

    raws.into_iter().map(bind_field).collect()
}

fn bind_field(raw: FieldDocRaw) -> Result<FieldSpec, ConfigError> {
    let kind = match raw.kind.as_str() {
        "numeric" => FieldKind::Numeric,
        "scale" => FieldKind::Scale,
        "single_select" => FieldKind::SingleSelect,
        "multi_select" => FieldKind::MultiSelect,
        "text" => FieldKind::Text,
        other => return Err(ConfigError::Malformed(format!("unknown field kind {other}"))),
    };
    let role = match raw.role.as_str() {
        "hard" => FieldRole::Hard,
        "soft" => FieldRole::Soft,
        "identifier" => FieldRole::Identifier,
        "explain" => FieldRole::Explain,
        other => return Err(ConfigError::Malformed(format!("unknown field role {other}"))),
    };
    let id = raw
        .name
        .parse()
        .map_err(|_| ConfigError::Malformed(format!("invalid field name {}", raw.name)))?;

    Ok(FieldSpec {
        id,
        kind,
        options: raw.options,
        numeric_min: raw.numeric_min,
        numeric_max: raw.numeric_max,
        role,
        normalization: FieldNormalization {
            wildcards: raw.normalization.wildcards,
            expansion: raw.normalization.expansion,
            synonyms: raw.normalization.synonyms,
        },
        text_max_len: raw.text_max_len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_schema() {
        let json = r#"[
            {"name":"language","kind":"single_select","options":["he","en"],"role":"hard"},
            {"name":"age","kind":"numeric","role":"hard"}
        ]"#;
        let fields = parse_schema(json).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].id.as_str(), "language");
        assert!(matches!(fields[1].kind, FieldKind::Numeric));
    }

    #[test]
    fn rejects_unknown_kind() {
        let json = r#"[{"name":"x","kind":"bogus","role":"soft"}]"#;
        assert!(parse_schema(json).is_err());
    }
}
