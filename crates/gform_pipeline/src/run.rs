//! The Run Driver: normalize -> partition -> (match -> score -> build)* per
//! subspace, in deterministic sorted-key order, then assemble the
//! `RunResult`. Single-threaded per run; no suspension points.

use crate::errors::EngineError;
use gform_algo::{build_compatibility_matrix, build_group, score_group, ScoreCache};
use gform_core::{Explanation, FeatureRecord, FieldSpec, Group, Policy, PolicyHash, RunResult, RunStats, ScoreBreakdown};
use gform_io::errors::DataError;
use gform_io::normalizer::normalize_record;
use serde_json::Value;
use std::collections::BTreeMap;

/// Records excluded from a run because they failed normalization, alongside
/// the reason. Surfaced to the caller; never aborts the run.
#[derive(Debug, Default)]
pub struct NormalizationReport {
    pub excluded: Vec<(usize, DataError)>,
}

fn normalize_table(
    schema: &[FieldSpec],
    policy: &Policy,
    raw_rows: &[BTreeMap<String, Value>],
) -> (Vec<FeatureRecord>, Vec<usize>, NormalizationReport) {
    let mut table: Vec<FeatureRecord> = (0..raw_rows.len()).map(FeatureRecord::new).collect();
    let mut valid_indices = Vec::new();
    let mut report = NormalizationReport::default();

    for (i, raw) in raw_rows.iter().enumerate() {
        match normalize_record(schema, policy, i, raw) {
            Ok(rec) => {
                table[i] = rec;
                valid_indices.push(i);
            }
            Err(e) => report.excluded.push((i, e)),
        }
    }

    (table, valid_indices, report)
}

fn hard_constraint_summary(records: &[FeatureRecord], policy: &Policy, group: &[usize]) -> Vec<String> {
    let mut summary = Vec::new();
    let first = group.first().copied();
    for f in &policy.hard.categorical_equal {
        let value = first
            .and_then(|m| records[m].categorical_set(f))
            .map(|set| set.iter().cloned().collect::<Vec<_>>().join(","))
            .unwrap_or_default();
        summary.push(format!("{}={}", f.as_str(), value));
    }
    for f in &policy.hard.multi_overlap {
        summary.push(format!("{}_overlap", f.as_str()));
    }
    for (f, tol) in &policy.hard.numeric_tol {
        summary.push(format!("{}±{}", f.as_str(), tol));
    }
    if let Some(ar) = &policy.age_rules {
        summary.push(format!("age_band:{}", ar.field.as_str()));
    }
    summary
}

fn member_bound_by(records: &[FeatureRecord], policy: &Policy, member: usize) -> Vec<String> {
    let record = &records[member];
    let mut tags = Vec::new();
    for f in &policy.hard.categorical_equal {
        if let Some(set) = record.categorical_set(f) {
            let joined = set.iter().cloned().collect::<Vec<_>>().join(",");
            tags.push(format!("{}={}", f.as_str(), joined));
        }
    }
    for f in &policy.hard.multi_overlap {
        if record.multi_set(f).is_some() {
            tags.push(format!("{}_overlap", f.as_str()));
        }
    }
    for (f, tol) in &policy.hard.numeric_tol {
        tags.push(format!("{}±{}", f.as_str(), tol));
    }
    if let Some(ar) = &policy.age_rules {
        if let Some(age) = record.numeric_value(&ar.field) {
            if let Some(label) = ar.band_label(age.round() as i32) {
                tags.push(format!("age_band:{label}"));
            }
        }
    }
    tags
}

fn subspace_key_map(records: &[FeatureRecord], policy: &Policy, a_member: usize) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    let record = &records[a_member];
    for sub in &policy.subspaces {
        for field in sub {
            if let Some(set) = record.categorical_set(field) {
                map.insert(field.as_str().to_string(), set.iter().cloned().collect::<Vec<_>>().join(","));
            } else if let Some(set) = record.multi_set(field) {
                map.insert(field.as_str().to_string(), set.iter().cloned().collect::<Vec<_>>().join(","));
            } else if let Some(v) = record.numeric_value(field) {
                map.insert(field.as_str().to_string(), v.to_string());
            }
        }
    }
    map
}

fn score_breakdown(records: &[FeatureRecord], group: &Group, policy: &Policy, cache: &mut ScoreCache) -> ScoreBreakdown {
    score_group(records, &group.members, policy, cache)
}

/// Run the full pipeline: normalize raw rows against `schema` and `policy`,
/// partition into subspaces, and greedily build groups until every subspace
/// is exhausted. `cancel` is polled between subspaces and between group
/// emissions within a subspace.
pub fn run(
    schema: &[FieldSpec],
    policy: &Policy,
    policy_hash: &PolicyHash,
    raw_rows: &[BTreeMap<String, Value>],
    mut cancel: impl FnMut() -> bool,
) -> Result<(RunResult, NormalizationReport), EngineError> {
    let (table, valid_indices, report) = normalize_table(schema, policy, raw_rows);
    let valid_records: Vec<FeatureRecord> = valid_indices.iter().map(|&i| table[i].clone()).collect();

    let subspaces = gform_algo::partition(&valid_records, &policy.subspaces);

    let mut groups = Vec::new();
    let mut explanations = Vec::new();
    let mut ungrouped = Vec::new();
    let mut cache = ScoreCache::new();
    let mut runtime_warnings = 0usize;

    for subspace in &subspaces {
        if cancel() {
            return Err(EngineError::Cancelled);
        }
        let mut available = subspace.members.clone();

        loop {
            if available.len() < policy.min_group_size() {
                ungrouped.extend(available);
                break;
            }
            if cancel() {
                return Err(EngineError::Cancelled);
            }

            let matrix = build_compatibility_matrix(&table, &available, policy);
            match build_group(&table, &matrix, policy, &mut cache) {
                Some(group) => {
                    let breakdown = score_breakdown(&table, &group, policy, &mut cache);
                    let bound_by = group
                        .members
                        .iter()
                        .map(|&m| (m, member_bound_by(&table, policy, m)))
                        .collect();
                    let age_band = group.members.first().and_then(|&m| table[m].age_band.clone());
                    let explanation = Explanation {
                        policy_hash: policy_hash.clone(),
                        subspace_key: group
                            .members
                            .first()
                            .map(|&m| subspace_key_map(&table, policy, m))
                            .unwrap_or_default(),
                        age_band,
                        hard_constraint_summary: hard_constraint_summary(&table, policy, &group.members),
                        soft_scores: breakdown,
                        bound_by,
                    };
                    available.retain(|x| !group.members.contains(x));
                    groups.push(group);
                    explanations.push(explanation);
                }
                None => {
                    ungrouped.extend(available);
                    break;
                }
            }
        }
    }

    runtime_warnings += cache.runtime_warnings;

    let group_sizes: Vec<usize> = groups.iter().map(|g| g.members.len()).collect();
    let avg_group_size = if group_sizes.is_empty() {
        0.0
    } else {
        group_sizes.iter().sum::<usize>() as f64 / group_sizes.len() as f64
    };
    let avg_group_score = if groups.is_empty() {
        0.0
    } else {
        groups.iter().map(|g| g.score).sum::<f64>() / groups.len() as f64
    };

    ungrouped.sort_unstable();

    let stats = RunStats {
        total_records: valid_indices.len(),
        total_groups: groups.len(),
        ungrouped_indices: ungrouped,
        group_sizes,
        avg_group_size,
        avg_group_score,
        runtime_warnings,
    };

    Ok((RunResult { groups, explanations, stats }, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gform_core::{Fallback, FieldKind, FieldNormalization, FieldRole, HardSpec, SoftSpec};
    use serde_json::json;
    use std::collections::BTreeSet;

    fn field(name: &str, kind: FieldKind, role: FieldRole) -> FieldSpec {
        FieldSpec {
            id: name.parse().unwrap(),
            kind,
            options: ["he", "en"].iter().map(|s| s.to_string()).collect(),
            numeric_min: None,
            numeric_max: None,
            role,
            normalization: FieldNormalization::default(),
            text_max_len: None,
        }
    }

    fn schema() -> Vec<FieldSpec> {
        vec![field("language", FieldKind::SingleSelect, FieldRole::Hard)]
    }

    fn policy() -> Policy {
        Policy {
            group_size: 6,
            subspaces: vec![],
            hard: HardSpec { categorical_equal: vec!["language".parse().unwrap()], ..Default::default() },
            age_rules: None,
            soft: SoftSpec::default(),
            fallback: Fallback { min_group_size: 6, max_group_size: 6, ..Fallback::default() },
            flexible_answers: Default::default(),
        }
    }

    // Scenario A from the engine's testable-property table: six identical
    // hard-field respondents form exactly one full group.
    #[test]
    fn scenario_a_six_identical_respondents_form_one_group() {
        let schema = schema();
        let policy = policy();
        let hash: PolicyHash = "deadbeef".parse().unwrap();
        let rows: Vec<BTreeMap<String, Value>> = (0..6)
            .map(|_| {
                let mut m = BTreeMap::new();
                m.insert("language".to_string(), json!("he"));
                m
            })
            .collect();

        let (result, report) = run(&schema, &policy, &hash, &rows, || false).unwrap();
        assert!(report.excluded.is_empty());
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].members, vec![0, 1, 2, 3, 4, 5]);
        assert!(result.stats.ungrouped_indices.is_empty());
    }

    // Scenario B: a seventh respondent with an incompatible hard field is
    // left ungrouped once the pool falls below group_size.
    #[test]
    fn scenario_b_incompatible_extra_respondent_is_left_ungrouped() {
        let schema = schema();
        let policy = policy();
        let hash: PolicyHash = "deadbeef".parse().unwrap();
        let mut rows: Vec<BTreeMap<String, Value>> = (0..6)
            .map(|_| {
                let mut m = BTreeMap::new();
                m.insert("language".to_string(), json!("he"));
                m
            })
            .collect();
        let mut extra = BTreeMap::new();
        extra.insert("language".to_string(), json!("en"));
        rows.push(extra);

        let (result, _) = run(&schema, &policy, &hash, &rows, || false).unwrap();
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.stats.ungrouped_indices, vec![6]);
    }

    #[test]
    fn hard_constraint_summary_includes_the_matched_value() {
        let mut record = FeatureRecord::new(0);
        record.categorical.insert("language".parse().unwrap(), BTreeSet::from(["he".to_string()]));
        let records = vec![record];
        let policy = policy();

        let summary = hard_constraint_summary(&records, &policy, &[0]);
        assert_eq!(summary, vec!["language=he".to_string()]);
    }

    #[test]
    fn hard_constraint_summary_is_empty_value_for_an_empty_group() {
        let records: Vec<FeatureRecord> = vec![];
        let policy = policy();

        let summary = hard_constraint_summary(&records, &policy, &[]);
        assert_eq!(summary, vec!["language=".to_string()]);
    }
}
