//! The Group Scorer: diversity, similarity, categorical, and multi-choice
//! overlap terms, memoized by the sorted tuple of candidate indices.
//!
//! Degenerate conditions (all-NaN columns, empty pair sets) are typed
//! degradations folded into the breakdown, never `Result::Err` — the
//! scorer's contract is that it always returns a score.

use gform_core::determinism::CandidateKey;
use gform_core::{CategoricalSoftMode, FeatureRecord, Policy, ScoreBreakdown};
use std::collections::HashMap;

#[derive(Default)]
pub struct ScoreCache {
    memo: HashMap<CandidateKey, ScoreBreakdown>,
    pub runtime_warnings: usize,
}

impl ScoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.memo.clear();
    }
}

fn variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var)
}

fn diversity_numeric(records: &[FeatureRecord], group: &[usize], policy: &Policy) -> f64 {
    let mut total = 0.0;
    let mut columns = 0usize;
    for field in &policy.soft.numeric_features {
        let values: Vec<f64> = group
            .iter()
            .filter_map(|&idx| records[idx].numeric_value(field))
            .collect();
        if let Some(v) = variance(&values) {
            total += v;
            columns += 1;
        }
    }
    if columns == 0 {
        0.0
    } else {
        total / columns as f64
    }
}

fn similarity_bonus(records: &[FeatureRecord], group: &[usize], policy: &Policy) -> f64 {
    let fields = &policy.soft.numeric_features;
    if fields.is_empty() || group.len() < 2 {
        return 0.0;
    }

    // Per-field min-max range over the candidate set; zero-range columns are
    // skipped entirely rather than collapsed to zero.
    let mut ranges = Vec::with_capacity(fields.len());
    for field in fields {
        let values: Vec<f64> = group.iter().filter_map(|&idx| records[idx].numeric_value(field)).collect();
        if values.is_empty() {
            continue;
        }
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if max > min {
            ranges.push((field.clone(), min, max));
        }
    }
    if ranges.is_empty() {
        return 0.0;
    }

    let mut total_distance = 0.0;
    let mut pair_count = 0usize;
    for i in 0..group.len() {
        for j in (i + 1)..group.len() {
            let ri = &records[group[i]];
            let rj = &records[group[j]];
            let mut sum_sq = 0.0;
            let mut valid = true;
            for (field, min, max) in &ranges {
                let (Some(a), Some(b)) = (ri.numeric_value(field), rj.numeric_value(field)) else {
                    valid = false;
                    break;
                };
                if a.is_nan() || b.is_nan() {
                    valid = false;
                    break;
                }
                let na = (a - min) / (max - min);
                let nb = (b - min) / (max - min);
                sum_sq += (na - nb).powi(2);
            }
            if valid {
                total_distance += sum_sq.sqrt();
                pair_count += 1;
            }
        }
    }

    if pair_count == 0 {
        0.0
    } else {
        1.0 / (1.0 + total_distance / pair_count as f64)
    }
}

fn categorical_diversity(records: &[FeatureRecord], group: &[usize], policy: &Policy) -> f64 {
    let k = group.len().max(1) as f64;
    let mut total = 0.0;
    for (field, mode) in &policy.soft.categorical {
        let mut unique = std::collections::BTreeSet::new();
        for &idx in group {
            if let Some(set) = records[idx].categorical_set(field) {
                unique.extend(set.iter().cloned());
            }
        }
        let count = unique.len() as f64;
        total += match mode {
            CategoricalSoftMode::Diversity => count / k,
            CategoricalSoftMode::Balance => (count / 3.0).min(1.0),
        };
    }
    total
}

fn jaccard(a: &std::collections::BTreeSet<String>, b: &std::collections::BTreeSet<String>) -> f64 {
    let inter = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        inter as f64 / union as f64
    }
}

fn multi_overlap(records: &[FeatureRecord], group: &[usize], policy: &Policy) -> f64 {
    let mut total = 0.0;
    for field in &policy.soft.multi_choice {
        let mut sum = 0.0;
        let mut pairs = 0usize;
        for i in 0..group.len() {
            for j in (i + 1)..group.len() {
                let (Some(si), Some(sj)) = (
                    records[group[i]].multi_set(field),
                    records[group[j]].multi_set(field),
                ) else {
                    continue;
                };
                sum += jaccard(si, sj);
                pairs += 1;
            }
        }
        if pairs > 0 {
            total += sum / pairs as f64;
        }
    }
    total
}

/// Score a candidate group, consulting and populating `cache` by the sorted
/// tuple of member indices.
pub fn score_group(
    records: &[FeatureRecord],
    group: &[usize],
    policy: &Policy,
    cache: &mut ScoreCache,
) -> ScoreBreakdown {
    let key = CandidateKey::new(group.to_vec());
    if let Some(hit) = cache.memo.get(&key) {
        return hit.clone();
    }

    let d = diversity_numeric(records, group, policy);
    let s = similarity_bonus(records, group, policy);
    let c = categorical_diversity(records, group, policy);
    let m = multi_overlap(records, group, policy);
    let w = &policy.soft.weights;
    let total = w.diversity_numeric * d + w.similarity_bonus * s + w.categorical_diversity * c + w.multi_overlap_bonus * m;

    if d == 0.0 && policy.soft.numeric_features.len() > 1 {
        tracing::debug!(group = ?group, "diversity term collapsed to zero across all numeric columns");
    }

    let breakdown = ScoreBreakdown {
        diversity_numeric: d,
        similarity_bonus: s,
        categorical_diversity: c,
        multi_overlap_bonus: m,
        total,
    };
    cache.memo.insert(key, breakdown.clone());
    breakdown
}
