//! The Compatibility Matrix Builder: a symmetric boolean relation over one
//! subspace's participants, built by intersecting one layer per active hard
//! rule. Rebuilt after every group emission, so each layer stays allocation-
//! frugal and avoids re-deriving per-field sets more than once per build.

use gform_core::{AgeRules, FeatureRecord, Policy};

/// A symmetric boolean matrix over a fixed ordered list of participant
/// indices (`members`). `compat(i, j)` takes *positions* into `members`.
#[derive(Clone, Debug)]
pub struct CompatibilityMatrix {
    pub members: Vec<usize>,
    bits: Vec<bool>,
}

impl CompatibilityMatrix {
    fn idx(&self, i: usize, j: usize) -> usize {
        i * self.members.len() + j
    }

    pub fn get(&self, i: usize, j: usize) -> bool {
        self.bits[self.idx(i, j)]
    }

    fn set(&mut self, i: usize, j: usize, v: bool) {
        let ix = self.idx(i, j);
        self.bits[ix] = v;
    }

    fn and(&mut self, i: usize, j: usize, v: bool) {
        if !v {
            self.set(i, j, false);
            self.set(j, i, false);
        }
    }

    /// Degree (count of compatible partners, excluding self) of position `i`
    /// among `available` positions.
    pub fn degree_among(&self, i: usize, available: &[usize]) -> usize {
        available
            .iter()
            .filter(|&&j| j != i && self.get(i, j))
            .count()
    }

    /// True iff position `x` is compatible with every position in `group`.
    pub fn compatible_with_all(&self, x: usize, group: &[usize]) -> bool {
        group.iter().all(|&g| self.get(x, g))
    }
}

fn age_compatible(ar: &AgeRules, a: f64, b: f64) -> bool {
    let ai = a.round() as i32;
    let bi = b.round() as i32;
    let bands_a: Vec<_> = ar.bands_containing(ai).collect();
    let bands_b: Vec<_> = ar.bands_containing(bi).collect();

    let shared_spreads: Vec<u32> = bands_a
        .iter()
        .filter(|ba| bands_b.iter().any(|bb| bb.name == ba.name))
        .filter_map(|b| b.max_spread)
        .collect();

    let diff = (ai - bi).unsigned_abs();

    if !shared_spreads.is_empty() {
        let tightest = *shared_spreads.iter().min().unwrap();
        return diff <= tightest;
    }
    if bands_a.iter().any(|b| bands_b.iter().any(|bb| bb.name == b.name)) {
        // Shared band but neither declares a max_spread: unconstrained by spread.
        return true;
    }
    if !ar.allow_cross_band {
        return false;
    }
    let widest = bands_a
        .iter()
        .chain(bands_b.iter())
        .filter_map(|b| b.max_spread)
        .max();
    match widest {
        Some(w) => diff <= w,
        None => true,
    }
}

/// Build the compatibility matrix for `members` (participant indices) given
/// the full record table and the bound policy.
pub fn build_compatibility_matrix(
    records: &[FeatureRecord],
    members: &[usize],
    policy: &Policy,
) -> CompatibilityMatrix {
    let n = members.len();
    let mut m = CompatibilityMatrix {
        members: members.to_vec(),
        bits: vec![true; n * n],
    };

    for field in &policy.hard.categorical_equal {
        for i in 0..n {
            let ri = &records[members[i]];
            let Some(si) = ri.categorical_set(field) else {
                for j in (i + 1)..n {
                    m.and(i, j, false);
                }
                continue;
            };
            for j in (i + 1)..n {
                let rj = &records[members[j]];
                let compatible = rj
                    .categorical_set(field)
                    .map(|sj| !si.is_disjoint(sj))
                    .unwrap_or(false);
                m.and(i, j, compatible);
            }
        }
    }

    for field in &policy.hard.multi_overlap {
        for i in 0..n {
            let ri = &records[members[i]];
            let Some(si) = ri.multi_set(field) else {
                for j in (i + 1)..n {
                    m.and(i, j, false);
                }
                continue;
            };
            for j in (i + 1)..n {
                let rj = &records[members[j]];
                let compatible = rj.multi_set(field).map(|sj| !si.is_disjoint(sj)).unwrap_or(false);
                m.and(i, j, compatible);
            }
        }
    }

    for (field, tol) in &policy.hard.numeric_tol {
        for i in 0..n {
            let ri = &records[members[i]];
            let Some(vi) = ri.numeric_value(field) else {
                for j in (i + 1)..n {
                    m.and(i, j, false);
                }
                continue;
            };
            for j in (i + 1)..n {
                let rj = &records[members[j]];
                let compatible = rj
                    .numeric_value(field)
                    .map(|vj| (vi - vj).abs() <= *tol)
                    .unwrap_or(false);
                m.and(i, j, compatible);
            }
        }
    }

    if let Some(ar) = &policy.age_rules {
        for i in 0..n {
            let ri = &records[members[i]];
            let Some(ai) = ri.numeric_value(&ar.field) else {
                for j in (i + 1)..n {
                    m.and(i, j, false);
                }
                continue;
            };
            for j in (i + 1)..n {
                let rj = &records[members[j]];
                let compatible = rj.numeric_value(&ar.field).map(|aj| age_compatible(ar, ai, aj)).unwrap_or(false);
                m.and(i, j, compatible);
            }
        }
    }

    for i in 0..n {
        m.set(i, i, true);
    }

    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use gform_core::{AgeBand, Fallback, GroupConstraints, HardSpec, SoftSpec};
    use std::collections::BTreeSet;

    fn record(idx: usize, language: &str, age: f64) -> FeatureRecord {
        let mut r = FeatureRecord::new(idx);
        r.categorical.insert(
            "language".parse().unwrap(),
            BTreeSet::from([language.to_string()]),
        );
        r.numeric.insert("age".parse().unwrap(), age);
        r
    }

    fn policy_with_categorical_equal() -> Policy {
        Policy {
            group_size: 6,
            subspaces: vec![],
            hard: HardSpec {
                categorical_equal: vec!["language".parse().unwrap()],
                ..Default::default()
            },
            age_rules: None,
            soft: SoftSpec::default(),
            fallback: Fallback::default(),
            flexible_answers: Default::default(),
        }
    }

    #[test]
    fn matrix_is_symmetric_and_reflexive() {
        let records = vec![record(0, "he", 20.0), record(1, "en", 21.0), record(2, "he", 22.0)];
        let policy = policy_with_categorical_equal();
        let m = build_compatibility_matrix(&records, &[0, 1, 2], &policy);
        for i in 0..3 {
            assert!(m.get(i, i));
            for j in 0..3 {
                assert_eq!(m.get(i, j), m.get(j, i));
            }
        }
    }

    #[test]
    fn categorical_equal_gates_on_intersection() {
        let records = vec![record(0, "he", 20.0), record(1, "en", 21.0), record(2, "he", 22.0)];
        let policy = policy_with_categorical_equal();
        let m = build_compatibility_matrix(&records, &[0, 1, 2], &policy);
        assert!(m.get(0, 2));
        assert!(!m.get(0, 1));
    }

    #[test]
    fn age_band_requires_shared_band_within_min_spread() {
        let ar = AgeRules {
            field: "age".parse().unwrap(),
            bands: vec![
                AgeBand { name: "20s".into(), min: 20, max: 29, max_spread: Some(4) },
                AgeBand { name: "late20s".into(), min: 25, max: 29, max_spread: Some(1) },
            ],
            allow_cross_band: false,
            boundary_slack_years: 0,
            group_constraints: GroupConstraints { max_age_difference: None, max_age_std: None },
        };
        let mut policy = policy_with_categorical_equal();
        policy.age_rules = Some(ar.clone());

        // Both in band "late20s" too, so tightest shared spread (1) applies: |27-26|=1 OK.
        let records = vec![record(0, "he", 27.0), record(1, "he", 26.0)];
        let m = build_compatibility_matrix(&records, &[0, 1], &policy);
        assert!(m.get(0, 1));

        // 3 years apart exceeds the tightest shared spread of 1.
        let records2 = vec![record(0, "he", 28.0), record(1, "he", 25.0)];
        let m2 = build_compatibility_matrix(&records2, &[0, 1], &policy);
        assert!(!m2.get(0, 1));
    }
}
