//! The Greedy Group Builder: seed-and-extend, stopping the first time the
//! hardest seed fails to reach an acceptable group size. This matches the
//! default behavior of the system this engine was distilled from; policies
//! that want to retry alternate seeds can set `fallback.defer_if_infeasible`
//! and have the caller resubmit the remainder as a fresh subspace pass.

use crate::compat::CompatibilityMatrix;
use crate::scorer::{score_group, ScoreCache};
use gform_core::determinism::pick_best_by;
use gform_core::{FeatureRecord, Group, Policy};
use std::cmp::Ordering;

fn whole_group_constraints_hold(records: &[FeatureRecord], policy: &Policy, group: &[usize]) -> bool {
    let Some(ar) = &policy.age_rules else { return true };
    let ages: Vec<f64> = group.iter().filter_map(|&idx| records[idx].numeric_value(&ar.field)).collect();
    if ages.len() != group.len() {
        return false;
    }
    if let Some(max_diff) = ar.group_constraints.max_age_difference {
        let min = ages.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = ages.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if (max - min) > max_diff as f64 {
            return false;
        }
    }
    if let Some(max_std) = ar.group_constraints.max_age_std {
        let mean = ages.iter().sum::<f64>() / ages.len() as f64;
        let var = ages.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / ages.len() as f64;
        if var.sqrt() > max_std {
            return false;
        }
    }
    true
}

/// Select the seed: the available position with the smallest compatibility
/// degree, ties broken by smallest participant index.
fn select_seed(matrix: &CompatibilityMatrix, available: &[usize]) -> Option<usize> {
    let participant_of_pos: Vec<usize> = available.iter().map(|&pos| matrix.members[pos]).collect();
    let pos_of_participant = |participant: usize| -> usize {
        available[participant_of_pos.iter().position(|&m| m == participant).expect("participant present")]
    };
    let winner = pick_best_by(
        &participant_of_pos,
        |participant| matrix.degree_among(pos_of_participant(participant), available),
        |a: usize, b: usize| a.cmp(&b),
    )?;
    Some(pos_of_participant(winner))
}

/// Run one seed-and-extend pass over `matrix`'s full member set. Returns
/// `None` if no group of at least `min_group_size` can be assembled from the
/// hardest seed — signaling the subspace is exhausted.
pub fn build_group(
    records: &[FeatureRecord],
    matrix: &CompatibilityMatrix,
    policy: &Policy,
    cache: &mut ScoreCache,
) -> Option<Group> {
    let all_positions: Vec<usize> = (0..matrix.members.len()).collect();
    let seed_pos = select_seed(matrix, &all_positions)?;

    let mut group_positions = vec![seed_pos];
    let mut pool: Vec<usize> = all_positions.into_iter().filter(|&p| p != seed_pos).collect();

    while group_positions.len() < policy.group_size {
        let feasible: Vec<usize> = pool
            .iter()
            .copied()
            .filter(|&x| {
                matrix.compatible_with_all(x, &group_positions) && {
                    let mut trial: Vec<usize> = group_positions.iter().map(|&p| matrix.members[p]).collect();
                    trial.push(matrix.members[x]);
                    whole_group_constraints_hold(records, policy, &trial)
                }
            })
            .collect();

        if feasible.is_empty() {
            break;
        }

        let participant_of_pos: Vec<usize> = feasible.iter().map(|&x| matrix.members[x]).collect();
        let pos_of_participant = |participant: usize| -> usize {
            feasible[participant_of_pos.iter().position(|&m| m == participant).expect("participant present")]
        };
        let winner = pick_best_by(
            &participant_of_pos,
            |participant| {
                let x = pos_of_participant(participant);
                let mut trial: Vec<usize> = group_positions.iter().map(|&p| matrix.members[p]).collect();
                trial.push(matrix.members[x]);
                score_group(records, &trial, policy, cache).total
            },
            |a: f64, b: f64| b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        )
        .expect("feasible is non-empty");

        let chosen = pos_of_participant(winner);
        group_positions.push(chosen);
        pool.retain(|&p| p != chosen);
    }

    if group_positions.len() < policy.min_group_size() {
        return None;
    }

    let members: Vec<usize> = group_positions.iter().map(|&p| matrix.members[p]).collect();
    let score = score_group(records, &members, policy, cache).total;
    Some(Group { members, score })
}
