//! Pure mapping from a canonical `RunResult` JSON value to the report model.
//! No recomputation: every field is read straight off the artifact via JSON
//! pointers, mirroring how a renderer that outlives the engine's concrete
//! types would have to read it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    pub index: usize,
    pub size: usize,
    pub score: f64,
    pub age_band: Option<String>,
    pub subspace: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_records: u64,
    pub total_groups: u64,
    pub ungrouped_count: u64,
    pub avg_group_size: String,
    pub avg_group_score: String,
    pub runtime_warnings: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportModel {
    pub summary: RunSummary,
    pub groups: Vec<GroupSummary>,
}

#[inline]
fn j_u64(v: &Value, ptr: &str) -> u64 {
    v.pointer(ptr).and_then(Value::as_u64).unwrap_or(0)
}

#[inline]
fn j_f64(v: &Value, ptr: &str) -> f64 {
    v.pointer(ptr).and_then(Value::as_f64).unwrap_or(0.0)
}

fn one_decimal(x: f64) -> String {
    format!("{:.1}", x)
}

fn map_summary(run: &Value) -> RunSummary {
    RunSummary {
        total_records: j_u64(run, "/stats/total_records"),
        total_groups: j_u64(run, "/stats/total_groups"),
        ungrouped_count: run
            .pointer("/stats/ungrouped_indices")
            .and_then(Value::as_array)
            .map(|a| a.len() as u64)
            .unwrap_or(0),
        avg_group_size: one_decimal(j_f64(run, "/stats/avg_group_size")),
        avg_group_score: one_decimal(j_f64(run, "/stats/avg_group_score")),
        runtime_warnings: j_u64(run, "/stats/runtime_warnings"),
    }
}

fn map_groups(run: &Value) -> Vec<GroupSummary> {
    let groups = run.pointer("/groups").and_then(Value::as_array);
    let explanations = run.pointer("/explanations").and_then(Value::as_array);

    let Some(groups) = groups else { return Vec::new() };

    groups
        .iter()
        .enumerate()
        .map(|(index, g)| {
            let size = g
                .pointer("/members")
                .and_then(Value::as_array)
                .map(|m| m.len())
                .unwrap_or(0);
            let score = g.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);

            let explanation = explanations.and_then(|xs| xs.get(index));
            let age_band = explanation
                .and_then(|e| e.pointer("/age_band"))
                .and_then(Value::as_str)
                .map(ToString::to_string);
            let subspace = explanation
                .and_then(|e| e.pointer("/subspace_key"))
                .and_then(Value::as_object)
                .map(|obj| {
                    obj.iter()
                        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                        .collect()
                })
                .unwrap_or_default();

            GroupSummary { index, size, score, age_band, subspace }
        })
        .collect()
}

/// Build the report model from the canonical `RunResult` JSON value.
pub fn build_model(run: &Value) -> ReportModel {
    ReportModel { summary: map_summary(run), groups: map_groups(run) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_summary_and_groups_from_canonical_value() {
        let run = json!({
            "groups": [{"members": [0, 1, 2], "score": 1.5}],
            "explanations": [{"age_band": "20-29", "subspace_key": {"language": "he"}}],
            "stats": {
                "total_records": 3,
                "total_groups": 1,
                "ungrouped_indices": [],
                "avg_group_size": 3.0,
                "avg_group_score": 1.5,
                "runtime_warnings": 0
            }
        });
        let model = build_model(&run);
        assert_eq!(model.summary.total_groups, 1);
        assert_eq!(model.groups.len(), 1);
        assert_eq!(model.groups[0].size, 3);
        assert_eq!(model.groups[0].age_band.as_deref(), Some("20-29"));
    }
}
