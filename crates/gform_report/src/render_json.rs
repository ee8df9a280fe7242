//! JSON renderer: turns a `ReportModel` back into a `serde_json::Value` with
//! a fixed key order (summary first, then groups in run order), independent
//! of `serde_json`'s default map ordering.

use crate::model::{GroupSummary, ReportModel, RunSummary};
use serde_json::{Map, Value};

fn obj() -> Map<String, Value> {
    Map::new()
}

fn summary_json(s: &RunSummary) -> Value {
    let mut o = obj();
    o.insert("total_records".into(), Value::from(s.total_records));
    o.insert("total_groups".into(), Value::from(s.total_groups));
    o.insert("ungrouped_count".into(), Value::from(s.ungrouped_count));
    o.insert("avg_group_size".into(), Value::String(s.avg_group_size.clone()));
    o.insert("avg_group_score".into(), Value::String(s.avg_group_score.clone()));
    o.insert("runtime_warnings".into(), Value::from(s.runtime_warnings));
    Value::Object(o)
}

fn group_json(g: &GroupSummary) -> Value {
    let mut o = obj();
    o.insert("index".into(), Value::from(g.index as u64));
    o.insert("size".into(), Value::from(g.size as u64));
    o.insert("score".into(), Value::from(g.score));
    if let Some(band) = &g.age_band {
        o.insert("age_band".into(), Value::String(band.clone()));
    }
    if !g.subspace.is_empty() {
        let mut sub = obj();
        for (k, v) in &g.subspace {
            sub.insert(k.clone(), Value::String(v.clone()));
        }
        o.insert("subspace".into(), Value::Object(sub));
    }
    Value::Object(o)
}

/// Render the full report in fixed key order: `summary` then `groups`.
pub fn render_report_json(model: &ReportModel) -> Value {
    let mut root = obj();
    root.insert("summary".into(), summary_json(&model.summary));
    root.insert("groups".into(), Value::Array(model.groups.iter().map(group_json).collect()));
    Value::Object(root)
}
