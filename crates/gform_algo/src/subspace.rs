//! The Subspace Partitioner: buckets `FeatureRecord`s by a composite key
//! built from the policy's `subspaces` field lists.

use gform_core::{FeatureRecord, FieldId};
use std::collections::BTreeMap;

/// One bucket of record indices sharing a composite subspace key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subspace {
    pub key: String,
    pub members: Vec<usize>,
}

fn field_segment(record: &FeatureRecord, field: &FieldId) -> String {
    if let Some(v) = record.categorical_set(field) {
        let joined = v.iter().cloned().collect::<Vec<_>>().join(",");
        format!("{}={}", field.as_str(), joined)
    } else if let Some(v) = record.multi_set(field) {
        let joined = v.iter().cloned().collect::<Vec<_>>().join(",");
        format!("{}={}", field.as_str(), joined)
    } else if let Some(v) = record.numeric_value(field) {
        format!("{}={}", field.as_str(), v)
    } else {
        format!("{}=", field.as_str())
    }
}

/// Build one record's composite subspace key: each sub-list's `field=value`
/// segments are joined with `|`, and sub-lists are joined with `||`.
pub fn subspace_key(record: &FeatureRecord, subspaces: &[Vec<FieldId>]) -> String {
    if subspaces.is_empty() {
        return "global".to_string();
    }
    subspaces
        .iter()
        .map(|sub| {
            sub.iter()
                .map(|f| field_segment(record, f))
                .collect::<Vec<_>>()
                .join("|")
        })
        .collect::<Vec<_>>()
        .join("||")
}

/// Partition a population of records into subspaces, returned in
/// deterministic sorted-key order.
pub fn partition(records: &[FeatureRecord], subspaces: &[Vec<FieldId>]) -> Vec<Subspace> {
    let mut buckets: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for r in records {
        let key = subspace_key(r, subspaces);
        buckets.entry(key).or_default().push(r.participant_index);
    }
    buckets
        .into_iter()
        .map(|(key, mut members)| {
            members.sort_unstable();
            Subspace { key, members }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn record(idx: usize, language: &str) -> FeatureRecord {
        let mut r = FeatureRecord::new(idx);
        r.categorical.insert(
            "language".parse().unwrap(),
            BTreeSet::from([language.to_string()]),
        );
        r
    }

    #[test]
    fn empty_subspaces_yields_one_global_bucket() {
        let records = vec![record(0, "he"), record(1, "en")];
        let parts = partition(&records, &[]);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].key, "global");
        assert_eq!(parts[0].members, vec![0, 1]);
    }

    #[test]
    fn partitions_by_declared_fields_in_sorted_key_order() {
        let records = vec![record(0, "he"), record(1, "en"), record(2, "he")];
        let fields = vec![vec!["language".parse().unwrap()]];
        let parts = partition(&records, &fields);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].key, "language=en");
        assert_eq!(parts[0].members, vec![1]);
        assert_eq!(parts[1].key, "language=he");
        assert_eq!(parts[1].members, vec![0, 2]);
    }
}
