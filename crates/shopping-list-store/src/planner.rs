//! Index selection for selector queries.
//!
//! An index is usable when its first field is constrained by a top-level
//! equality or range condition. Among usable indexes the planner prefers:
//!
//! 1. the longest run of leading fields that are constrained,
//! 2. then the fewest fields overall,
//! 3. then the lexicographically smallest name.
//!
//! The choice is deterministic for a given selector and index set.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::selector::Selector;
use crate::traits::IndexDefinition;

/// Warning attached to queries that no index serves.
pub const NO_INDEX_WARNING: &str =
    "no matching index found, create an index to optimize query time";

/// How a query will be executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// The chosen index, or `None` for a full scan.
    pub index: Option<IndexDefinition>,
    /// Leading index fields constrained by the selector.
    pub served_fields: Vec<String>,
}

impl QueryPlan {
    pub fn full_scan() -> Self {
        Self {
            index: None,
            served_fields: Vec::new(),
        }
    }

    pub fn warning(&self) -> Option<String> {
        self.index.is_none().then(|| NO_INDEX_WARNING.to_string())
    }

    /// The fields results are ordered by before `_id`.
    pub fn sort_fields(&self) -> &[String] {
        self.index.as_ref().map(|i| i.fields.as_slice()).unwrap_or(&[])
    }
}

/// Choose an index for a selector.
pub fn plan(selector: &Selector, indexes: &[IndexDefinition]) -> QueryPlan {
    let constrained = constrained_fields(selector);

    let best = indexes
        .iter()
        .filter_map(|index| {
            let prefix = index
                .fields
                .iter()
                .take_while(|f| constrained.contains(f.as_str()))
                .count();
            (prefix > 0).then_some((index, prefix))
        })
        .min_by(|(a, a_prefix), (b, b_prefix)| {
            b_prefix
                .cmp(a_prefix)
                .then_with(|| a.fields.len().cmp(&b.fields.len()))
                .then_with(|| a.name.cmp(&b.name))
        });

    match best {
        Some((index, prefix)) => QueryPlan {
            index: Some(index.clone()),
            served_fields: index.fields[..prefix].to_vec(),
        },
        None => QueryPlan::full_scan(),
    }
}

/// Top-level fields with an equality or range condition.
fn constrained_fields(selector: &Selector) -> BTreeSet<&str> {
    selector
        .as_map()
        .iter()
        .filter(|(field, _)| !field.starts_with('$'))
        .filter(|(_, condition)| is_indexable(condition))
        .map(|(field, _)| field.as_str())
        .collect()
}

fn is_indexable(condition: &Value) -> bool {
    match condition {
        Value::Object(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => ops
            .keys()
            .any(|k| matches!(k.as_str(), "$eq" | "$gt" | "$gte" | "$lt" | "$lte")),
        _ => true,
    }
}
