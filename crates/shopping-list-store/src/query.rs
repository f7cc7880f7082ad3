//! Query evaluation over candidate documents.
//!
//! Backends narrow the candidate set however they can, then hand it here for
//! filtering, ordering, paging and projection.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use shopping_list_core::Document;

use crate::collate::collate_keys;
use crate::error::Result;
use crate::planner::QueryPlan;
use crate::selector::{lookup, Condition};
use crate::traits::FindRequest;

/// Filter, order, page and project `candidates`.
pub fn execute<I>(candidates: I, request: &FindRequest, plan: &QueryPlan) -> Result<Vec<Document>>
where
    I: IntoIterator<Item = Document>,
{
    let condition = request.selector.compile()?;
    Ok(evaluate(candidates, &condition, request, plan))
}

pub(crate) fn evaluate<I>(
    candidates: I,
    condition: &Condition,
    request: &FindRequest,
    plan: &QueryPlan,
) -> Vec<Document>
where
    I: IntoIterator<Item = Document>,
{
    let mut matched: Vec<Document> = candidates
        .into_iter()
        .filter(|doc| condition.matches(doc))
        .collect();

    let sort_fields = plan.sort_fields();
    matched.sort_by(|a, b| compare(a, b, sort_fields));

    matched
        .into_iter()
        .skip(request.skip.unwrap_or(0))
        .take(request.limit.unwrap_or(usize::MAX))
        .map(|doc| match &request.fields {
            Some(fields) => project(&doc, fields),
            None => doc,
        })
        .collect()
}

fn compare(a: &Document, b: &Document, fields: &[String]) -> Ordering {
    let key_a: Vec<Option<&Value>> = fields.iter().map(|f| lookup(a, f)).collect();
    let key_b: Vec<Option<&Value>> = fields.iter().map(|f| lookup(b, f)).collect();
    collate_keys(&key_a, &key_b).then_with(|| doc_id(a).cmp(doc_id(b)))
}

fn doc_id(doc: &Document) -> &str {
    doc.get("_id").and_then(Value::as_str).unwrap_or_default()
}

/// Keep only `fields` (dotted paths allowed) from `doc`.
///
/// Fields missing from the document are left out.
pub fn project(doc: &Document, fields: &[String]) -> Document {
    let mut out = Map::new();
    for field in fields {
        if let Some(value) = lookup(doc, field) {
            insert_path(&mut out, field, value.clone());
        }
    }
    out
}

fn insert_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(child) = child {
                insert_path(child, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::plan;
    use crate::selector::Selector;
    use crate::traits::IndexDefinition;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn items() -> Vec<Document> {
        vec![
            doc(json!({"_id": "item:3", "type": "item", "list": "list:b", "checked": true})),
            doc(json!({"_id": "item:1", "type": "item", "list": "list:a", "checked": false})),
            doc(json!({"_id": "item:2", "type": "item", "list": "list:a", "checked": true})),
            doc(json!({"_id": "list:a", "type": "list"})),
        ]
    }

    #[test]
    fn test_orders_by_id_without_index() {
        let request = FindRequest::new(Selector::new().equals("type", "item"));
        let plan = plan(&request.selector, &[]);
        let ids: Vec<_> = execute(items(), &request, &plan)
            .unwrap()
            .iter()
            .map(|d| d["_id"].clone())
            .collect();
        assert_eq!(ids, vec![json!("item:1"), json!("item:2"), json!("item:3")]);
    }

    #[test]
    fn test_orders_by_index_key() {
        let request = FindRequest::new(Selector::new().equals("type", "item").equals("checked", true));
        let indexes = [IndexDefinition::new(["type", "checked"])];
        let plan = plan(&request.selector, &indexes);
        let docs = execute(items(), &request, &plan).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["_id"], json!("item:2"));
    }

    #[test]
    fn test_skip_limit_and_projection() {
        let request = FindRequest::new(Selector::new().equals("type", "item"))
            .skip(1)
            .limit(1)
            .fields(["_id", "list"]);
        let plan = plan(&request.selector, &[]);
        let docs = execute(items(), &request, &plan).unwrap();
        assert_eq!(docs, vec![doc(json!({"_id": "item:2", "list": "list:a"}))]);
    }

    #[test]
    fn test_nested_projection() {
        let source = doc(json!({"_id": "x", "meta": {"color": "red", "size": 2}}));
        let projected = project(&source, &["meta.color".to_string(), "missing".to_string()]);
        assert_eq!(projected, doc(json!({"meta": {"color": "red"}})));
    }
}
