//! Selectors: declarative, MongoDB-style query filters.
//!
//! ```text
//! {"type": "item", "list": "list:abc"}                implicit equality
//! {"type": "item", "checked": {"$eq": true}}          operator form
//! {"$or": [{"title": "Mangos"}, {"title": "Pears"}]}  combinators
//! ```
//!
//! Supported operators: `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`,
//! `$nin`, `$exists`, and the combinators `$and`, `$or`, `$nor`. Field names
//! may be dotted paths into nested objects.
//!
//! A field that is missing from a document only matches `$exists: false`.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use shopping_list_core::Document;

use crate::collate::{collate, collate_eq};
use crate::error::{Result, StoreError};

/// A selector as sent by callers: a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector(Map<String, Value>);

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(StoreError::InvalidRequest(format!(
                "selector must be an object, got {}",
                other
            ))),
        }
    }

    /// Add an implicit-equality condition.
    pub fn equals(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Add a raw condition, e.g. `json!({"$gt": 3})`.
    pub fn with(mut self, field: impl Into<String>, condition: Value) -> Self {
        self.0.insert(field.into(), condition);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// The value a top-level field is required to equal, if any.
    ///
    /// Recognizes both `{"f": v}` and `{"f": {"$eq": v}}`.
    pub fn equality(&self, field: &str) -> Option<&Value> {
        let condition = self.0.get(field)?;
        match condition {
            Value::Object(ops) if is_operator_object(ops) => ops.get("$eq"),
            other => Some(other),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Parse into an evaluable condition tree.
    pub fn compile(&self) -> Result<Condition> {
        compile_object(&self.0)
    }

    /// Compile and evaluate against one document.
    pub fn matches(&self, doc: &Document) -> Result<bool> {
        Ok(self.compile()?.matches(doc))
    }
}

/// A compiled selector.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Every child matches.
    All(Vec<Condition>),
    /// At least one child matches.
    Any(Vec<Condition>),
    /// No child matches.
    NoneOf(Vec<Condition>),
    /// A single operator applied to one field.
    Field { path: String, op: FieldOp },
}

/// A comparison applied to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
}

impl FieldOp {
    /// True for operators an index over the field can serve.
    pub fn is_indexable(&self) -> bool {
        matches!(
            self,
            FieldOp::Eq(_) | FieldOp::Gt(_) | FieldOp::Gte(_) | FieldOp::Lt(_) | FieldOp::Lte(_)
        )
    }

    fn matches(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (FieldOp::Exists(expected), v) => v.is_some() == *expected,
            (_, None) => false,
            (FieldOp::Eq(target), Some(v)) => collate_eq(v, target),
            (FieldOp::Ne(target), Some(v)) => !collate_eq(v, target),
            (FieldOp::Gt(target), Some(v)) => collate(v, target) == Ordering::Greater,
            (FieldOp::Gte(target), Some(v)) => collate(v, target) != Ordering::Less,
            (FieldOp::Lt(target), Some(v)) => collate(v, target) == Ordering::Less,
            (FieldOp::Lte(target), Some(v)) => collate(v, target) != Ordering::Greater,
            (FieldOp::In(targets), Some(v)) => targets.iter().any(|t| collate_eq(v, t)),
            (FieldOp::Nin(targets), Some(v)) => !targets.iter().any(|t| collate_eq(v, t)),
        }
    }
}

impl Condition {
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Condition::All(children) => children.iter().all(|c| c.matches(doc)),
            Condition::Any(children) => children.iter().any(|c| c.matches(doc)),
            Condition::NoneOf(children) => !children.iter().any(|c| c.matches(doc)),
            Condition::Field { path, op } => op.matches(lookup(doc, path)),
        }
    }
}

/// Resolve a dotted path inside a document.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn is_operator_object(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|k| k.starts_with('$'))
}

fn compile_object(map: &Map<String, Value>) -> Result<Condition> {
    let mut conditions = Vec::with_capacity(map.len());

    for (key, value) in map {
        match key.as_str() {
            "$and" => conditions.push(Condition::All(compile_array(key, value)?)),
            "$or" => conditions.push(Condition::Any(compile_array(key, value)?)),
            "$nor" => conditions.push(Condition::NoneOf(compile_array(key, value)?)),
            k if k.starts_with('$') => {
                return Err(StoreError::InvalidRequest(format!(
                    "unknown combinator: {}",
                    k
                )))
            }
            field => compile_field(field, value, &mut conditions)?,
        }
    }

    Ok(Condition::All(conditions))
}

fn compile_array(key: &str, value: &Value) -> Result<Vec<Condition>> {
    let items = value
        .as_array()
        .ok_or_else(|| StoreError::InvalidRequest(format!("{} expects an array", key)))?;

    items
        .iter()
        .map(|item| match item {
            Value::Object(map) => compile_object(map),
            other => Err(StoreError::InvalidRequest(format!(
                "{} expects an array of selectors, got {}",
                key, other
            ))),
        })
        .collect()
}

fn compile_field(field: &str, value: &Value, out: &mut Vec<Condition>) -> Result<()> {
    let ops = match value {
        Value::Object(map) if is_operator_object(map) => map,
        Value::Object(map) if map.keys().any(|k| k.starts_with('$')) => {
            return Err(StoreError::InvalidRequest(format!(
                "field {} mixes operators and plain keys",
                field
            )))
        }
        implicit => {
            out.push(Condition::Field {
                path: field.to_string(),
                op: FieldOp::Eq(implicit.clone()),
            });
            return Ok(());
        }
    };

    for (op, operand) in ops {
        let op = match op.as_str() {
            "$eq" => FieldOp::Eq(operand.clone()),
            "$ne" => FieldOp::Ne(operand.clone()),
            "$gt" => FieldOp::Gt(operand.clone()),
            "$gte" => FieldOp::Gte(operand.clone()),
            "$lt" => FieldOp::Lt(operand.clone()),
            "$lte" => FieldOp::Lte(operand.clone()),
            "$in" => FieldOp::In(array_operand(field, op, operand)?),
            "$nin" => FieldOp::Nin(array_operand(field, op, operand)?),
            "$exists" => FieldOp::Exists(operand.as_bool().ok_or_else(|| {
                StoreError::InvalidRequest(format!("{}.$exists expects a boolean", field))
            })?),
            unknown => {
                return Err(StoreError::InvalidRequest(format!(
                    "unknown operator {} on field {}",
                    unknown, field
                )))
            }
        };
        out.push(Condition::Field {
            path: field.to_string(),
            op,
        });
    }

    Ok(())
}

fn array_operand(field: &str, op: &str, operand: &Value) -> Result<Vec<Value>> {
    operand
        .as_array()
        .cloned()
        .ok_or_else(|| StoreError::InvalidRequest(format!("{}.{} expects an array", field, op)))
}
