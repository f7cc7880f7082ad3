//! DocumentStore trait: the abstract interface for document persistence.
//!
//! This trait allows the repository to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests and scratch sessions).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use shopping_list_core::{DocId, Document, Revision};

use crate::error::{Result, StoreError};
use crate::planner::QueryPlan;
use crate::selector::Selector;

/// Identity and revision assigned by a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutResponse {
    pub id: DocId,
    pub rev: Revision,
}

/// A query: selector plus optional projection and paging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindRequest {
    pub selector: Selector,
    /// Only these fields are returned in each document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
}

impl FindRequest {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            ..Self::default()
        }
    }

    /// Parse a request such as `{"selector": {...}, "fields": [...]}`.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| StoreError::InvalidRequest(format!("malformed find request: {}", e)))
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }
}

/// Result of a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindResponse {
    pub docs: Vec<Document>,
    /// Non-fatal advice from the store, e.g. that no index served the query.
    pub warning: Option<String>,
}

/// A secondary index over one or more document fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub fields: Vec<String>,
}

impl IndexDefinition {
    /// An index named `idx-<fields joined by '-'>`.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        let name = format!("idx-{}", fields.join("-"));
        Self { name, fields }
    }

    pub fn named<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Check the name and field paths are well-formed.
    ///
    /// Field paths are dotted identifiers; names are `[A-Za-z0-9_.-]+`.
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(StoreError::InvalidRequest(format!(
                "index {} has no fields",
                self.name
            )));
        }
        if self.name.is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(StoreError::InvalidRequest(format!(
                "invalid index name: {:?}",
                self.name
            )));
        }
        for field in &self.fields {
            if !is_field_path(field) {
                return Err(StoreError::InvalidRequest(format!(
                    "invalid index field: {:?}",
                    field
                )));
            }
        }
        Ok(())
    }
}

fn is_field_path(path: &str) -> bool {
    path.split('.').all(|segment| {
        let mut chars = segment.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// Outcome of `create_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateIndexResult {
    Created,
    /// An identical index was already present; nothing changed.
    Exists,
}

/// The DocumentStore trait: async interface for document persistence.
///
/// # Revision rules
///
/// - A new document must be written without `_rev`.
/// - An existing document must be written with its current `_rev`.
/// - A tombstoned document may be written again without `_rev`.
/// - Anything else is [`StoreError::Conflict`].
///
/// Writing `_deleted: true` stores a tombstone. Tombstones are invisible to
/// [`get`](DocumentStore::get) and [`find`](DocumentStore::find).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Document Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create or update a document. The payload must carry a string `_id`.
    async fn put(&self, doc: Document) -> Result<PutResponse>;

    /// Get a live document by id, with its current `_rev`.
    async fn get(&self, id: &str) -> Result<Option<Document>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Query Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Run a selector query over live documents.
    ///
    /// Results are ordered by the chosen index's key, then by `_id`.
    async fn find(&self, request: &FindRequest) -> Result<FindResponse>;

    /// Describe how `find` would execute a request.
    async fn explain(&self, request: &FindRequest) -> Result<QueryPlan>;

    // ─────────────────────────────────────────────────────────────────────────
    // Index Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Provision a secondary index. Idempotent for identical definitions.
    async fn create_index(&self, index: &IndexDefinition) -> Result<CreateIndexResult>;

    /// List all secondary indexes.
    async fn get_indexes(&self) -> Result<Vec<IndexDefinition>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Teardown
    // ─────────────────────────────────────────────────────────────────────────

    /// Drop every document and index.
    async fn destroy(&self) -> Result<()>;
}
