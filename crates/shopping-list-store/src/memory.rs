//! In-memory implementation of the DocumentStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tracing::debug;

use shopping_list_core::{DocId, Document};

use crate::document::{document_id, prepare_put, StoredDocument};
use crate::error::{Result, StoreError};
use crate::planner::{plan, QueryPlan};
use crate::query;
use crate::traits::{
    CreateIndexResult, DocumentStore, FindRequest, FindResponse, IndexDefinition, PutResponse,
};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Documents (live and tombstoned) by id.
    docs: BTreeMap<DocId, StoredDocument>,

    /// Index definitions by name.
    indexes: BTreeMap<String, IndexDefinition>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Number of stored documents, tombstones included.
    pub fn len(&self) -> usize {
        self.read().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryStoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryStoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn put(&self, doc: Document) -> Result<PutResponse> {
        let mut inner = self.write();

        let id = document_id(&doc)?;
        let write = prepare_put(doc, inner.docs.get(&id))?;
        let rev = write.stored.rev.clone();

        debug!(id = %write.id, rev = %rev, deleted = write.stored.deleted, "put");
        inner.docs.insert(write.id.clone(), write.stored);

        Ok(PutResponse { id: write.id, rev })
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        let inner = self.read();
        Ok(inner
            .docs
            .get(&DocId::from(id))
            .filter(|stored| !stored.deleted)
            .map(StoredDocument::to_document))
    }

    async fn find(&self, request: &FindRequest) -> Result<FindResponse> {
        let condition = request.selector.compile()?;

        let inner = self.read();
        let indexes: Vec<IndexDefinition> = inner.indexes.values().cloned().collect();
        let plan = plan(&request.selector, &indexes);

        let live = inner
            .docs
            .values()
            .filter(|stored| !stored.deleted)
            .map(StoredDocument::to_document);
        let docs = query::evaluate(live, &condition, request, &plan);

        Ok(FindResponse {
            docs,
            warning: plan.warning(),
        })
    }

    async fn explain(&self, request: &FindRequest) -> Result<QueryPlan> {
        request.selector.compile()?;
        let inner = self.read();
        let indexes: Vec<IndexDefinition> = inner.indexes.values().cloned().collect();
        Ok(plan(&request.selector, &indexes))
    }

    async fn create_index(&self, index: &IndexDefinition) -> Result<CreateIndexResult> {
        index.validate()?;
        let mut inner = self.write();

        match inner.indexes.get(&index.name) {
            Some(existing) if existing.fields == index.fields => Ok(CreateIndexResult::Exists),
            Some(_) => Err(StoreError::InvalidRequest(format!(
                "index {} already exists with different fields",
                index.name
            ))),
            None => {
                debug!(name = %index.name, fields = ?index.fields, "create index");
                inner.indexes.insert(index.name.clone(), index.clone());
                Ok(CreateIndexResult::Created)
            }
        }
    }

    async fn get_indexes(&self) -> Result<Vec<IndexDefinition>> {
        Ok(self.read().indexes.values().cloned().collect())
    }

    async fn destroy(&self) -> Result<()> {
        let mut inner = self.write();
        inner.docs.clear();
        inner.indexes.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::NO_INDEX_WARNING;
    use crate::selector::Selector;
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryStore::new();

        let put = store
            .put(doc(json!({"_id": "list:a", "type": "list", "title": "Groceries"})))
            .await
            .unwrap();
        assert_eq!(put.id.as_str(), "list:a");

        let got = store.get("list:a").await.unwrap().unwrap();
        assert_eq!(got["title"], json!("Groceries"));
        assert_eq!(got["_rev"], json!(put.rev.as_str()));
        assert!(store.get("list:missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_revision_conflicts() {
        let store = MemoryStore::new();
        let first = store.put(doc(json!({"_id": "a"}))).await.unwrap();
        store
            .put(doc(json!({"_id": "a", "_rev": first.rev.as_str(), "n": 1})))
            .await
            .unwrap();

        let stale = store
            .put(doc(json!({"_id": "a", "_rev": first.rev.as_str(), "n": 2})))
            .await;
        assert!(matches!(stale, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_tombstones_hidden() {
        let store = MemoryStore::new();
        let put = store.put(doc(json!({"_id": "a", "type": "item"}))).await.unwrap();
        store
            .put(doc(json!({"_id": "a", "_rev": put.rev.as_str(), "_deleted": true, "type": "item"})))
            .await
            .unwrap();

        assert!(store.get("a").await.unwrap().is_none());
        let found = store
            .find(&FindRequest::new(Selector::new().equals("type", "item")))
            .await
            .unwrap();
        assert!(found.docs.is_empty());
        assert_eq!(store.len(), 1);

        // Recreate without a revision.
        store.put(doc(json!({"_id": "a", "type": "item"}))).await.unwrap();
        assert!(store.get("a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_find_warns_without_index() {
        let store = MemoryStore::new();
        store.put(doc(json!({"_id": "a", "type": "item"}))).await.unwrap();

        let request = FindRequest::new(Selector::new().equals("type", "item"));
        let found = store.find(&request).await.unwrap();
        assert_eq!(found.docs.len(), 1);
        assert_eq!(found.warning.as_deref(), Some(NO_INDEX_WARNING));

        store
            .create_index(&IndexDefinition::new(["type"]))
            .await
            .unwrap();
        let found = store.find(&request).await.unwrap();
        assert_eq!(found.warning, None);
    }

    #[tokio::test]
    async fn test_create_index_idempotent() {
        let store = MemoryStore::new();
        let index = IndexDefinition::new(["type", "list"]);

        assert_eq!(store.create_index(&index).await.unwrap(), CreateIndexResult::Created);
        assert_eq!(store.create_index(&index).await.unwrap(), CreateIndexResult::Exists);
        assert_eq!(store.get_indexes().await.unwrap(), vec![index]);

        let clash = IndexDefinition::named("idx-type-list", ["type"]);
        assert!(store.create_index(&clash).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_selector_rejected() {
        let store = MemoryStore::new();
        let request = FindRequest::new(Selector::new().with("type", json!({"$regex": "i"})));
        assert!(matches!(
            store.find(&request).await,
            Err(StoreError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_destroy() {
        let store = MemoryStore::new();
        store.put(doc(json!({"_id": "a"}))).await.unwrap();
        store.create_index(&IndexDefinition::new(["type"])).await.unwrap();

        store.destroy().await.unwrap();
        assert!(store.is_empty());
        assert!(store.get_indexes().await.unwrap().is_empty());
    }
}
