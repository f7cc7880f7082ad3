//! The Repository: persistence for shopping lists and their items.
//!
//! The Repository owns all interaction with the document store. It guards
//! record shape before any I/O, stamps timestamps, turns deletes into
//! tombstones, and rebuilds typed records from query results.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::try_join_all;
use serde_json::Value;
use tracing::{debug, warn};

use shopping_list_core::{
    validate_record, validate_record_list, DocId, Record, RecordKind, RecordList, ShoppingList,
    ShoppingListFactory, ShoppingListItem, Timestamp, ValidationError,
};
use shopping_list_store::{DocumentStore, FindRequest, IndexDefinition, Selector};

use crate::clock::{Clock, SystemClock};
use crate::error::{RepositoryError, Result};

/// Fields every projection is widened with so results rebuild into records.
const RECORD_FIELDS: [&str; 3] = ["_id", "_rev", "type"];

/// Configuration for the Repository.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Also provision `[type, checked]` and `[type, list, checked]`.
    pub checked_indexes: bool,
    /// Deleting a list also deletes the items that reference it.
    pub cascade_deletes: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            checked_indexes: true,
            cascade_deletes: true,
        }
    }
}

/// The main Repository struct.
///
/// Provides:
/// - Index provisioning
/// - Create, update, get and soft delete for lists and items
/// - Bulk variants of the writes
/// - Queries and count-by-list aggregation
pub struct Repository<S: DocumentStore> {
    /// The storage backend.
    store: Arc<S>,
    /// Rebuilds records from stored documents.
    factory: ShoppingListFactory,
    clock: Arc<dyn Clock>,
    config: RepositoryConfig,
}

impl<S: DocumentStore> Repository<S> {
    /// Create a repository over `store` with the system clock and defaults.
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    /// Create a repository over a store handle shared with other owners.
    pub fn from_shared(store: Arc<S>) -> Self {
        Self {
            store,
            factory: ShoppingListFactory::new(),
            clock: Arc::new(SystemClock),
            config: RepositoryConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: RepositoryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_factory(mut self, factory: ShoppingListFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn factory(&self) -> &ShoppingListFactory {
        &self.factory
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Indexes
    // ─────────────────────────────────────────────────────────────────────────

    /// Provision the secondary indexes queries rely on. Safe to call repeatedly.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let mut indexes = vec![
            IndexDefinition::new(["type"]),
            IndexDefinition::new(["type", "list"]),
        ];
        if self.config.checked_indexes {
            indexes.push(IndexDefinition::new(["type", "checked"]));
            indexes.push(IndexDefinition::new(["type", "list", "checked"]));
        }

        for index in &indexes {
            let result = self.store.create_index(index).await?;
            debug!(name = %index.name, ?result, "ensured index");
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lists
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a list that has never been persisted.
    pub async fn post(&self, list: &ShoppingList) -> Result<ShoppingList> {
        let now = self.clock.now();
        self.write(prepare_create(list, now)?).await
    }

    /// Update a list. A list without a revision is created.
    pub async fn put(&self, list: &ShoppingList) -> Result<ShoppingList> {
        let now = self.clock.now();
        self.write(prepare_update(list, now)?).await
    }

    pub async fn get(&self, id: &str) -> Result<ShoppingList> {
        self.fetch(id).await
    }

    /// Soft delete a list and, unless disabled, every item that references it.
    ///
    /// The list is tombstoned before its items. If the cascade fails the
    /// list stays deleted and the error is returned.
    pub async fn delete(&self, list: &ShoppingList) -> Result<ShoppingList> {
        let now = self.clock.now();
        let deleted = self.write(prepare_delete(list, now)?).await?;

        if self.config.cascade_deletes {
            let request = FindRequest::new(
                Selector::new()
                    .equals("type", RecordKind::Item.as_str())
                    .equals("list", deleted.id().as_str()),
            );
            match self.delete_items_bulk_by_find(request).await {
                Ok(items) => debug!(list = %deleted.id(), items = items.len(), "cascaded delete"),
                Err(e) => {
                    warn!(list = %deleted.id(), error = %e, "cascade delete failed");
                    return Err(e);
                }
            }
        }

        Ok(deleted)
    }

    /// Query lists. Defaults to every live list.
    pub async fn find(&self, request: Option<FindRequest>) -> Result<RecordList<ShoppingList>> {
        self.query(request).await
    }

    pub async fn post_bulk(&self, lists: &[ShoppingList]) -> Result<RecordList<ShoppingList>> {
        let now = self.clock.now();
        self.write_all(lists, |list| prepare_create(list, now)).await
    }

    pub async fn put_bulk(&self, lists: &[ShoppingList]) -> Result<RecordList<ShoppingList>> {
        let now = self.clock.now();
        self.write_all(lists, |list| prepare_update(list, now)).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Items
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn post_item(&self, item: &ShoppingListItem) -> Result<ShoppingListItem> {
        let now = self.clock.now();
        self.write(prepare_create(item, now)?).await
    }

    pub async fn put_item(&self, item: &ShoppingListItem) -> Result<ShoppingListItem> {
        let now = self.clock.now();
        self.write(prepare_update(item, now)?).await
    }

    pub async fn get_item(&self, id: &str) -> Result<ShoppingListItem> {
        self.fetch(id).await
    }

    pub async fn delete_item(&self, item: &ShoppingListItem) -> Result<ShoppingListItem> {
        let now = self.clock.now();
        self.write(prepare_delete(item, now)?).await
    }

    /// Query items. Defaults to every live item.
    pub async fn find_items(
        &self,
        request: Option<FindRequest>,
    ) -> Result<RecordList<ShoppingListItem>> {
        self.query(request).await
    }

    /// Count matching items per owning list.
    ///
    /// If the request carries `fields`, they must include `list`. Items with
    /// no owning list are not counted.
    pub async fn find_items_count_by_list(
        &self,
        request: Option<FindRequest>,
    ) -> Result<BTreeMap<DocId, usize>> {
        let request = request.unwrap_or_else(|| {
            FindRequest::new(Selector::new().equals("type", RecordKind::Item.as_str()))
                .fields(["list"])
        });
        if let Some(fields) = &request.fields {
            if !fields.iter().any(|f| f == "list") {
                return Err(RepositoryError::RequestShape(
                    "fields must include \"list\" to count items by list".into(),
                ));
            }
        }

        let items = self.find_items(Some(request)).await?;
        let mut counts = BTreeMap::new();
        for list in items.iter().filter_map(ShoppingListItem::list) {
            *counts.entry(list.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    pub async fn post_items_bulk(
        &self,
        items: &[ShoppingListItem],
    ) -> Result<RecordList<ShoppingListItem>> {
        let now = self.clock.now();
        self.write_all(items, |item| prepare_create(item, now)).await
    }

    pub async fn put_items_bulk(
        &self,
        items: &[ShoppingListItem],
    ) -> Result<RecordList<ShoppingListItem>> {
        let now = self.clock.now();
        self.write_all(items, |item| prepare_update(item, now)).await
    }

    pub async fn delete_items_bulk(
        &self,
        items: &[ShoppingListItem],
    ) -> Result<RecordList<ShoppingListItem>> {
        let now = self.clock.now();
        self.write_all(items, |item| prepare_delete(item, now)).await
    }

    /// Delete every item matching `request`. The request must not carry `fields`.
    pub async fn delete_items_bulk_by_find(
        &self,
        request: FindRequest,
    ) -> Result<RecordList<ShoppingListItem>> {
        if request.fields.is_some() {
            return Err(RepositoryError::RequestShape(
                "fields are not allowed when deleting by query".into(),
            ));
        }
        let items = self.find_items(Some(request)).await?;
        self.delete_items_bulk(&items).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist a prepared record and merge the store's identity and revision.
    async fn write<R: Record>(&self, record: R) -> Result<R> {
        let doc = record.to_document()?;
        let put = self.store.put(doc).await?;
        debug!(
            kind = %R::KIND,
            id = %put.id,
            rev = %put.rev,
            deleted = record.is_deleted(),
            "wrote record"
        );
        Ok(record.with_revision(put.id, put.rev))
    }

    /// Prepare every record, then write them concurrently.
    ///
    /// Nothing is written unless every record passes preparation.
    async fn write_all<R, F>(&self, records: &[R], prepare: F) -> Result<RecordList<R>>
    where
        R: Record,
        F: Fn(&R) -> Result<R>,
    {
        validate_record_list(records)?;
        let prepared = records.iter().map(prepare).collect::<Result<Vec<R>>>()?;
        let written = try_join_all(prepared.into_iter().map(|record| self.write(record))).await?;
        Ok(RecordList::new(written)?)
    }

    async fn fetch<R: Record>(&self, id: &str) -> Result<R> {
        let doc = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(DocId::from(id)))?;
        let record: R = self.factory.from_document(doc)?;
        validate_record(&record)?;
        Ok(record)
    }

    async fn query<R: Record>(&self, request: Option<FindRequest>) -> Result<RecordList<R>> {
        let mut request = request.unwrap_or_else(|| {
            FindRequest::new(Selector::new().equals("type", R::KIND.as_str()))
        });
        check_selector_type(&request, R::KIND)?;

        if let Some(fields) = request.fields.as_mut() {
            for field in RECORD_FIELDS {
                if !fields.iter().any(|f| f == field) {
                    fields.push(field.to_string());
                }
            }
        }

        let response = self.store.find(&request).await?;
        if let Some(warning) = &response.warning {
            warn!(kind = %R::KIND, %warning, "store query warning");
        }

        let records = response
            .docs
            .into_iter()
            .map(|doc| {
                let record: R = self.factory.from_document(doc)?;
                validate_record(&record)?;
                Ok(record)
            })
            .collect::<Result<Vec<R>>>()?;
        Ok(RecordList::new(records)?)
    }
}

fn prepare_create<R: Record>(record: &R, now: Timestamp) -> Result<R> {
    validate_record(record)?;
    if record.rev().is_some() {
        return Err(ValidationError::UnexpectedRevision(record.id().clone()).into());
    }
    Ok(record.clone().stamped(Some(now), now))
}

fn prepare_update<R: Record>(record: &R, now: Timestamp) -> Result<R> {
    validate_record(record)?;
    let created_at = record.rev().is_none().then_some(now);
    Ok(record.clone().stamped(created_at, now))
}

fn prepare_delete<R: Record>(record: &R, now: Timestamp) -> Result<R> {
    validate_record(record)?;
    if record.rev().is_none() {
        return Err(ValidationError::MissingRevision(record.id().clone()).into());
    }
    Ok(record.clone().tombstoned().stamped(None, now))
}

/// Queries must pin `type` to the kind being queried.
fn check_selector_type(request: &FindRequest, kind: RecordKind) -> Result<()> {
    match request.selector.equality("type") {
        Some(Value::String(found)) if found == kind.as_str() => Ok(()),
        Some(other) => Err(RepositoryError::RequestShape(format!(
            "selector.type must be {:?}, got {}",
            kind.as_str(),
            other
        ))),
        None => Err(RepositoryError::RequestShape(format!(
            "selector.type must be {:?}",
            kind.as_str()
        ))),
    }
}
