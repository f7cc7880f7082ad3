//! SQLite implementation of the DocumentStore trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking.
//!
//! Document bodies are stored as JSON text. Secondary indexes become SQLite
//! expression indexes over `json_extract(body, '$.<field>')`, and `find`
//! pushes scalar equality on the chosen index's fields down into SQL so
//! those indexes are actually used. The full selector is then applied in
//! Rust.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use tracing::debug;

use shopping_list_core::{Document, Revision};

use crate::document::{document_id, prepare_put, StoredDocument};
use crate::error::{Result, StoreError};
use crate::migration;
use crate::planner::{plan, QueryPlan};
use crate::query;
use crate::selector::Selector;
use crate::traits::{
    CreateIndexResult, DocumentStore, FindRequest, FindResponse, IndexDefinition, PutResponse,
};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("spawn_blocking failed: {}", e)),
            ))
        })?
    }
}

// Helper to load the stored state of one document
fn load_document(conn: &Connection, id: &str) -> Result<Option<StoredDocument>> {
    let row: Option<(String, bool, String)> = conn
        .query_row(
            "SELECT rev, deleted, body FROM documents WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    row.map(|(rev, deleted, body)| {
        Ok(StoredDocument {
            rev: Revision::new(rev),
            deleted,
            body: serde_json::from_str(&body)?,
        })
    })
    .transpose()
}

fn load_indexes(conn: &Connection) -> Result<Vec<IndexDefinition>> {
    let mut stmt = conn.prepare("SELECT name, fields FROM doc_indexes ORDER BY name")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(name, fields)| {
            Ok(IndexDefinition {
                name,
                fields: serde_json::from_str(&fields)?,
            })
        })
        .collect()
}

/// `json_extract` over a validated field path.
fn extract_expr(field: &str) -> String {
    format!("json_extract(body, '$.{}')", field)
}

fn sql_index_name(index: &IndexDefinition) -> String {
    format!("\"docidx_{}\"", index.name)
}

/// SQL predicates for the scalar equalities the chosen index serves.
fn pushdown(selector: &Selector, plan: &QueryPlan) -> (String, Vec<SqlValue>) {
    let mut sql = String::new();
    let mut values = Vec::new();

    for field in &plan.served_fields {
        let value = match selector.equality(field) {
            Some(Value::String(s)) => SqlValue::Text(s.clone()),
            Some(Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
            Some(Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => SqlValue::Integer(i),
                (None, Some(f)) => SqlValue::Real(f),
                _ => continue,
            },
            _ => continue,
        };
        values.push(value);
        sql.push_str(&format!(" AND {} = ?{}", extract_expr(field), values.len()));
    }

    (sql, values)
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn put(&self, doc: Document) -> Result<PutResponse> {
        self.blocking(move |conn| {
            let id = document_id(&doc)?;
            let tx = conn.transaction()?;

            let current = load_document(&tx, id.as_str())?;
            let write = prepare_put(doc, current.as_ref())?;
            let body = serde_json::to_string(&write.stored.body)?;

            tx.execute(
                "INSERT INTO documents (id, rev, deleted, body) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    rev = excluded.rev,
                    deleted = excluded.deleted,
                    body = excluded.body",
                params![
                    write.id.as_str(),
                    write.stored.rev.as_str(),
                    write.stored.deleted,
                    body
                ],
            )?;
            tx.commit()?;

            debug!(
                id = %write.id,
                rev = %write.stored.rev,
                deleted = write.stored.deleted,
                "put"
            );
            Ok(PutResponse {
                id: write.id,
                rev: write.stored.rev,
            })
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        let id = id.to_string();
        self.blocking(move |conn| {
            Ok(load_document(conn, &id)?
                .filter(|stored| !stored.deleted)
                .map(|stored| stored.to_document()))
        })
        .await
    }

    async fn find(&self, request: &FindRequest) -> Result<FindResponse> {
        let condition = request.selector.compile()?;
        let request = request.clone();

        self.blocking(move |conn| {
            let plan = plan(&request.selector, &load_indexes(conn)?);
            let (predicates, values) = pushdown(&request.selector, &plan);

            let sql = format!(
                "SELECT rev, body FROM documents WHERE deleted = 0{}",
                predicates
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let candidates = rows
                .into_iter()
                .map(|(rev, body)| {
                    Ok(StoredDocument {
                        rev: Revision::new(rev),
                        deleted: false,
                        body: serde_json::from_str(&body)?,
                    }
                    .to_document())
                })
                .collect::<Result<Vec<Document>>>()?;

            let docs = query::evaluate(candidates, &condition, &request, &plan);
            Ok(FindResponse {
                docs,
                warning: plan.warning(),
            })
        })
        .await
    }

    async fn explain(&self, request: &FindRequest) -> Result<QueryPlan> {
        request.selector.compile()?;
        let selector = request.selector.clone();
        self.blocking(move |conn| Ok(plan(&selector, &load_indexes(conn)?)))
            .await
    }

    async fn create_index(&self, index: &IndexDefinition) -> Result<CreateIndexResult> {
        index.validate()?;
        let index = index.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let existing: Option<String> = tx
                .query_row(
                    "SELECT fields FROM doc_indexes WHERE name = ?1",
                    params![index.name],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(fields) = existing {
                let fields: Vec<String> = serde_json::from_str(&fields)?;
                if fields == index.fields {
                    return Ok(CreateIndexResult::Exists);
                }
                return Err(StoreError::InvalidRequest(format!(
                    "index {} already exists with different fields",
                    index.name
                )));
            }

            let columns: Vec<String> = index.fields.iter().map(|f| extract_expr(f)).collect();
            tx.execute_batch(&format!(
                "CREATE INDEX IF NOT EXISTS {} ON documents({})",
                sql_index_name(&index),
                columns.join(", ")
            ))?;
            tx.execute(
                "INSERT INTO doc_indexes (name, fields, created_at) VALUES (?1, ?2, ?3)",
                params![
                    index.name,
                    serde_json::to_string(&index.fields)?,
                    chrono::Utc::now().timestamp_millis()
                ],
            )?;
            tx.commit()?;

            debug!(name = %index.name, fields = ?index.fields, "create index");
            Ok(CreateIndexResult::Created)
        })
        .await
    }

    async fn get_indexes(&self) -> Result<Vec<IndexDefinition>> {
        self.blocking(|conn| load_indexes(conn)).await
    }

    async fn destroy(&self) -> Result<()> {
        self.blocking(|conn| {
            let indexes = load_indexes(conn)?;
            let tx = conn.transaction()?;
            for index in &indexes {
                tx.execute_batch(&format!("DROP INDEX IF EXISTS {}", sql_index_name(index)))?;
            }
            tx.execute("DELETE FROM doc_indexes", [])?;
            tx.execute("DELETE FROM documents", [])?;
            tx.commit()?;

            debug!(indexes = indexes.len(), "destroyed store");
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::NO_INDEX_WARNING;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    async fn seeded() -> SqliteStore {
        let store = SqliteStore::open_memory().unwrap();
        for (id, list, checked) in [
            ("item:1", "list:a", true),
            ("item:2", "list:a", false),
            ("item:3", "list:b", true),
        ] {
            store
                .put(doc(json!({"_id": id, "type": "item", "list": list, "checked": checked})))
                .await
                .unwrap();
        }
        store
            .put(doc(json!({"_id": "list:a", "type": "list", "checked": true})))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = SqliteStore::open_memory().unwrap();
        let put = store
            .put(doc(json!({"_id": "list:a", "type": "list", "title": "Groceries"})))
            .await
            .unwrap();
        assert_eq!(put.rev.generation(), Some(1));

        let got = store.get("list:a").await.unwrap().unwrap();
        assert_eq!(got["title"], json!("Groceries"));
        assert_eq!(got["_rev"], json!(put.rev.as_str()));
        assert!(!got.contains_key("_deleted"));
    }

    #[tokio::test]
    async fn test_conflict_detection() {
        let store = SqliteStore::open_memory().unwrap();
        let first = store.put(doc(json!({"_id": "a"}))).await.unwrap();

        let duplicate = store.put(doc(json!({"_id": "a"}))).await;
        assert!(matches!(duplicate, Err(StoreError::Conflict { .. })));

        let second = store
            .put(doc(json!({"_id": "a", "_rev": first.rev.as_str()})))
            .await
            .unwrap();
        assert_eq!(second.rev.generation(), Some(2));

        let stale = store
            .put(doc(json!({"_id": "a", "_rev": first.rev.as_str()})))
            .await;
        assert!(matches!(stale, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_tombstones_hidden_and_recreatable() {
        let store = seeded().await;
        let item = store.get("item:1").await.unwrap().unwrap();
        let mut tombstone = item.clone();
        tombstone.insert("_deleted".into(), json!(true));
        store.put(tombstone).await.unwrap();

        assert!(store.get("item:1").await.unwrap().is_none());
        let found = store
            .find(&FindRequest::new(Selector::new().equals("type", "item")))
            .await
            .unwrap();
        assert_eq!(found.docs.len(), 2);

        let recreated = store
            .put(doc(json!({"_id": "item:1", "type": "item"})))
            .await
            .unwrap();
        assert_eq!(recreated.rev.generation(), Some(3));
    }

    #[tokio::test]
    async fn test_find_with_pushdown() {
        let store = seeded().await;
        store
            .create_index(&IndexDefinition::new(["type", "list", "checked"]))
            .await
            .unwrap();

        let request = FindRequest::new(
            Selector::new()
                .equals("type", "item")
                .equals("list", "list:a")
                .equals("checked", true),
        );
        let found = store.find(&request).await.unwrap();
        assert_eq!(found.warning, None);
        assert_eq!(found.docs.len(), 1);
        assert_eq!(found.docs[0]["_id"], json!("item:1"));

        let unchecked = FindRequest::new(
            Selector::new()
                .equals("type", "item")
                .equals("list", "list:a")
                .equals("checked", false),
        );
        let found = store.find(&unchecked).await.unwrap();
        assert_eq!(found.docs.len(), 1);
        assert_eq!(found.docs[0]["_id"], json!("item:2"));
    }

    #[tokio::test]
    async fn test_find_without_index_warns() {
        let store = seeded().await;
        let request = FindRequest::new(Selector::new().equals("type", "item")).fields(["list"]);
        let found = store.find(&request).await.unwrap();

        assert_eq!(found.warning.as_deref(), Some(NO_INDEX_WARNING));
        assert_eq!(found.docs.len(), 3);
        assert_eq!(found.docs[0], doc(json!({"list": "list:a"})));
    }

    #[tokio::test]
    async fn test_create_index_builds_expression_index() {
        let store = SqliteStore::open_memory().unwrap();
        let index = IndexDefinition::new(["type", "list"]);

        assert_eq!(store.create_index(&index).await.unwrap(), CreateIndexResult::Created);
        assert_eq!(store.create_index(&index).await.unwrap(), CreateIndexResult::Exists);
        assert_eq!(store.get_indexes().await.unwrap(), vec![index]);

        let sql: String = store
            .blocking(|conn| {
                Ok(conn.query_row(
                    "SELECT sql FROM sqlite_master WHERE type = 'index' AND name = 'docidx_idx-type-list'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap();
        assert!(sql.contains("json_extract(body, '$.list')"));
    }

    #[tokio::test]
    async fn test_explain() {
        let store = SqliteStore::open_memory().unwrap();
        store.create_index(&IndexDefinition::new(["type"])).await.unwrap();
        store
            .create_index(&IndexDefinition::new(["type", "list"]))
            .await
            .unwrap();

        let request = FindRequest::new(Selector::new().equals("type", "item").equals("list", "x"));
        let plan = store.explain(&request).await.unwrap();
        assert_eq!(plan.index.map(|i| i.name).as_deref(), Some("idx-type-list"));
    }

    #[tokio::test]
    async fn test_persistence_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lists.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .put(doc(json!({"_id": "list:a", "type": "list", "title": "Hardware"})))
                .await
                .unwrap();
            store.create_index(&IndexDefinition::new(["type"])).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let got = store.get("list:a").await.unwrap().unwrap();
        assert_eq!(got["title"], json!("Hardware"));
        assert_eq!(store.get_indexes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_destroy() {
        let store = seeded().await;
        store.create_index(&IndexDefinition::new(["type"])).await.unwrap();

        store.destroy().await.unwrap();
        assert!(store.get("item:1").await.unwrap().is_none());
        assert!(store.get_indexes().await.unwrap().is_empty());

        // Still usable afterwards.
        store.put(doc(json!({"_id": "item:1"}))).await.unwrap();
        store.create_index(&IndexDefinition::new(["type"])).await.unwrap();
    }
}
