//! # Shopping List Store
//!
//! Storage abstraction for shopping-list documents. Provides a trait-based
//! interface for JSON document persistence with SQLite and in-memory
//! implementations.
//!
//! ## Overview
//!
//! The store module abstracts document storage behind the [`DocumentStore`]
//! trait, allowing the repository to be storage-agnostic. The primary
//! implementation is [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`DocumentStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`Selector`] - Declarative query filter
//! - [`FindRequest`] / [`FindResponse`] - Query input and output
//! - [`IndexDefinition`] - A secondary index over document fields
//!
//! ## Usage
//!
//! ```rust,no_run
//! use shopping_list_store::{DocumentStore, FindRequest, IndexDefinition, Selector, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("lists.db").unwrap();
//!     store
//!         .create_index(&IndexDefinition::new(["type", "list"]))
//!         .await
//!         .unwrap();
//!
//!     let request = FindRequest::new(Selector::new().equals("type", "item"));
//!     let response = store.find(&request).await.unwrap();
//!     println!("{} items", response.docs.len());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Optimistic concurrency**: every write must name the current revision
//! - **Soft deletes**: tombstones stay in storage but never surface in reads
//! - **Deterministic ordering**: results sort by index key, then `_id`

pub mod collate;
pub mod document;
pub mod error;
pub mod memory;
pub mod migration;
pub mod planner;
pub mod query;
pub mod selector;
pub mod sqlite;
pub mod traits;

pub use document::StoredDocument;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use planner::{QueryPlan, NO_INDEX_WARNING};
pub use selector::{Condition, FieldOp, Selector};
pub use sqlite::SqliteStore;
pub use traits::{
    CreateIndexResult, DocumentStore, FindRequest, FindResponse, IndexDefinition, PutResponse,
};
