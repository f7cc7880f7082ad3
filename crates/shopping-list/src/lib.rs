//! # Shopping List
//!
//! The unified API for shopping lists: immutable records persisted through a
//! document store with optimistic concurrency and soft deletes.
//!
//! ## Overview
//!
//! - **Records**: [`ShoppingList`] and [`ShoppingListItem`] values built by a
//!   [`ShoppingListFactory`]
//! - **Repository**: create, update, get, soft delete, bulk writes, queries
//!   and count-by-list aggregation
//! - **Stores**: [`SqliteStore`] for persistence, [`MemoryStore`] for tests
//!
//! ## Key Concepts
//!
//! - **Revision**: Every write needs the record's current revision, so stale
//!   copies are rejected as conflicts.
//! - **Tombstone**: Deletes mark a record deleted. Later reads fail with
//!   not-found.
//! - **Cascade**: Deleting a list deletes the items that reference it.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use shopping_list::{Repository, ShoppingListItemValues, ShoppingListValues, SqliteStore};
//!
//! async fn example() {
//!     let repo = Repository::new(SqliteStore::open("lists.db").unwrap());
//!     repo.ensure_indexes().await.unwrap();
//!
//!     let factory = repo.factory();
//!     let list = repo
//!         .post(&factory.new_shopping_list(ShoppingListValues::titled("Groceries")))
//!         .await
//!         .unwrap();
//!     let item = factory.new_shopping_list_item(ShoppingListItemValues::titled("Mangos"), Some(&list));
//!     repo.post_item(&item).await.unwrap();
//!
//!     let counts = repo.find_items_count_by_list(None).await.unwrap();
//!     assert_eq!(counts[list.id()], 1);
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `shopping_list::core` - Records, identifiers and the factory
//! - `shopping_list::store` - Store trait, selectors, SQLite and in-memory stores

pub mod clock;
pub mod error;
pub mod repository;

// Re-export component crates
pub use shopping_list_core as core;
pub use shopping_list_store as store;

// Re-export main types for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{RepositoryError, Result};
pub use repository::{Repository, RepositoryConfig};

// Re-export commonly used types
pub use shopping_list_core::{
    DocId, FactoryConfig, ItemIdScheme, Record, RecordList, Revision, ShoppingList,
    ShoppingListFactory, ShoppingListItem, ShoppingListItemValues, ShoppingListValues, Timestamp,
    ValidationError,
};
pub use shopping_list_store::{
    DocumentStore, FindRequest, IndexDefinition, MemoryStore, Selector, SqliteStore, StoreError,
};
