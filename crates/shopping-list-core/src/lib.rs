//! # Shopping List Core
//!
//! Pure primitives for shopping lists: identifiers, timestamps, immutable
//! records, and the record factory.
//!
//! This crate contains no I/O, no storage, no async. It is pure computation
//! over value types.
//!
//! ## Key Types
//!
//! - [`ShoppingList`] - A list record (`type: "list"`)
//! - [`ShoppingListItem`] - An item record (`type: "item"`) owned by a list
//! - [`ShoppingListFactory`] - Builds records and assigns identifiers
//! - [`RecordList`] - Ordered, immutable sequence of records
//! - [`DocId`], [`Revision`], [`Timestamp`] - Strongly typed document fields
//!
//! ## Records
//!
//! Records are values. Updates go through `with_*` methods that consume the
//! record and return a new one:
//!
//! ```rust
//! use shopping_list_core::{ShoppingListFactory, ShoppingListValues};
//!
//! let factory = ShoppingListFactory::new();
//! let groceries = factory.new_shopping_list(ShoppingListValues::titled("Groceries"));
//! let done = groceries.clone().with_checked(true);
//!
//! assert!(!groceries.checked());
//! assert!(done.checked());
//! assert_eq!(groceries.id(), done.id());
//! ```

pub mod error;
pub mod factory;
pub mod id;
pub mod record;
pub mod types;
pub mod validation;

pub use error::ValidationError;
pub use factory::{
    FactoryConfig, ItemIdScheme, ShoppingListFactory, ShoppingListItemValues, ShoppingListValues,
};
pub use id::{generate_id, ID_LENGTH, ITEM_ID_PREFIX, LIST_ID_PREFIX};
pub use record::{Document, Record, RecordList, ShoppingList, ShoppingListItem, SCHEMA_VERSION};
pub use types::{DocId, RecordKind, Revision, Timestamp};
pub use validation::{validate_record, validate_record_list};
