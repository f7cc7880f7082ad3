//! # Shopping List Testkit
//!
//! Testing utilities for the shopping-list crates.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: A repository over a fresh store with a fixed clock
//! - **Generators**: Proptest strategies for records and documents
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust
//! use shopping_list_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let groceries = fixture.list("Groceries");
//! let mangos = fixture.item("Mangos", &groceries);
//! assert_eq!(mangos.list(), Some(groceries.id()));
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use shopping_list_testkit::generators::{list_from_params, ListParams};
//!
//! proptest! {
//!     #[test]
//!     fn items_point_at_their_list(params: ListParams) {
//!         let (list, items) = list_from_params(&Default::default(), &params);
//!         prop_assert!(items.iter().all(|i| i.list() == Some(list.id())));
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{sqlite_fixture, TestFixture, FIXED_EPOCH_MILLIS};
pub use generators::{list_from_params, ListParams};
