//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use shopping_list::{FixedClock, Repository, RepositoryConfig};
use shopping_list_core::{
    ShoppingList, ShoppingListFactory, ShoppingListItem, ShoppingListItemValues,
    ShoppingListValues, Timestamp,
};
use shopping_list_store::{DocumentStore, MemoryStore, SqliteStore, StoreError};
use tempfile::TempDir;

/// The instant every fixture clock starts at: `2017-08-30T02:40:08.000Z`.
pub const FIXED_EPOCH_MILLIS: i64 = 1_504_060_808_000;

/// A test fixture with a factory, a fixed clock and a repository.
pub struct TestFixture<S: DocumentStore = MemoryStore> {
    pub factory: ShoppingListFactory,
    pub clock: Arc<FixedClock>,
    pub repo: Repository<S>,
}

impl TestFixture<MemoryStore> {
    /// Create a new test fixture over an empty in-memory store.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }
}

impl Default for TestFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DocumentStore> TestFixture<S> {
    /// Create a fixture over `store`, with the clock at [`FIXED_EPOCH_MILLIS`].
    pub fn with_store(store: S) -> Self {
        let clock = Arc::new(FixedClock::new(epoch()));
        Self {
            factory: ShoppingListFactory::new(),
            repo: Repository::new(store).with_clock(clock.clone()),
            clock,
        }
    }

    pub fn with_config(mut self, config: RepositoryConfig) -> Self {
        self.repo = self.repo.with_config(config);
        self
    }

    /// Build an unsaved list.
    pub fn list(&self, title: &str) -> ShoppingList {
        self.factory
            .new_shopping_list(ShoppingListValues::titled(title))
    }

    /// Build an unsaved, unchecked item owned by `list`.
    pub fn item(&self, title: &str, list: &ShoppingList) -> ShoppingListItem {
        self.factory
            .new_shopping_list_item(ShoppingListItemValues::titled(title), Some(list))
    }

    /// Build an unsaved, checked item owned by `list`.
    pub fn checked_item(&self, title: &str, list: &ShoppingList) -> ShoppingListItem {
        self.factory.new_shopping_list_item(
            ShoppingListItemValues::titled(title).checked(true),
            Some(list),
        )
    }

    /// Move the fixture clock forward.
    pub fn advance(&self, millis: i64) {
        self.clock.advance(millis);
    }

    /// Persist one list with items given as `(title, checked)` pairs.
    pub async fn seed_list(
        &self,
        title: &str,
        items: &[(&str, bool)],
    ) -> shopping_list::Result<(ShoppingList, Vec<ShoppingListItem>)> {
        let list = self.repo.post(&self.list(title)).await?;
        let items: Vec<ShoppingListItem> = items
            .iter()
            .map(|(title, checked)| {
                self.factory.new_shopping_list_item(
                    ShoppingListItemValues::titled(*title).checked(*checked),
                    Some(&list),
                )
            })
            .collect();
        let saved = self.repo.post_items_bulk(&items).await?;
        Ok((list, saved.into_vec()))
    }
}

/// A fixture over a SQLite file in a fresh temporary directory.
///
/// Keep the returned directory alive for as long as the fixture is used.
pub fn sqlite_fixture() -> Result<(TestFixture<SqliteStore>, TempDir), StoreError> {
    let dir = tempfile::tempdir()?;
    let store = SqliteStore::open(dir.path().join("shopping-list.db"))?;
    Ok((TestFixture::with_store(store), dir))
}

fn epoch() -> Timestamp {
    Timestamp::from_millis(FIXED_EPOCH_MILLIS).unwrap_or_else(Timestamp::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_clock_is_fixed() {
        let fixture = TestFixture::new();
        let saved = fixture.repo.post(&fixture.list("Groceries")).await.unwrap();

        assert_eq!(
            saved.created_at().map(|t| t.to_iso_string()).as_deref(),
            Some("2017-08-30T02:40:08.000Z")
        );

        fixture.advance(1_314);
        let updated = fixture.repo.put(&saved.with_checked(true)).await.unwrap();
        assert_eq!(
            updated.updated_at().map(|t| t.to_iso_string()).as_deref(),
            Some("2017-08-30T02:40:09.314Z")
        );
    }

    #[tokio::test]
    async fn test_seed_list() {
        let fixture = TestFixture::new();
        let (list, items) = fixture
            .seed_list("Groceries", &[("Mangos", true), ("Pears", false)])
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.list() == Some(list.id())));
        assert!(items[0].checked());

        let counts = fixture.repo.find_items_count_by_list(None).await.unwrap();
        assert_eq!(counts.get(list.id()), Some(&2));
    }

    #[tokio::test]
    async fn test_sqlite_fixture() {
        let (fixture, _dir) = sqlite_fixture().unwrap();
        fixture.repo.ensure_indexes().await.unwrap();
        let (list, _) = fixture.seed_list("Hardware", &[("Nails", false)]).await.unwrap();

        let read = fixture.repo.get(list.id().as_str()).await.unwrap();
        assert_eq!(read, list);
    }
}
