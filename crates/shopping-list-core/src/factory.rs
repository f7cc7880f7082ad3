//! The record factory: builds records and assigns identifiers.

use serde_json::Value;

use crate::error::ValidationError;
use crate::id::generate_prefixed;
use crate::record::{Document, Record, RecordList, ShoppingList, ShoppingListItem};
use crate::types::{DocId, RecordKind};

/// How item identifiers are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemIdScheme {
    /// `item:<id>`
    #[default]
    Flat,
    /// `<list id>:item:<id>`, keeping items inside their list's id namespace.
    /// Falls back to `Flat` when the item has no owning list.
    Nested,
}

/// Configuration for the factory.
#[derive(Debug, Clone, Default)]
pub struct FactoryConfig {
    pub item_id_scheme: ItemIdScheme,
}

/// Initial values for a new list. Omitted fields take record defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingListValues {
    pub id: Option<DocId>,
    pub title: Option<String>,
    pub checked: bool,
    pub place: Option<String>,
}

impl ShoppingListValues {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn place(mut self, place: impl Into<String>) -> Self {
        self.place = Some(place.into());
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }
}

/// Initial values for a new item. Omitted fields take record defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingListItemValues {
    pub id: Option<DocId>,
    pub list: Option<DocId>,
    pub title: Option<String>,
    pub checked: bool,
}

impl ShoppingListItemValues {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }
}

/// Builds list and item records.
///
/// The factory's only side effect is identifier generation.
#[derive(Debug, Clone, Default)]
pub struct ShoppingListFactory {
    config: FactoryConfig,
}

impl ShoppingListFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FactoryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    /// Build a new list, generating `list:<id>` when no identifier is given.
    pub fn new_shopping_list(&self, values: ShoppingListValues) -> ShoppingList {
        let id = values
            .id
            .unwrap_or_else(|| DocId::new(generate_prefixed(RecordKind::List.id_prefix())));
        ShoppingList::new(id, values.title, values.checked, values.place)
    }

    /// Build a new item.
    ///
    /// The owning-list reference comes from `values.list` if set, otherwise
    /// from `owning_list`.
    pub fn new_shopping_list_item(
        &self,
        values: ShoppingListItemValues,
        owning_list: Option<&ShoppingList>,
    ) -> ShoppingListItem {
        let list = values.list.or_else(|| owning_list.map(|l| l.id().clone()));
        let id = match values.id {
            Some(id) => id,
            None => self.item_id(list.as_ref()),
        };
        ShoppingListItem::new(id, list, values.title, values.checked)
    }

    fn item_id(&self, list: Option<&DocId>) -> DocId {
        let prefix = RecordKind::Item.id_prefix();
        match (self.config.item_id_scheme, list) {
            (ItemIdScheme::Nested, Some(list)) => {
                DocId::new(generate_prefixed(&format!("{}:{}", list, prefix)))
            }
            _ => DocId::new(generate_prefixed(prefix)),
        }
    }

    /// Build an ordered list of lists; every element must be `type: "list"`.
    pub fn new_list_of_shopping_lists(
        &self,
        lists: Vec<ShoppingList>,
    ) -> Result<RecordList<ShoppingList>, ValidationError> {
        RecordList::new(lists)
    }

    /// Build an ordered list of items; every element must be `type: "item"`.
    pub fn new_list_of_shopping_list_items(
        &self,
        items: Vec<ShoppingListItem>,
    ) -> Result<RecordList<ShoppingListItem>, ValidationError> {
        RecordList::new(items)
    }

    /// Rebuild a list from a raw document.
    ///
    /// The document's `type` is kept as-is; callers guard it.
    pub fn shopping_list_from_document(
        &self,
        doc: Document,
    ) -> Result<ShoppingList, ValidationError> {
        self.from_document(doc)
    }

    /// Rebuild an item from a raw document.
    pub fn shopping_list_item_from_document(
        &self,
        doc: Document,
    ) -> Result<ShoppingListItem, ValidationError> {
        self.from_document(doc)
    }

    /// Fill in the defaults a document may lack, then deserialize.
    pub fn from_document<R: Record>(&self, mut doc: Document) -> Result<R, ValidationError> {
        if !doc.contains_key("_id") {
            let id = generate_prefixed(R::KIND.id_prefix());
            doc.insert("_id".into(), Value::String(id));
        }
        if !doc.contains_key("type") {
            doc.insert("type".into(), Value::String(R::KIND.as_str().into()));
        }
        Ok(serde_json::from_value(Value::Object(doc))?)
    }
}
