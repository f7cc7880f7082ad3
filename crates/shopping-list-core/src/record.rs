//! Records: immutable values for shopping lists and their items.
//!
//! A record never changes in place. Every update consumes the record and
//! returns a new one, so a record handed to the repository is never observed
//! half-written.

use std::fmt;
use std::ops::Deref;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{DocId, RecordKind, Revision, Timestamp};

/// The current record schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// A raw JSON document as exchanged with a document store.
pub type Document = serde_json::Map<String, serde_json::Value>;

fn default_version() -> u32 {
    SCHEMA_VERSION
}

/// Fields shared by every persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Header {
    #[serde(rename = "_id")]
    id: DocId,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    rev: Option<Revision>,
    #[serde(rename = "_deleted", default)]
    deleted: bool,
    #[serde(rename = "type")]
    doc_type: String,
    #[serde(default = "default_version")]
    version: u32,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    created_at: Option<Timestamp>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<Timestamp>,
}

impl Header {
    fn new(id: DocId, kind: RecordKind) -> Self {
        Self {
            id,
            rev: None,
            deleted: false,
            doc_type: kind.as_str().to_string(),
            version: SCHEMA_VERSION,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Behaviour shared by list and item records.
///
/// The repository is written once against this trait; the two record kinds
/// only differ in their payload fields and their `KIND`.
pub trait Record:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The kind every record of this type must carry in `type`.
    const KIND: RecordKind;

    fn id(&self) -> &DocId;
    fn rev(&self) -> Option<&Revision>;
    fn doc_type(&self) -> &str;
    fn version(&self) -> u32;
    fn is_deleted(&self) -> bool;
    fn created_at(&self) -> Option<Timestamp>;
    fn updated_at(&self) -> Option<Timestamp>;

    /// Return a copy stamped for a write at `updated_at`.
    ///
    /// `created_at` is only replaced when `Some`.
    fn stamped(self, created_at: Option<Timestamp>, updated_at: Timestamp) -> Self;

    /// Return a copy carrying the identity and revision assigned by the store.
    fn with_revision(self, id: DocId, rev: Revision) -> Self;

    /// Return a copy with the soft-delete flag set.
    fn tombstoned(self) -> Self;

    /// Serialize into the persisted document shape.
    fn to_document(&self) -> Result<Document, ValidationError> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(ValidationError::Malformed(format!(
                "record serialized to non-object: {}",
                other
            ))),
        }
    }
}

macro_rules! header_accessors {
    () => {
        fn id(&self) -> &DocId {
            &self.header.id
        }

        fn rev(&self) -> Option<&Revision> {
            self.header.rev.as_ref()
        }

        fn doc_type(&self) -> &str {
            &self.header.doc_type
        }

        fn version(&self) -> u32 {
            self.header.version
        }

        fn is_deleted(&self) -> bool {
            self.header.deleted
        }

        fn created_at(&self) -> Option<Timestamp> {
            self.header.created_at
        }

        fn updated_at(&self) -> Option<Timestamp> {
            self.header.updated_at
        }

        fn stamped(mut self, created_at: Option<Timestamp>, updated_at: Timestamp) -> Self {
            if created_at.is_some() {
                self.header.created_at = created_at;
            }
            self.header.updated_at = Some(updated_at);
            self
        }

        fn with_revision(mut self, id: DocId, rev: Revision) -> Self {
            self.header.id = id;
            self.header.rev = Some(rev);
            self
        }

        fn tombstoned(mut self) -> Self {
            self.header.deleted = true;
            self
        }
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// ShoppingList
// ─────────────────────────────────────────────────────────────────────────────

/// A shopping list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingList {
    #[serde(flatten)]
    header: Header,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default)]
    checked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    place: Option<String>,
}

impl ShoppingList {
    pub(crate) fn new(
        id: DocId,
        title: Option<String>,
        checked: bool,
        place: Option<String>,
    ) -> Self {
        Self {
            header: Header::new(id, RecordKind::List),
            title,
            checked,
            place,
        }
    }

    pub fn id(&self) -> &DocId {
        &self.header.id
    }

    pub fn rev(&self) -> Option<&Revision> {
        self.header.rev.as_ref()
    }

    pub fn is_deleted(&self) -> bool {
        self.header.deleted
    }

    pub fn doc_type(&self) -> &str {
        &self.header.doc_type
    }

    pub fn version(&self) -> u32 {
        self.header.version
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn checked(&self) -> bool {
        self.checked
    }

    pub fn place(&self) -> Option<&str> {
        self.place.as_deref()
    }

    pub fn created_at(&self) -> Option<Timestamp> {
        self.header.created_at
    }

    pub fn updated_at(&self) -> Option<Timestamp> {
        self.header.updated_at
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn without_title(mut self) -> Self {
        self.title = None;
        self
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn with_place(mut self, place: impl Into<String>) -> Self {
        self.place = Some(place.into());
        self
    }

    pub fn without_place(mut self) -> Self {
        self.place = None;
        self
    }
}

impl Record for ShoppingList {
    const KIND: RecordKind = RecordKind::List;

    header_accessors!();
}

// ─────────────────────────────────────────────────────────────────────────────
// ShoppingListItem
// ─────────────────────────────────────────────────────────────────────────────

/// An entry on a shopping list.
///
/// `list` holds the owning list's identifier. It is set when the item is
/// built and has no setter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingListItem {
    #[serde(flatten)]
    header: Header,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    list: Option<DocId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default)]
    checked: bool,
}

impl ShoppingListItem {
    pub(crate) fn new(
        id: DocId,
        list: Option<DocId>,
        title: Option<String>,
        checked: bool,
    ) -> Self {
        Self {
            header: Header::new(id, RecordKind::Item),
            list,
            title,
            checked,
        }
    }

    pub fn id(&self) -> &DocId {
        &self.header.id
    }

    pub fn rev(&self) -> Option<&Revision> {
        self.header.rev.as_ref()
    }

    pub fn is_deleted(&self) -> bool {
        self.header.deleted
    }

    pub fn doc_type(&self) -> &str {
        &self.header.doc_type
    }

    pub fn version(&self) -> u32 {
        self.header.version
    }

    /// The owning list's identifier.
    pub fn list(&self) -> Option<&DocId> {
        self.list.as_ref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn checked(&self) -> bool {
        self.checked
    }

    pub fn created_at(&self) -> Option<Timestamp> {
        self.header.created_at
    }

    pub fn updated_at(&self) -> Option<Timestamp> {
        self.header.updated_at
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn without_title(mut self) -> Self {
        self.title = None;
        self
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }
}

impl Record for ShoppingListItem {
    const KIND: RecordKind = RecordKind::Item;

    header_accessors!();
}

// ─────────────────────────────────────────────────────────────────────────────
// RecordList
// ─────────────────────────────────────────────────────────────────────────────

/// An ordered, immutable sequence of records of one kind.
///
/// Construction checks that every element carries the right `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RecordList<T>(Vec<T>);

impl<T: Record> RecordList<T> {
    /// Build a list, rejecting any element whose `type` is not `T::KIND`.
    pub fn new(records: Vec<T>) -> Result<Self, ValidationError> {
        crate::validation::validate_record_list(&records)?;
        Ok(Self(records))
    }
}

impl<T> RecordList<T> {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn into_vec(self) -> Vec<T> {
        self.0
    }
}

impl<T> Default for RecordList<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Deref for RecordList<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T> IntoIterator for RecordList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a RecordList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn groceries() -> ShoppingList {
        ShoppingList::new(DocId::from("list:abc"), Some("Groceries".into()), false, None)
    }

    #[test]
    fn test_list_document_shape() {
        let doc = groceries().to_document().unwrap();
        assert_eq!(
            serde_json::Value::Object(doc),
            json!({
                "_id": "list:abc",
                "_deleted": false,
                "type": "list",
                "version": 1,
                "title": "Groceries",
                "checked": false
            })
        );
    }

    #[test]
    fn test_item_document_shape() {
        let item = ShoppingListItem::new(
            DocId::from("item:xyz"),
            Some(DocId::from("list:abc")),
            Some("Mangos".into()),
            true,
        )
        .stamped(
            Timestamp::from_millis(1504060808000),
            Timestamp::from_millis(1504060808000).unwrap(),
        )
        .with_revision(DocId::from("item:xyz"), Revision::from("1-aa"));

        let doc = item.to_document().unwrap();
        assert_eq!(doc["_rev"], json!("1-aa"));
        assert_eq!(doc["list"], json!("list:abc"));
        assert_eq!(doc["createdAt"], json!("2017-08-30T02:40:08.000Z"));
        assert_eq!(doc["updatedAt"], json!("2017-08-30T02:40:08.000Z"));
        assert_eq!(doc["checked"], json!(true));
    }

    #[test]
    fn test_functional_update_leaves_original() {
        let original = groceries();
        let updated = original.clone().with_checked(true).with_place("Market");

        assert!(!original.checked());
        assert_eq!(original.place(), None);
        assert!(updated.checked());
        assert_eq!(updated.place(), Some("Market"));
        assert_eq!(original.id(), updated.id());
    }

    #[test]
    fn test_stamped_keeps_created_at_when_none() {
        let first = Timestamp::from_millis(1000).unwrap();
        let later = Timestamp::from_millis(2000).unwrap();

        let list = groceries().stamped(Some(first), first).stamped(None, later);
        assert_eq!(list.created_at(), Some(first));
        assert_eq!(list.updated_at(), Some(later));
    }

    #[test]
    fn test_deserialize_defaults() {
        let list: ShoppingList =
            serde_json::from_value(json!({"_id": "list:abc", "type": "list"})).unwrap();
        assert_eq!(list.version(), SCHEMA_VERSION);
        assert!(!list.checked());
        assert!(!list.is_deleted());
        assert_eq!(list.rev(), None);
    }

    #[test]
    fn test_record_list_rejects_wrong_type() {
        let wrong: ShoppingList =
            serde_json::from_value(json!({"_id": "list:abc", "type": "item"})).unwrap();
        let result = RecordList::new(vec![groceries(), wrong]);
        assert!(matches!(result, Err(ValidationError::WrongType { .. })));
    }

    #[test]
    fn test_record_list_is_ordered() {
        let a = groceries();
        let b = ShoppingList::new(DocId::from("list:def"), Some("Camping".into()), false, None);
        let list = RecordList::new(vec![a.clone(), b.clone()]).unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list.first(), Some(&a));
        assert_eq!(list.last(), Some(&b));
        assert!(list.contains(&a));
    }
}
