//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{json, Value};

use shopping_list_core::{
    DocId, ShoppingList, ShoppingListFactory, ShoppingListItem, ShoppingListItemValues,
    ShoppingListValues, Timestamp,
};

/// Generate a record title.
pub fn title() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ]{0,23}".prop_map(String::from)
}

/// Generate an optional place name.
pub fn place() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[A-Z][a-z]{2,15}".prop_map(String::from))
}

/// Generate an identifier outside the generated `list:`/`item:` namespaces.
pub fn doc_id() -> impl Strategy<Value = DocId> {
    "test:[a-z0-9]{8,16}".prop_map(DocId::new)
}

/// Generate a timestamp between 1970 and 2100.
pub fn timestamp() -> impl Strategy<Value = Timestamp> {
    (0i64..=4_102_444_800_000i64).prop_filter_map("out of range", Timestamp::from_millis)
}

/// Generate values for a new list.
pub fn list_values() -> impl Strategy<Value = ShoppingListValues> {
    (proptest::option::of(title()), any::<bool>(), place()).prop_map(|(title, checked, place)| {
        ShoppingListValues {
            id: None,
            title,
            checked,
            place,
        }
    })
}

/// Generate values for a new item. The owning list is left to the factory.
pub fn item_values() -> impl Strategy<Value = ShoppingListItemValues> {
    (proptest::option::of(title()), any::<bool>()).prop_map(|(title, checked)| {
        ShoppingListItemValues {
            title,
            checked,
            ..ShoppingListItemValues::default()
        }
    })
}

/// Generate a scalar JSON value, as found in record fields.
pub fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1000i64..1000).prop_map(|n| json!(n)),
        "[a-z]{0,8}".prop_map(Value::String),
    ]
}

/// Parameters for generating a list and its items.
#[derive(Debug, Clone)]
pub struct ListParams {
    pub list: ShoppingListValues,
    pub items: Vec<ShoppingListItemValues>,
}

impl Arbitrary for ListParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (list_values(), prop::collection::vec(item_values(), 0..8))
            .prop_map(|(list, items)| ListParams { list, items })
            .boxed()
    }
}

/// Build an unsaved list and its items from parameters.
pub fn list_from_params(
    factory: &ShoppingListFactory,
    params: &ListParams,
) -> (ShoppingList, Vec<ShoppingListItem>) {
    let list = factory.new_shopping_list(params.list.clone());
    let items = params
        .items
        .iter()
        .map(|values| factory.new_shopping_list_item(values.clone(), Some(&list)))
        .collect();
    (list, items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopping_list::{MemoryStore, Record, Repository};
    use shopping_list_core::{validate_record, FactoryConfig, ItemIdScheme};
    use shopping_list_store::Selector;

    proptest! {
        #[test]
        fn test_generated_records_validate(params: ListParams) {
            let (list, items) = list_from_params(&ShoppingListFactory::new(), &params);

            prop_assert!(validate_record(&list).is_ok());
            for item in &items {
                prop_assert!(validate_record(item).is_ok());
                prop_assert_eq!(item.list(), Some(list.id()));
                prop_assert_eq!(item.id().as_str().len(), 37);
            }
        }

        #[test]
        fn test_nested_ids_share_list_namespace(params: ListParams) {
            let factory = ShoppingListFactory::with_config(FactoryConfig {
                item_id_scheme: ItemIdScheme::Nested,
            });
            let (list, items) = list_from_params(&factory, &params);

            let prefix = format!("{}:item:", list.id());
            for item in &items {
                prop_assert!(item.id().as_str().starts_with(&prefix));
            }
        }

        #[test]
        fn test_document_rebuilds_record(params: ListParams, at in timestamp()) {
            let factory = ShoppingListFactory::new();
            let (list, _) = list_from_params(&factory, &params);
            let stamped = list.stamped(Some(at), at);

            let doc = stamped.to_document().unwrap();
            let rebuilt: ShoppingList = factory.from_document(doc).unwrap();
            prop_assert_eq!(rebuilt, stamped);
        }

        #[test]
        fn test_timestamp_iso_form(at in timestamp()) {
            let iso = at.to_iso_string();
            prop_assert_eq!(iso.len(), 24);
            prop_assert!(iso.ends_with('Z'));
            prop_assert_eq!(iso.parse::<Timestamp>().unwrap(), at);
        }

        #[test]
        fn test_implicit_and_explicit_equality_agree(a in scalar(), b in scalar()) {
            let doc = match json!({"_id": "x", "f": a}) {
                Value::Object(map) => map,
                _ => unreachable!(),
            };
            let implicit = Selector::new().equals("f", b.clone());
            let explicit = Selector::new().with("f", json!({"$eq": b}));

            prop_assert_eq!(implicit.matches(&doc).unwrap(), explicit.matches(&doc).unwrap());
        }

        #[test]
        fn test_counts_match_items(lists in prop::collection::vec(any::<ListParams>(), 1..4)) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let repo = Repository::new(MemoryStore::new());
                let mut expected = std::collections::BTreeMap::new();

                for params in &lists {
                    let (list, items) = list_from_params(repo.factory(), params);
                    repo.post(&list).await.unwrap();
                    repo.post_items_bulk(&items).await.unwrap();
                    if !items.is_empty() {
                        expected.insert(list.id().clone(), items.len());
                    }
                }

                let counts = repo.find_items_count_by_list(None).await.unwrap();
                assert_eq!(counts, expected);
            });
        }
    }
}
