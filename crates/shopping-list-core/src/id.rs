//! Identifier generation.
//!
//! Identifiers are UUIDv7 values in simple form: 32 lowercase hex characters.
//! The millisecond timestamp leads and `now_v7` keeps a per-process counter,
//! so ids generated by one process sort in generation order.

use uuid::Uuid;

/// Prefix for generated list identifiers.
pub const LIST_ID_PREFIX: &str = "list:";

/// Prefix for generated item identifiers.
pub const ITEM_ID_PREFIX: &str = "item:";

/// Length of a generated identifier (without prefix).
pub const ID_LENGTH: usize = uuid::fmt::Simple::LENGTH;

/// Generate a new 32-character identifier.
pub fn generate_id() -> String {
    Uuid::now_v7().simple().to_string()
}

/// Generate a prefixed identifier, e.g. `list:0190...`.
pub fn generate_prefixed(prefix: &str) -> String {
    format!("{}{}", prefix, generate_id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_id_shape() {
        let id = generate_id();
        assert_eq!(id.len(), ID_LENGTH);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert_eq!(Uuid::parse_str(&id).unwrap().get_version_num(), 7);
    }

    #[test]
    fn test_prefixed_length() {
        let id = generate_prefixed(LIST_ID_PREFIX);
        assert_eq!(id.len(), LIST_ID_PREFIX.len() + 32);
        assert!(id.starts_with("list:"));
        assert!(!id.contains('\n'));
    }

    #[test]
    fn test_ids_unique() {
        let ids: HashSet<String> = (0..10_000).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_ids_sort_in_generation_order() {
        let ids: Vec<String> = (0..1_000).map(|_| generate_id()).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
