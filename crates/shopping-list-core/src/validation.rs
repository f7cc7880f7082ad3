//! Record validation: shape and discriminator guards.
//!
//! These run at the boundary of every repository operation, before any
//! storage interaction.

use crate::error::ValidationError;
use crate::record::{Record, SCHEMA_VERSION};

/// Validate a record's shape.
///
/// This checks:
/// - Identifier is present
/// - `type` matches the record kind
/// - Schema version is supported
pub fn validate_record<R: Record>(record: &R) -> Result<(), ValidationError> {
    if record.id().is_empty() {
        return Err(ValidationError::MissingId);
    }

    validate_kind(record)?;

    if record.version() != SCHEMA_VERSION {
        return Err(ValidationError::UnsupportedVersion(record.version()));
    }

    Ok(())
}

/// Validate that every record in a sequence carries the right `type`.
pub fn validate_record_list<R: Record>(records: &[R]) -> Result<(), ValidationError> {
    records.iter().try_for_each(validate_kind)
}

fn validate_kind<R: Record>(record: &R) -> Result<(), ValidationError> {
    if record.doc_type() != R::KIND.as_str() {
        return Err(ValidationError::WrongType {
            expected: R::KIND,
            found: record.doc_type().to_string(),
        });
    }
    Ok(())
}
