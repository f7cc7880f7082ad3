//! Error types for the Shopping List Core.

use thiserror::Error;

use crate::types::{DocId, RecordKind};

/// Validation errors for record shape and discriminators.
///
/// These are raised before any storage interaction.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("record identifier must be set")]
    MissingId,

    #[error("record type must be {expected}, got {found:?}")]
    WrongType { expected: RecordKind, found: String },

    #[error("unsupported record version: {0}")]
    UnsupportedVersion(u32),

    #[error("record {0} already has a revision; it cannot be created again")]
    UnexpectedRevision(DocId),

    #[error("record {0} has no revision; it was never persisted")]
    MissingRevision(DocId),

    #[error("malformed document: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        ValidationError::Malformed(e.to_string())
    }
}
