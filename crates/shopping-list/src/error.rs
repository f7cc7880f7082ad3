//! Error types for the Repository.

use shopping_list_core::{DocId, ValidationError};
use shopping_list_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A record failed the shape or discriminator guard. Nothing was written.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No live document for the identifier.
    #[error("document not found: {0}")]
    NotFound(DocId),

    /// The store rejected a write because of its revision.
    #[error("document update conflict: {0}")]
    Conflict(DocId),

    /// A query request violates a structural precondition.
    #[error("invalid request: {0}")]
    RequestShape(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for RepositoryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { id } => RepositoryError::Conflict(DocId::new(id)),
            other => RepositoryError::Store(other),
        }
    }
}

/// Result type for Repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
