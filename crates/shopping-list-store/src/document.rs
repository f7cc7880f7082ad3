//! Stored document state and the revision rules shared by every backend.
//!
//! Revisions look like `3-9f86d081884c7d659a2feaa0c55ad015`: a generation
//! counter and the first 16 bytes of
//! `blake3(previous revision || canonical JSON body)`, hex-encoded.

use serde_json::Value;

use shopping_list_core::{DocId, Document, Revision};

use crate::error::{Result, StoreError};

const REV_HASH_BYTES: usize = 16;

/// A document as held by a store: body without `_rev`/`_deleted`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub rev: Revision,
    pub deleted: bool,
    pub body: Document,
}

impl StoredDocument {
    /// The body with `_rev` restored, as returned to callers.
    pub fn to_document(&self) -> Document {
        let mut doc = self.body.clone();
        doc.insert("_rev".into(), Value::String(self.rev.as_str().to_string()));
        doc
    }
}

/// A write that has passed the revision check.
#[derive(Debug, Clone)]
pub struct PreparedWrite {
    pub id: DocId,
    pub stored: StoredDocument,
}

/// Compute the revision following `previous` for `body`.
pub fn next_revision(previous: Option<&Revision>, body: &Document) -> Result<Revision> {
    let generation = previous.and_then(Revision::generation).unwrap_or(0) + 1;

    // serde_json::Map keeps keys sorted, so this encoding is canonical.
    let canonical = serde_json::to_vec(body)?;

    let mut hasher = blake3::Hasher::new();
    if let Some(prev) = previous {
        hasher.update(prev.as_str().as_bytes());
    }
    hasher.update(&canonical);
    let digest = hasher.finalize();

    Ok(Revision::new(format!(
        "{}-{}",
        generation,
        hex::encode(&digest.as_bytes()[..REV_HASH_BYTES])
    )))
}

/// The `_id` a write payload targets.
pub fn document_id(doc: &Document) -> Result<DocId> {
    match doc.get("_id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(DocId::new(id.clone())),
        Some(other) => Err(StoreError::InvalidRequest(format!(
            "_id must be a non-empty string, got {}",
            other
        ))),
        None => Err(StoreError::InvalidRequest("document has no _id".into())),
    }
}

/// Apply the revision rules to a write payload.
///
/// `current` is the stored state for the payload's `_id`, if any.
pub fn prepare_put(mut doc: Document, current: Option<&StoredDocument>) -> Result<PreparedWrite> {
    let id = document_id(&doc)?;

    let supplied = match doc.remove("_rev") {
        None | Some(Value::Null) => None,
        Some(Value::String(rev)) => Some(Revision::new(rev)),
        Some(other) => {
            return Err(StoreError::InvalidRequest(format!(
                "_rev must be a string, got {}",
                other
            )))
        }
    };
    let deleted = match doc.remove("_deleted") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => flag,
        Some(other) => {
            return Err(StoreError::InvalidRequest(format!(
                "_deleted must be a boolean, got {}",
                other
            )))
        }
    };

    let accepted = match (current, &supplied) {
        (None, None) => true,
        (None, Some(_)) => false,
        (Some(cur), Some(rev)) => cur.rev == *rev,
        (Some(cur), None) => cur.deleted,
    };
    if !accepted {
        return Err(StoreError::Conflict {
            id: id.into_string(),
        });
    }

    let rev = next_revision(current.map(|c| &c.rev), &doc)?;
    Ok(PreparedWrite {
        id,
        stored: StoredDocument {
            rev,
            deleted,
            body: doc,
        },
    })
}
