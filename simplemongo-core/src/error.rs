//! Error types and result types for facade operations.
//!
//! Every facade operation returns a [`DocumentStoreResult<T>`]. Nothing in this
//! workspace aborts the process on a store failure; callers decide the policy.
//!
//! Absence is split in two tiers:
//!
//! - plain lookups (`find_one`, `find`) return `Ok(None)`
//! - find-and-mutate operations return [`DocumentStoreError::DocumentNotFound`],
//!   which can be folded back into `Ok(None)` with [`OptionalExt::optional`]

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use std::time::Duration;
use thiserror::Error;

/// Represents all possible errors that can occur when talking to a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during client construction or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The connection attempt did not complete within the configured bound.
    #[error("Connection attempt timed out after {0:?}")]
    Timeout(Duration),
    /// A document with the given `_id` already exists.
    /// The first argument is the document ID, the second is the namespace.
    #[error("Document {0} already exists in {1}")]
    DocumentAlreadyExists(String, String),
    /// A find-and-mutate operation matched no document in the namespace.
    #[error("No document matched the filter in {0}")]
    DocumentNotFound(String),
    /// The document has an invalid structure for the requested operation.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The filter uses an unknown operator or has a malformed operand.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    /// The update specification is malformed.
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),
    /// The store rejected an administrative command.
    #[error("Command failed: {0}")]
    Command(String),
    /// An error occurred in the underlying store or driver.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Returns `true` if this error only signals that nothing matched.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocumentStoreError::DocumentNotFound(_))
    }
}

/// A specialized `Result` type for facade operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

/// Folds a "nothing matched" error into `Ok(None)`.
///
/// ```ignore
/// let removed = users.find_and_delete(doc! { "name": "ghost" }).await.optional()?;
/// assert!(removed.is_none());
/// ```
pub trait OptionalExt<T> {
    fn optional(self) -> DocumentStoreResult<Option<T>>;
}

impl<T> OptionalExt<T> for DocumentStoreResult<T> {
    fn optional(self) -> DocumentStoreResult<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_folds_only_not_found() {
        let missing: DocumentStoreResult<u32> =
            Err(DocumentStoreError::DocumentNotFound("app.users".into()));
        assert!(matches!(missing.optional(), Ok(None)));

        let found: DocumentStoreResult<u32> = Ok(7);
        assert!(matches!(found.optional(), Ok(Some(7))));

        let failed: DocumentStoreResult<u32> = Err(DocumentStoreError::Backend("down".into()));
        assert!(matches!(failed.optional(), Err(DocumentStoreError::Backend(_))));
    }

    #[test]
    fn timeout_display_includes_duration() {
        let err = DocumentStoreError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "Connection attempt timed out after 10s");
    }
}
