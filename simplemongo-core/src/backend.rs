//! Storage backend abstraction for the facade.
//!
//! The [`StoreBackend`] trait is the single seam between the procedural facade
//! ([`crate::store`], [`crate::collection`]) and a concrete document store. Each
//! method maps onto exactly one store primitive; backends translate arguments,
//! await the store and map its failures into [`DocumentStoreError`](crate::error::DocumentStoreError).
//!
//! # Traits
//!
//! - [`StoreBackend`]: the operations a store must provide
//! - [`StoreBackendBuilder`]: factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use simplemongo::backend::{Namespace, StoreBackend};
//! use bson::doc;
//!
//! let ns = Namespace::new("app", "users");
//! let id = backend.insert_one(&ns, doc! { "name": "Alice" }).await?;
//! let alice = backend.find_one(&ns, doc! { "_id": id }).await?;
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use std::fmt::{self, Debug, Display};

use crate::{error::DocumentStoreResult, query::Query};

/// Identifies a collection inside a database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Which state of the document a find-and-mutate operation returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnDocument {
    /// The document as it was before the mutation.
    Before,
    /// The document as it is after the mutation.
    After,
}

/// Counts reported by the store for an update or replace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Documents that matched the filter.
    pub matched: u64,
    /// Documents whose contents actually changed.
    pub modified: u64,
}

/// Abstract interface for document stores.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. Whether concurrent calls are safe is
/// a property of the underlying store client and should be documented by the
/// implementer.
///
/// # Absence
///
/// Lookups that match nothing return `Ok(None)` from the backend. Turning that
/// into an error, where required, is the facade's job.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Returns the first document matching `filter`, in the store's natural order.
    async fn find_one(&self, ns: &Namespace, filter: Document) -> DocumentStoreResult<Option<Document>>;

    /// Returns every document matching the query, fully materialized.
    async fn find(&self, ns: &Namespace, query: Query) -> DocumentStoreResult<Vec<Document>>;

    /// Inserts one document and returns its `_id`.
    ///
    /// Documents without an `_id` get one assigned by the store.
    async fn insert_one(&self, ns: &Namespace, document: Document) -> DocumentStoreResult<Bson>;

    /// Inserts a batch in one call and returns the ids in input order.
    async fn insert_many(&self, ns: &Namespace, documents: Vec<Document>) -> DocumentStoreResult<Vec<Bson>>;

    /// Applies `update` to the first matching document.
    async fn update_one(&self, ns: &Namespace, filter: Document, update: Document) -> DocumentStoreResult<UpdateOutcome>;

    /// Applies `update` to every matching document.
    async fn update_many(&self, ns: &Namespace, filter: Document, update: Document) -> DocumentStoreResult<UpdateOutcome>;

    /// Replaces the contents of the first matching document, keeping its `_id`.
    async fn replace_one(&self, ns: &Namespace, filter: Document, replacement: Document) -> DocumentStoreResult<UpdateOutcome>;

    /// Deletes the first matching document and returns the deleted count.
    async fn delete_one(&self, ns: &Namespace, filter: Document) -> DocumentStoreResult<u64>;

    /// Deletes every matching document and returns the deleted count.
    async fn delete_many(&self, ns: &Namespace, filter: Document) -> DocumentStoreResult<u64>;

    /// Exact number of documents matching `filter`.
    async fn count_documents(&self, ns: &Namespace, filter: Document) -> DocumentStoreResult<u64>;

    /// The store's approximate total number of documents in the collection.
    async fn estimated_document_count(&self, ns: &Namespace) -> DocumentStoreResult<u64>;

    /// Distinct values of `field` among documents matching `filter`.
    async fn distinct(&self, ns: &Namespace, field: &str, filter: Document) -> DocumentStoreResult<Vec<Bson>>;

    /// Atomically removes one matching document and returns it.
    async fn find_one_and_delete(&self, ns: &Namespace, filter: Document) -> DocumentStoreResult<Option<Document>>;

    /// Atomically updates one matching document.
    async fn find_one_and_update(
        &self,
        ns: &Namespace,
        filter: Document,
        update: Document,
        return_document: ReturnDocument,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Atomically replaces one matching document.
    async fn find_one_and_replace(
        &self,
        ns: &Namespace,
        filter: Document,
        replacement: Document,
        return_document: ReturnDocument,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Runs an administrative command against `database`.
    async fn run_command(&self, database: &str, command: Document) -> DocumentStoreResult<Document>;

    /// Releases the connection and any other resources.
    ///
    /// The default implementation is a no-op; backends holding network
    /// connections should override it.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
