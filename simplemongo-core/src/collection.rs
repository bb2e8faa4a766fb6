//! Collection handle exposing one method per store operation.
//!
//! Every method forwards its arguments to the backend, awaits the result and
//! returns it. Filters, update specifications and replacements are accepted as
//! anything convertible into a [`bson::Document`]: raw `doc!` literals,
//! [`Filter`](crate::query::Filter) expressions or [`Update`](crate::update::Update) builders.
//!
//! # Example
//!
//! ```ignore
//! use simplemongo::{prelude::*, bson::doc};
//!
//! let users = store.database("app").collection("users");
//!
//! users.insert_one(doc! { "name": "a", "count": 1 }).await?;
//! let modified = users.update_one(doc! { "name": "a" }, Update::new().inc("count", 1)).await?;
//! assert_eq!(modified, 1);
//!
//! let a = users.find_one("name", "a").await?.expect("inserted above");
//! assert_eq!(a.get_i32("count")?, 2);
//! ```

use bson::{Bson, Document, doc};
use tracing::{debug, warn};

use crate::{
    backend::{Namespace, ReturnDocument, StoreBackend},
    diagnostics::{Diagnostic, Mutation},
    error::{DocumentStoreError, DocumentStoreResult},
    query::Query,
    store::DocumentStore,
};

/// A handle to one collection, borrowed from a [`DocumentStore`].
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the client handle
/// * `B` - The storage backend type
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    namespace: Namespace,
    store: &'a DocumentStore<B>,
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(database: &str, collection: &str, store: &'a DocumentStore<B>) -> Self {
        Self {
            namespace: Namespace::new(database, collection),
            store,
        }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.namespace.collection
    }

    /// Returns the `(database, collection)` pair of this handle.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn backend(&self) -> &'a B {
        self.store.backend()
    }

    fn not_found(&self) -> DocumentStoreError {
        DocumentStoreError::DocumentNotFound(self.namespace.to_string())
    }

    /// Returns the first document where `field` equals `value`.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when nothing matches. This is not an error.
    pub async fn find_one(&self, field: &str, value: impl Into<Bson>) -> DocumentStoreResult<Option<Document>> {
        let value: Bson = value.into();
        self.find(doc! { field: value }).await
    }

    /// Returns the first document matching `filter`, or `Ok(None)` when nothing matches.
    pub async fn find(&self, filter: impl Into<Document>) -> DocumentStoreResult<Option<Document>> {
        let found = self
            .backend()
            .find_one(&self.namespace, filter.into())
            .await?;

        if found.is_none() {
            debug!(namespace = %self.namespace, "no document matched");
            self.store.report(Diagnostic::Missing { namespace: &self.namespace });
        }

        Ok(found)
    }

    /// Returns every document matching `filter`.
    pub async fn find_many(&self, filter: impl Into<Document>) -> DocumentStoreResult<Vec<Document>> {
        self.query(Query::new(filter)).await
    }

    /// Returns the documents selected by a [`Query`], honoring its sort, skip and limit.
    pub async fn query(&self, query: Query) -> DocumentStoreResult<Vec<Document>> {
        let documents = self
            .backend()
            .find(&self.namespace, query)
            .await?;

        debug!(namespace = %self.namespace, found = documents.len(), "find completed");
        self.store.report(Diagnostic::Found {
            namespace: &self.namespace,
            documents: &documents,
        });

        Ok(documents)
    }

    /// Returns the distinct values of `field` among documents matching `filter`.
    ///
    /// Duplicates are removed by the store; the order is the store's.
    pub async fn distinct(&self, field: &str, filter: impl Into<Document>) -> DocumentStoreResult<Vec<Bson>> {
        let values = self
            .backend()
            .distinct(&self.namespace, field, filter.into())
            .await?;

        debug!(namespace = %self.namespace, field, distinct = values.len(), "distinct completed");
        self.store.report(Diagnostic::Distinct {
            namespace: &self.namespace,
            field,
            values: &values,
        });

        Ok(values)
    }

    /// Returns the exact number of documents matching `filter`.
    ///
    /// With a diagnostics hook installed, the store's estimated collection size is
    /// fetched as well and reported next to the exact count. It is never returned,
    /// and a failure to fetch it only skips the report.
    pub async fn count(&self, filter: impl Into<Document>) -> DocumentStoreResult<u64> {
        let count = self
            .backend()
            .count_documents(&self.namespace, filter.into())
            .await?;

        debug!(namespace = %self.namespace, count, "count completed");

        if self.store.has_hook() {
            match self.estimated_count().await {
                Ok(estimated) => self.store.report(Diagnostic::Counted {
                    namespace: &self.namespace,
                    count,
                    estimated,
                }),
                Err(error) => warn!(namespace = %self.namespace, %error, "estimated count unavailable"),
            }
        }

        Ok(count)
    }

    /// Returns the store's approximate number of documents in the collection.
    pub async fn estimated_count(&self) -> DocumentStoreResult<u64> {
        self.backend()
            .estimated_document_count(&self.namespace)
            .await
    }

    /// Inserts one document and returns its `_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentAlreadyExists`] (memory backend) or a
    /// backend error if the `_id` is already taken.
    pub async fn insert_one(&self, document: impl Into<Document>) -> DocumentStoreResult<Bson> {
        let id = self
            .backend()
            .insert_one(&self.namespace, document.into())
            .await?;

        debug!(namespace = %self.namespace, ?id, "document inserted");

        Ok(id)
    }

    /// Inserts a batch of documents in one call and returns their ids in input order.
    ///
    /// Whether documents before a failing one stay inserted is up to the store.
    /// An empty batch is an error.
    pub async fn insert_many<D>(&self, documents: impl IntoIterator<Item = D>) -> DocumentStoreResult<Vec<Bson>>
    where
        D: Into<Document>,
    {
        let ids = self
            .backend()
            .insert_many(
                &self.namespace,
                documents
                    .into_iter()
                    .map(Into::into)
                    .collect(),
            )
            .await?;

        debug!(namespace = %self.namespace, inserted = ids.len(), "documents inserted");
        self.store.report(Diagnostic::Inserted {
            namespace: &self.namespace,
            ids: &ids,
        });

        Ok(ids)
    }

    /// Applies `update` to the first matching document and returns the modified count (0 or 1).
    ///
    /// A filter that matches nothing, or an update that changes nothing, yields 0.
    pub async fn update_one(
        &self,
        filter: impl Into<Document>,
        update: impl Into<Document>,
    ) -> DocumentStoreResult<u64> {
        let outcome = self
            .backend()
            .update_one(&self.namespace, filter.into(), update.into())
            .await?;

        debug!(namespace = %self.namespace, matched = outcome.matched, modified = outcome.modified, "update_one completed");

        Ok(outcome.modified)
    }

    /// Applies `update` to every matching document and returns the modified count.
    pub async fn update_many(
        &self,
        filter: impl Into<Document>,
        update: impl Into<Document>,
    ) -> DocumentStoreResult<u64> {
        let outcome = self
            .backend()
            .update_many(&self.namespace, filter.into(), update.into())
            .await?;

        debug!(namespace = %self.namespace, matched = outcome.matched, modified = outcome.modified, "update_many completed");

        Ok(outcome.modified)
    }

    /// Sets `field` to `value` on the first matching document, adding the field if missing.
    pub async fn set_field(
        &self,
        filter: impl Into<Document>,
        field: &str,
        value: impl Into<Bson>,
    ) -> DocumentStoreResult<()> {
        let value: Bson = value.into();
        self.update_one(filter, doc! { "$set": { field: value } })
            .await?;

        Ok(())
    }

    /// Replaces the contents of the first matching document and returns the modified count.
    ///
    /// The document keeps its `_id`.
    pub async fn replace_one(
        &self,
        filter: impl Into<Document>,
        replacement: impl Into<Document>,
    ) -> DocumentStoreResult<u64> {
        let outcome = self
            .backend()
            .replace_one(&self.namespace, filter.into(), replacement.into())
            .await?;

        debug!(namespace = %self.namespace, matched = outcome.matched, modified = outcome.modified, "replace_one completed");

        Ok(outcome.modified)
    }

    /// Deletes the first matching document and returns the deleted count (0 or 1).
    pub async fn delete_one(&self, filter: impl Into<Document>) -> DocumentStoreResult<u64> {
        let deleted = self
            .backend()
            .delete_one(&self.namespace, filter.into())
            .await?;

        debug!(namespace = %self.namespace, deleted, "delete_one completed");

        Ok(deleted)
    }

    /// Deletes every matching document and returns the deleted count.
    pub async fn delete_many(&self, filter: impl Into<Document>) -> DocumentStoreResult<u64> {
        let deleted = self
            .backend()
            .delete_many(&self.namespace, filter.into())
            .await?;

        debug!(namespace = %self.namespace, deleted, "delete_many completed");

        Ok(deleted)
    }

    /// Atomically removes one matching document and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentNotFound`] if nothing matches.
    pub async fn find_and_delete(&self, filter: impl Into<Document>) -> DocumentStoreResult<Document> {
        let deleted = self
            .backend()
            .find_one_and_delete(&self.namespace, filter.into())
            .await?
            .ok_or_else(|| self.not_found())?;

        self.store.report(Diagnostic::Mutated {
            namespace: &self.namespace,
            mutation: Mutation::Deleted,
            document: &deleted,
        });

        Ok(deleted)
    }

    /// Atomically updates one matching document and returns it as it is after the update.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentNotFound`] if nothing matches.
    pub async fn find_and_update(
        &self,
        filter: impl Into<Document>,
        update: impl Into<Document>,
    ) -> DocumentStoreResult<Document> {
        let updated = self
            .backend()
            .find_one_and_update(&self.namespace, filter.into(), update.into(), ReturnDocument::After)
            .await?
            .ok_or_else(|| self.not_found())?;

        self.store.report(Diagnostic::Mutated {
            namespace: &self.namespace,
            mutation: Mutation::Updated,
            document: &updated,
        });

        Ok(updated)
    }

    /// Atomically replaces one matching document and returns it as it was before.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentNotFound`] if nothing matches.
    pub async fn find_and_replace(
        &self,
        filter: impl Into<Document>,
        replacement: impl Into<Document>,
    ) -> DocumentStoreResult<Document> {
        let previous = self
            .backend()
            .find_one_and_replace(&self.namespace, filter.into(), replacement.into(), ReturnDocument::Before)
            .await?
            .ok_or_else(|| self.not_found())?;

        self.store.report(Diagnostic::Mutated {
            namespace: &self.namespace,
            mutation: Mutation::Replaced,
            document: &previous,
        });

        Ok(previous)
    }
}
