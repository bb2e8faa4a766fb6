//! In-memory storage implementation for document stores.
//!
//! This module provides a backend that keeps every database and collection in
//! nested HashMaps behind an async-safe read-write lock. Collections keep their
//! documents in insertion order.

use async_trait::async_trait;
use bson::{Bson, Document, doc, oid::ObjectId};
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, trace};

use simplemongo_core::{
    backend::{Namespace, ReturnDocument, StoreBackend, StoreBackendBuilder, UpdateOutcome},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Query, SortDirection},
};

use crate::{
    evaluator::{Comparable, DocumentEvaluator, same_value},
    filter::parse_filter,
    path::lookup,
    update::{apply_update, validate_update},
};

type CollectionData = Vec<Document>;
type DatabaseMap = HashMap<String, CollectionData>;
type StoreMap = HashMap<String, DatabaseMap>;

/// Thread-safe in-memory document storage backend.
///
/// This struct implements the [`StoreBackend`] trait to provide a fully functional
/// document store that operates entirely in memory. Filters and updates are
/// interpreted locally, so the same documents that drive a live server can be
/// used in tests against this backend.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data. Each operation holds the lock for its whole
/// duration, so find-and-modify operations are atomic.
///
/// # Performance
///
/// Queries scan all documents in a collection (no indexing).
///
/// # Example
///
/// ```ignore
/// use simplemongo_memory::InMemoryStore;
/// use simplemongo_core::{backend::{Namespace, StoreBackend}};
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let users = Namespace::new("app", "users");
///
/// let id = store.insert_one(&users, doc! { "name": "Alice" }).await?;
/// let found = store.find_one(&users, doc! { "_id": id }).await?;
/// assert!(found.is_some());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// database name -> collection name -> documents
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

fn collection<'s>(store: &'s StoreMap, namespace: &Namespace) -> Option<&'s CollectionData> {
    store
        .get(&namespace.database)?
        .get(&namespace.collection)
}

fn collection_mut<'s>(store: &'s mut StoreMap, namespace: &Namespace) -> Option<&'s mut CollectionData> {
    store
        .get_mut(&namespace.database)?
        .get_mut(&namespace.collection)
}

fn matches(document: &Document, expr: &Expr) -> DocumentStoreResult<bool> {
    DocumentEvaluator::new(document).evaluate(expr)
}

fn first_match(documents: &[Document], expr: &Expr) -> DocumentStoreResult<Option<usize>> {
    for (index, document) in documents.iter().enumerate() {
        if matches(document, expr)? {
            return Ok(Some(index));
        }
    }

    Ok(None)
}

fn all_matches(documents: &[Document], expr: &Expr) -> DocumentStoreResult<Vec<usize>> {
    let mut indices = Vec::new();

    for (index, document) in documents.iter().enumerate() {
        if matches(document, expr)? {
            indices.push(index);
        }
    }

    Ok(indices)
}

// Puts `_id` first, generating an ObjectId when the document has none.
fn prepare_insert(mut document: Document) -> (Bson, Document) {
    let id = document
        .remove("_id")
        .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));

    let mut prepared = doc! { "_id": id.clone() };
    prepared.extend(document);

    (id, prepared)
}

fn insert_into(documents: &mut CollectionData, namespace: &Namespace, document: Document) -> DocumentStoreResult<Bson> {
    let (id, document) = prepare_insert(document);

    if documents
        .iter()
        .any(|existing| existing.get("_id").is_some_and(|existing| same_value(existing, &id)))
    {
        return Err(DocumentStoreError::DocumentAlreadyExists(id.to_string(), namespace.to_string()));
    }

    documents.push(document);

    Ok(id)
}

fn validate_replacement(replacement: &Document) -> DocumentStoreResult<()> {
    match replacement.keys().find(|key| key.starts_with('$')) {
        Some(key) => Err(DocumentStoreError::InvalidDocument(format!(
            "replacement document must not contain update operators, found '{key}'"
        ))),
        None => Ok(()),
    }
}

// The replacement keeps the original `_id`; naming a different one is an error.
fn replaced(original: &Document, mut replacement: Document) -> DocumentStoreResult<Document> {
    validate_replacement(&replacement)?;
    let id = original.get("_id").cloned().unwrap_or(Bson::Null);

    if let Some(new_id) = replacement.remove("_id") {
        if !same_value(&new_id, &id) {
            return Err(DocumentStoreError::InvalidDocument(
                "the immutable field '_id' cannot be modified".to_string(),
            ));
        }
    }

    let mut document = doc! { "_id": id };
    document.extend(replacement);

    Ok(document)
}

fn ok() -> Document {
    doc! { "ok": 1.0 }
}

impl InMemoryStore {
    async fn update(
        &self,
        namespace: &Namespace,
        filter: Document,
        update: Document,
        multi: bool,
    ) -> DocumentStoreResult<UpdateOutcome> {
        let expr = parse_filter(&filter)?;
        validate_update(&update)?;

        let mut store = self.store.write().await;
        let Some(documents) = collection_mut(&mut store, namespace) else {
            return Ok(UpdateOutcome::default());
        };

        let targets = if multi {
            all_matches(documents, &expr)?
        } else {
            first_match(documents, &expr)?.into_iter().collect()
        };

        let mut outcome = UpdateOutcome::default();

        for index in targets {
            let mut document = documents[index].clone();
            apply_update(&mut document, &update)?;
            outcome.matched += 1;

            if document != documents[index] {
                documents[index] = document;
                outcome.modified += 1;
            }
        }

        Ok(outcome)
    }

    async fn delete(&self, namespace: &Namespace, filter: Document, multi: bool) -> DocumentStoreResult<u64> {
        let expr = parse_filter(&filter)?;

        let mut store = self.store.write().await;
        let Some(documents) = collection_mut(&mut store, namespace) else {
            return Ok(0);
        };

        let targets = if multi {
            all_matches(documents, &expr)?
        } else {
            first_match(documents, &expr)?.into_iter().collect()
        };

        // Remove from the back so earlier indices stay valid.
        for index in targets.iter().rev() {
            documents.remove(*index);
        }

        Ok(targets.len() as u64)
    }

    async fn count(&self, namespace: &Namespace, filter: &Document) -> DocumentStoreResult<u64> {
        let expr = parse_filter(filter)?;
        let store = self.store.read().await;

        match collection(&store, namespace) {
            Some(documents) => Ok(all_matches(documents, &expr)?.len() as u64),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn find_one(&self, namespace: &Namespace, filter: Document) -> DocumentStoreResult<Option<Document>> {
        let expr = parse_filter(&filter)?;
        let store = self.store.read().await;

        let Some(documents) = collection(&store, namespace) else {
            return Ok(None);
        };

        Ok(first_match(documents, &expr)?.map(|index| documents[index].clone()))
    }

    async fn find(&self, namespace: &Namespace, query: Query) -> DocumentStoreResult<Vec<Document>> {
        let expr = parse_filter(&query.filter)?;
        let store = self.store.read().await;

        let Some(documents) = collection(&store, namespace) else {
            return Ok(vec![]);
        };

        let mut found = all_matches(documents, &expr)?
            .into_iter()
            .map(|index| documents[index].clone())
            .collect::<Vec<_>>();

        if let Some(sort) = &query.sort {
            // Missing fields sort as null; arrays sort by their first element.
            let key = |document: &Document| -> Bson {
                lookup(document, &sort.field)
                    .first()
                    .map(|value| match value {
                        Bson::Array(items) => items.first().cloned().unwrap_or(Bson::Null),
                        other => (*other).clone(),
                    })
                    .unwrap_or(Bson::Null)
            };

            found.sort_by(|a, b| {
                let (left, right) = (key(a), key(b));
                let ordering = Comparable::from(&left).sort_cmp(&Comparable::from(&right));

                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        // A limit of zero means no limit.
        let skip = query.skip.unwrap_or(0) as usize;
        let limit = match query.limit {
            Some(0) | None => usize::MAX,
            Some(limit) => limit as usize,
        };

        trace!(namespace = %namespace, matched = found.len(), skip, "memory find");

        Ok(found.into_iter().skip(skip).take(limit).collect())
    }

    async fn insert_one(&self, namespace: &Namespace, document: Document) -> DocumentStoreResult<Bson> {
        let mut store = self.store.write().await;
        let documents = store
            .entry(namespace.database.clone())
            .or_default()
            .entry(namespace.collection.clone())
            .or_default();

        insert_into(documents, namespace, document)
    }

    /// Inserts in order and stops at the first failure; earlier documents stay inserted.
    /// An empty batch is rejected, as the store does.
    async fn insert_many(&self, namespace: &Namespace, documents: Vec<Document>) -> DocumentStoreResult<Vec<Bson>> {
        if documents.is_empty() {
            return Err(DocumentStoreError::InvalidDocument(
                "insert_many needs at least one document".to_string(),
            ));
        }

        let mut store = self.store.write().await;
        let target = store
            .entry(namespace.database.clone())
            .or_default()
            .entry(namespace.collection.clone())
            .or_default();

        let mut ids = Vec::with_capacity(documents.len());

        for document in documents {
            ids.push(insert_into(target, namespace, document)?);
        }

        Ok(ids)
    }

    async fn update_one(&self, namespace: &Namespace, filter: Document, update: Document) -> DocumentStoreResult<UpdateOutcome> {
        self.update(namespace, filter, update, false).await
    }

    async fn update_many(&self, namespace: &Namespace, filter: Document, update: Document) -> DocumentStoreResult<UpdateOutcome> {
        self.update(namespace, filter, update, true).await
    }

    async fn replace_one(&self, namespace: &Namespace, filter: Document, replacement: Document) -> DocumentStoreResult<UpdateOutcome> {
        let expr = parse_filter(&filter)?;
        validate_replacement(&replacement)?;

        let mut store = self.store.write().await;
        let Some(documents) = collection_mut(&mut store, namespace) else {
            return Ok(UpdateOutcome::default());
        };

        let Some(index) = first_match(documents, &expr)? else {
            return Ok(UpdateOutcome::default());
        };

        let document = replaced(&documents[index], replacement)?;
        let modified = u64::from(document != documents[index]);
        documents[index] = document;

        Ok(UpdateOutcome { matched: 1, modified })
    }

    async fn delete_one(&self, namespace: &Namespace, filter: Document) -> DocumentStoreResult<u64> {
        self.delete(namespace, filter, false).await
    }

    async fn delete_many(&self, namespace: &Namespace, filter: Document) -> DocumentStoreResult<u64> {
        self.delete(namespace, filter, true).await
    }

    async fn count_documents(&self, namespace: &Namespace, filter: Document) -> DocumentStoreResult<u64> {
        self.count(namespace, &filter).await
    }

    async fn estimated_document_count(&self, namespace: &Namespace) -> DocumentStoreResult<u64> {
        let store = self.store.read().await;

        Ok(collection(&store, namespace).map_or(0, |documents| documents.len() as u64))
    }

    /// Values come back in order of first appearance. Array values contribute each element.
    async fn distinct(&self, namespace: &Namespace, field: &str, filter: Document) -> DocumentStoreResult<Vec<Bson>> {
        let expr = parse_filter(&filter)?;
        let store = self.store.read().await;

        let Some(documents) = collection(&store, namespace) else {
            return Ok(vec![]);
        };

        let mut values: Vec<Bson> = Vec::new();

        for index in all_matches(documents, &expr)? {
            for value in lookup(&documents[index], field) {
                let items = match value {
                    Bson::Array(items) => items.iter().collect::<Vec<_>>(),
                    other => vec![other],
                };

                for item in items {
                    if !values.iter().any(|value| same_value(value, item)) {
                        values.push(item.clone());
                    }
                }
            }
        }

        Ok(values)
    }

    async fn find_one_and_delete(&self, namespace: &Namespace, filter: Document) -> DocumentStoreResult<Option<Document>> {
        let expr = parse_filter(&filter)?;

        let mut store = self.store.write().await;
        let Some(documents) = collection_mut(&mut store, namespace) else {
            return Ok(None);
        };

        Ok(first_match(documents, &expr)?.map(|index| documents.remove(index)))
    }

    async fn find_one_and_update(
        &self,
        namespace: &Namespace,
        filter: Document,
        update: Document,
        return_document: ReturnDocument,
    ) -> DocumentStoreResult<Option<Document>> {
        let expr = parse_filter(&filter)?;
        validate_update(&update)?;

        let mut store = self.store.write().await;
        let Some(documents) = collection_mut(&mut store, namespace) else {
            return Ok(None);
        };

        let Some(index) = first_match(documents, &expr)? else {
            return Ok(None);
        };

        let mut document = documents[index].clone();
        apply_update(&mut document, &update)?;
        let previous = std::mem::replace(&mut documents[index], document);

        Ok(Some(match return_document {
            ReturnDocument::Before => previous,
            ReturnDocument::After => documents[index].clone(),
        }))
    }

    async fn find_one_and_replace(
        &self,
        namespace: &Namespace,
        filter: Document,
        replacement: Document,
        return_document: ReturnDocument,
    ) -> DocumentStoreResult<Option<Document>> {
        let expr = parse_filter(&filter)?;
        validate_replacement(&replacement)?;

        let mut store = self.store.write().await;
        let Some(documents) = collection_mut(&mut store, namespace) else {
            return Ok(None);
        };

        let Some(index) = first_match(documents, &expr)? else {
            return Ok(None);
        };

        let document = replaced(&documents[index], replacement)?;
        let previous = std::mem::replace(&mut documents[index], document);

        Ok(Some(match return_document {
            ReturnDocument::Before => previous,
            ReturnDocument::After => documents[index].clone(),
        }))
    }

    /// Understands `ping`, `buildInfo`, `count`, `drop` and `listCollections`.
    async fn run_command(&self, database: &str, command: Document) -> DocumentStoreResult<Document> {
        let Some((name, argument)) = command.iter().next() else {
            return Err(DocumentStoreError::Command("empty command document".to_string()));
        };

        debug!(database, command = %name, "memory command");

        match name.as_str() {
            "ping" => Ok(ok()),
            "buildInfo" | "buildinfo" => Ok(doc! {
                "version": env!("CARGO_PKG_VERSION"),
                "storageEngines": ["memory"],
                "ok": 1.0,
            }),
            "count" => {
                let Bson::String(collection) = argument else {
                    return Err(DocumentStoreError::Command("count needs a collection name".to_string()));
                };

                let filter = match command.get("query") {
                    Some(Bson::Document(query)) => query.clone(),
                    Some(_) => return Err(DocumentStoreError::Command("count query must be a document".to_string())),
                    None => Document::new(),
                };
                let n = self
                    .count(&Namespace::new(database, collection), &filter)
                    .await?;
                let n = i64::try_from(n).unwrap_or(i64::MAX);

                Ok(doc! { "n": n, "ok": 1.0 })
            }
            "drop" => {
                let Bson::String(collection) = argument else {
                    return Err(DocumentStoreError::Command("drop needs a collection name".to_string()));
                };

                let mut store = self.store.write().await;
                let dropped = store
                    .get_mut(database)
                    .and_then(|collections| collections.remove(collection));

                match dropped {
                    Some(_) => Ok(doc! { "ns": format!("{database}.{collection}"), "ok": 1.0 }),
                    None => Err(DocumentStoreError::Command("ns not found".to_string())),
                }
            }
            "listCollections" => {
                let store = self.store.read().await;
                let mut names = store
                    .get(database)
                    .map(|collections| collections.keys().cloned().collect::<Vec<_>>())
                    .unwrap_or_default();
                names.sort();

                let batch = names
                    .into_iter()
                    .map(|name| Bson::Document(doc! { "name": name, "type": "collection" }))
                    .collect::<Vec<_>>();

                Ok(doc! {
                    "cursor": {
                        "id": 0i64,
                        "ns": format!("{database}.$cmd.listCollections"),
                        "firstBatch": batch,
                    },
                    "ok": 1.0,
                })
            }
            other => Err(DocumentStoreError::Command(format!("no such command: '{other}'"))),
        }
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use simplemongo_memory::InMemoryStore;
/// use simplemongo_core::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder().build().await?;
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simplemongo_core::query::Sort;

    fn users() -> Namespace {
        Namespace::new("app", "users")
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_many(
                &users(),
                vec![
                    doc! { "_id": 1, "name": "a", "age": 30, "tags": ["x"] },
                    doc! { "_id": 2, "name": "b", "age": 20, "tags": ["x", "y"] },
                    doc! { "_id": 3, "name": "c", "age": 40 },
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn insert_generates_object_ids_first_in_document() {
        let store = InMemoryStore::new();
        let id = store.insert_one(&users(), doc! { "name": "a" }).await.unwrap();

        assert!(matches!(id, Bson::ObjectId(_)));
        let stored = store.find_one(&users(), doc! {}).await.unwrap().unwrap();
        assert_eq!(stored.keys().next().map(String::as_str), Some("_id"));
        assert_eq!(stored.get("_id"), Some(&id));
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let store = seeded().await;
        let error = store
            .insert_one(&users(), doc! { "_id": 1, "name": "again" })
            .await
            .unwrap_err();

        assert!(matches!(error, DocumentStoreError::DocumentAlreadyExists(_, ref ns) if ns == "app.users"));
    }

    #[tokio::test]
    async fn duplicate_ids_compare_across_numeric_widths() {
        let store = seeded().await;

        for id in [Bson::Int64(1), Bson::Double(1.0)] {
            let error = store
                .insert_one(&users(), doc! { "_id": id, "name": "again" })
                .await
                .unwrap_err();
            assert!(matches!(error, DocumentStoreError::DocumentAlreadyExists(..)));
        }

        assert_eq!(store.count_documents(&users(), doc! { "_id": 1 }).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn replace_accepts_the_same_id_in_another_width() {
        let store = seeded().await;
        let outcome = store
            .replace_one(&users(), doc! { "_id": 1 }, doc! { "_id": 1i64, "name": "z" })
            .await
            .unwrap();

        assert_eq!(outcome.modified, 1);
        assert_eq!(
            store.find_one(&users(), doc! { "_id": 1 }).await.unwrap(),
            Some(doc! { "_id": 1, "name": "z" })
        );
    }

    #[tokio::test]
    async fn insert_many_rejects_an_empty_batch() {
        let store = InMemoryStore::new();

        assert!(matches!(
            store.insert_many(&users(), Vec::new()).await,
            Err(DocumentStoreError::InvalidDocument(_))
        ));
    }

    #[tokio::test]
    async fn insert_many_keeps_documents_before_a_failure() {
        let store = seeded().await;
        let result = store
            .insert_many(&users(), vec![doc! { "_id": 4 }, doc! { "_id": 1 }, doc! { "_id": 5 }])
            .await;

        assert!(result.is_err());
        assert_eq!(store.estimated_document_count(&users()).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn find_sorts_skips_and_limits() {
        let store = seeded().await;
        let query = Query {
            filter: doc! {},
            sort: Some(Sort { field: "age".into(), direction: SortDirection::Desc }),
            skip: Some(1),
            limit: Some(1),
        };

        let found = store.find(&users(), query).await.unwrap();
        assert_eq!(found, vec![doc! { "_id": 1, "name": "a", "age": 30, "tags": ["x"] }]);
    }

    #[tokio::test]
    async fn update_counts_only_real_modifications() {
        let store = seeded().await;

        let outcome = store
            .update_many(&users(), doc! { "tags": "x" }, doc! { "$set": { "age": 20 } })
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 2, modified: 1 });

        let outcome = store
            .update_one(&users(), doc! { "name": "zzz" }, doc! { "$set": { "age": 1 } })
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::default());
    }

    #[tokio::test]
    async fn update_rejects_plain_documents() {
        let store = seeded().await;
        let error = store
            .update_one(&users(), doc! { "_id": 1 }, doc! { "age": 5 })
            .await
            .unwrap_err();

        assert!(matches!(error, DocumentStoreError::InvalidUpdate(_)));
    }

    #[tokio::test]
    async fn replace_keeps_id() {
        let store = seeded().await;
        let outcome = store
            .replace_one(&users(), doc! { "name": "a" }, doc! { "name": "z" })
            .await
            .unwrap();

        assert_eq!(outcome.modified, 1);
        assert_eq!(
            store.find_one(&users(), doc! { "_id": 1 }).await.unwrap(),
            Some(doc! { "_id": 1, "name": "z" })
        );
    }

    #[tokio::test]
    async fn deletes_report_counts() {
        let store = seeded().await;

        assert_eq!(store.delete_one(&users(), doc! { "tags": "x" }).await.unwrap(), 1);
        assert_eq!(store.delete_many(&users(), doc! {}).await.unwrap(), 2);
        assert_eq!(store.delete_many(&users(), doc! {}).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn distinct_flattens_arrays() {
        let store = seeded().await;
        let tags = store.distinct(&users(), "tags", doc! {}).await.unwrap();

        assert_eq!(tags, vec![Bson::from("x"), Bson::from("y")]);
    }

    #[tokio::test]
    async fn distinct_merges_numeric_widths() {
        let store = InMemoryStore::new();
        store
            .insert_many(&users(), vec![doc! { "n": 1 }, doc! { "n": 1i64 }, doc! { "n": 1.0 }, doc! { "n": 2 }])
            .await
            .unwrap();

        let values = store.distinct(&users(), "n", doc! {}).await.unwrap();
        assert_eq!(values, vec![Bson::Int32(1), Bson::Int32(2)]);
    }

    #[tokio::test]
    async fn add_to_set_of_an_equal_number_is_not_a_modification() {
        let store = InMemoryStore::new();
        store.insert_one(&users(), doc! { "_id": 1, "tags": [1] }).await.unwrap();

        let outcome = store
            .update_one(&users(), doc! { "_id": 1 }, doc! { "$addToSet": { "tags": 1.0 } })
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 0 });
    }

    #[tokio::test]
    async fn find_and_update_returns_requested_version() {
        let store = seeded().await;

        let before = store
            .find_one_and_update(&users(), doc! { "_id": 2 }, doc! { "$inc": { "age": 1 } }, ReturnDocument::Before)
            .await
            .unwrap()
            .unwrap();
        let after = store
            .find_one_and_update(&users(), doc! { "_id": 2 }, doc! { "$inc": { "age": 1 } }, ReturnDocument::After)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(before.get_i32("age").unwrap(), 20);
        assert_eq!(after.get_i32("age").unwrap(), 22);
    }

    #[tokio::test]
    async fn commands() {
        let store = seeded().await;

        assert_eq!(store.run_command("app", doc! { "ping": 1 }).await.unwrap(), doc! { "ok": 1.0 });

        let count = store
            .run_command("app", doc! { "count": "users", "query": { "age": { "$gt": 25 } } })
            .await
            .unwrap();
        assert_eq!(count.get_i64("n").unwrap(), 2);

        let listed = store.run_command("app", doc! { "listCollections": 1 }).await.unwrap();
        let batch = listed.get_document("cursor").unwrap().get_array("firstBatch").unwrap();
        assert_eq!(batch.len(), 1);

        store.run_command("app", doc! { "drop": "users" }).await.unwrap();
        assert!(matches!(
            store.run_command("app", doc! { "drop": "users" }).await,
            Err(DocumentStoreError::Command(_))
        ));
        assert!(matches!(
            store.run_command("app", doc! { "frobnicate": 1 }).await,
            Err(DocumentStoreError::Command(_))
        ));
    }

    #[tokio::test]
    async fn databases_are_isolated() {
        let store = seeded().await;
        let other = Namespace::new("other", "users");

        assert_eq!(store.count_documents(&other, doc! {}).await.unwrap(), 0);
        assert_eq!(store.count_documents(&users(), doc! {}).await.unwrap(), 3);
    }
}
