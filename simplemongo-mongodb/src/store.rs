use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, ReturnDocument as MongoReturnDocument, ServerApi, ServerApiVersion},
};
use tracing::{info, warn};

use simplemongo_core::{
    backend::{Namespace, ReturnDocument, StoreBackend, StoreBackendBuilder, UpdateOutcome},
    error::{DocumentStoreError, DocumentStoreResult},
    query::Query,
};

use crate::config::ClientConfig;

const DUPLICATE_KEY: i32 = 11000;

fn backend_error(e: MongoError) -> DocumentStoreError {
    warn!(error = %e, "mongodb operation failed");
    DocumentStoreError::Backend(e.to_string())
}

fn command_error(e: MongoError) -> DocumentStoreError {
    match e.kind.as_ref() {
        ErrorKind::Command(command) => {
            warn!(code = command.code, error = %command.message, "mongodb command rejected");
            DocumentStoreError::Command(command.message.clone())
        }
        _ => backend_error(e),
    }
}

fn is_duplicate_key(e: &MongoError) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

fn return_document(which: ReturnDocument) -> MongoReturnDocument {
    match which {
        ReturnDocument::Before => MongoReturnDocument::Before,
        ReturnDocument::After => MongoReturnDocument::After,
    }
}

/// MongoDB-backed [`StoreBackend`] wrapping the official driver's [`Client`].
///
/// Every trait method is a single driver call. The client pools connections
/// internally and is safe to share across tasks.
#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
}

impl MongoDbStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn builder(uri: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(uri)
    }

    /// Returns the underlying driver client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn get_collection(&self, namespace: &Namespace) -> MongoCollection<Document> {
        self.client
            .database(&namespace.database)
            .collection(&namespace.collection)
    }

    async fn connect(config: &ClientConfig) -> DocumentStoreResult<Self> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        if let Some(app_name) = &config.app_name {
            options.app_name = Some(app_name.clone());
        }
        if let Some(limit) = config.connect_timeout() {
            options.connect_timeout = Some(limit);
        }
        if config.server_api_v1 {
            options.server_api = Some(
                ServerApi::builder()
                    .version(ServerApiVersion::V1)
                    .build(),
            );
        }

        let client = Client::with_options(options)
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        if config.verify_connection {
            client
                .database("admin")
                .run_command(doc! { "ping": 1 })
                .await
                .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;
        }

        info!(app_name = ?config.app_name, server_api_v1 = config.server_api_v1, "connected to mongodb");

        Ok(Self::new(client))
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn find_one(&self, namespace: &Namespace, filter: Document) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(namespace)
            .find_one(filter)
            .await
            .map_err(backend_error)
    }

    async fn find(&self, namespace: &Namespace, query: Query) -> DocumentStoreResult<Vec<Document>> {
        let collection = self.get_collection(namespace);
        let mut find = collection.find(query.filter);

        if let Some(sort) = &query.sort {
            find = find.sort(sort.to_document());
        }
        if let Some(skip) = query.skip {
            find = find.skip(skip);
        }
        if let Some(limit) = query.limit {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        find.await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)
    }

    async fn insert_one(&self, namespace: &Namespace, document: Document) -> DocumentStoreResult<Bson> {
        let id = document.get("_id").cloned();

        let result = self
            .get_collection(namespace)
            .insert_one(document)
            .await
            .map_err(|e| match id {
                Some(id) if is_duplicate_key(&e) => {
                    DocumentStoreError::DocumentAlreadyExists(id.to_string(), namespace.to_string())
                }
                _ => backend_error(e),
            })?;

        Ok(result.inserted_id)
    }

    async fn insert_many(&self, namespace: &Namespace, documents: Vec<Document>) -> DocumentStoreResult<Vec<Bson>> {
        let result = self
            .get_collection(namespace)
            .insert_many(documents)
            .await
            .map_err(backend_error)?;

        // The driver keys ids by input position.
        let mut ids = result.inserted_ids.into_iter().collect::<Vec<_>>();
        ids.sort_by_key(|(index, _)| *index);

        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    async fn update_one(&self, namespace: &Namespace, filter: Document, update: Document) -> DocumentStoreResult<UpdateOutcome> {
        let result = self
            .get_collection(namespace)
            .update_one(filter, update)
            .await
            .map_err(backend_error)?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn update_many(&self, namespace: &Namespace, filter: Document, update: Document) -> DocumentStoreResult<UpdateOutcome> {
        let result = self
            .get_collection(namespace)
            .update_many(filter, update)
            .await
            .map_err(backend_error)?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn replace_one(&self, namespace: &Namespace, filter: Document, replacement: Document) -> DocumentStoreResult<UpdateOutcome> {
        let result = self
            .get_collection(namespace)
            .replace_one(filter, replacement)
            .await
            .map_err(backend_error)?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_one(&self, namespace: &Namespace, filter: Document) -> DocumentStoreResult<u64> {
        Ok(self
            .get_collection(namespace)
            .delete_one(filter)
            .await
            .map_err(backend_error)?
            .deleted_count)
    }

    async fn delete_many(&self, namespace: &Namespace, filter: Document) -> DocumentStoreResult<u64> {
        Ok(self
            .get_collection(namespace)
            .delete_many(filter)
            .await
            .map_err(backend_error)?
            .deleted_count)
    }

    async fn count_documents(&self, namespace: &Namespace, filter: Document) -> DocumentStoreResult<u64> {
        self.get_collection(namespace)
            .count_documents(filter)
            .await
            .map_err(backend_error)
    }

    async fn estimated_document_count(&self, namespace: &Namespace) -> DocumentStoreResult<u64> {
        self.get_collection(namespace)
            .estimated_document_count()
            .await
            .map_err(backend_error)
    }

    async fn distinct(&self, namespace: &Namespace, field: &str, filter: Document) -> DocumentStoreResult<Vec<Bson>> {
        self.get_collection(namespace)
            .distinct(field, filter)
            .await
            .map_err(backend_error)
    }

    async fn find_one_and_delete(&self, namespace: &Namespace, filter: Document) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(namespace)
            .find_one_and_delete(filter)
            .await
            .map_err(backend_error)
    }

    async fn find_one_and_update(
        &self,
        namespace: &Namespace,
        filter: Document,
        update: Document,
        which: ReturnDocument,
    ) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(namespace)
            .find_one_and_update(filter, update)
            .return_document(return_document(which))
            .await
            .map_err(backend_error)
    }

    async fn find_one_and_replace(
        &self,
        namespace: &Namespace,
        filter: Document,
        replacement: Document,
        which: ReturnDocument,
    ) -> DocumentStoreResult<Option<Document>> {
        self.get_collection(namespace)
            .find_one_and_replace(filter, replacement)
            .return_document(return_document(which))
            .await
            .map_err(backend_error)
    }

    async fn run_command(&self, database: &str, command: Document) -> DocumentStoreResult<Document> {
        self.client
            .database(database)
            .run_command(command)
            .await
            .map_err(command_error)
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;
        info!("mongodb client shut down");

        Ok(())
    }
}

/// Builder for [`MongoDbStore`].
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use simplemongo::{backend::StoreBackendBuilder, mongodb::MongoDbStore};
///
/// let backend = MongoDbStore::builder("mongodb://localhost:27017")
///     .app_name("reports")
///     .server_api_v1(true)
///     .connect_timeout(Duration::from_secs(10))
///     .build()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct MongoDbStoreBuilder {
    config: ClientConfig,
}

impl MongoDbStoreBuilder {
    pub fn new(uri: &str) -> Self {
        Self::from_config(ClientConfig::new(uri))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.config.app_name = Some(app_name.into());
        self
    }

    /// Bounds the whole connection attempt, including the verification ping.
    ///
    /// Sub-second parts are rounded up to the next whole second.
    pub fn connect_timeout(mut self, limit: std::time::Duration) -> Self {
        let secs = limit.as_secs() + u64::from(limit.subsec_nanos() > 0);
        self.config.connect_timeout_secs = Some(secs);
        self
    }

    pub fn server_api_v1(mut self, enabled: bool) -> Self {
        self.config.server_api_v1 = enabled;
        self
    }

    pub fn verify_connection(mut self, enabled: bool) -> Self {
        self.config.verify_connection = enabled;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Initialization`] for a malformed URI or an
    /// unreachable store, and [`DocumentStoreError::Timeout`] when the attempt
    /// exceeds the configured bound.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let config = self.config;

        match config.connect_timeout() {
            Some(limit) => tokio::time::timeout(limit, MongoDbStore::connect(&config))
                .await
                .map_err(|_| {
                    warn!(?limit, "mongodb connection attempt timed out");
                    DocumentStoreError::Timeout(limit)
                })?,
            None => MongoDbStore::connect(&config).await,
        }
    }
}
