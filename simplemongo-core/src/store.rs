//! Client and database handles.
//!
//! A [`DocumentStore`] owns a backend connection. [`Database`] and
//! [`Collection`] are borrowed views on it, so neither can outlive the client
//! and nothing can be called after [`DocumentStore::close`].
//!
//! # Example
//!
//! ```ignore
//! use simplemongo::store::DocumentStore;
//!
//! let store = DocumentStore::new(backend);
//! let users = store.database("app").collection("users");
//! users.insert_one(doc! { "name": "Alice" }).await?;
//! store.close().await?;
//! ```

use bson::Document;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    backend::StoreBackend,
    collection::Collection,
    diagnostics::{Diagnostic, DiagnosticHook},
    error::DocumentStoreResult,
};

/// A client handle bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
    hook: Option<Arc<dyn DiagnosticHook>>,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a client handle over the given backend, with no diagnostics hook.
    pub fn new(backend: B) -> Self {
        Self { backend, hook: None }
    }

    /// Installs a hook that receives a [`Diagnostic`] event from every operation that reports one.
    pub fn with_hook(mut self, hook: Arc<dyn DiagnosticHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Returns a handle to the named database.
    pub fn database<'a>(&'a self, name: &str) -> Database<'a, B> {
        Database::new(name.to_string(), self)
    }

    /// Shortcut for `self.database(database).collection(collection)`.
    pub fn collection<'a>(&'a self, database: &str, collection: &str) -> Collection<'a, B> {
        Collection::new(database, collection, self)
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub(crate) fn has_hook(&self) -> bool {
        self.hook.is_some()
    }

    pub(crate) fn report(&self, event: Diagnostic<'_>) {
        if let Some(hook) = &self.hook {
            hook.observe(&event);
        }
    }

    /// Releases the connection.
    ///
    /// This consumes the handle. Dropping the handle without calling `close`
    /// still releases backend resources, but any shutdown error is lost.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to shut down cleanly.
    pub async fn close(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await?;
        info!("document store closed");

        Ok(())
    }
}

/// A handle to a named database on a [`DocumentStore`].
#[derive(Debug)]
pub struct Database<'a, B: StoreBackend> {
    name: String,
    store: &'a DocumentStore<B>,
}

impl<'a, B: StoreBackend> Database<'a, B> {
    pub(crate) fn new(name: String, store: &'a DocumentStore<B>) -> Self {
        Self { name, store }
    }

    /// Returns the name of this database.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a handle to the named collection in this database.
    pub fn collection(&self, name: &str) -> Collection<'a, B> {
        Collection::new(&self.name, name, self.store)
    }

    /// Runs an administrative command and returns its result document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Command`](crate::error::DocumentStoreError::Command)
    /// if the store rejects the command.
    pub async fn run_command(&self, command: impl Into<Document>) -> DocumentStoreResult<Document> {
        let command = command.into();
        let name = command.keys().next().cloned().unwrap_or_default();

        let result = self
            .store
            .backend
            .run_command(&self.name, command)
            .await?;

        debug!(database = %self.name, command = %name, "command executed");
        self.store.report(Diagnostic::CommandResult {
            database: &self.name,
            result: &result,
        });

        Ok(result)
    }
}
