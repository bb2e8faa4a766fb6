//! Main simplemongo crate: a thin procedural facade over a MongoDB-style document store.
//!
//! This crate is the primary entry point. It re-exports the core handles and
//! builders and gives access to the storage backends.
//!
//! # Features
//!
//! - **One call per primitive** - find, insert, update, delete, replace, distinct, count and run-command
//! - **Errors as values** - Every operation returns a [`DocumentStoreResult`](error::DocumentStoreResult); expected absence is never fatal
//! - **Opaque filters** - Filters and updates are plain BSON documents, with optional typed builders
//! - **Pluggable output** - Diagnostic printing goes through an optional [`DiagnosticHook`](diagnostics::DiagnosticHook)
//!
//! # Quick Start
//!
//! ```ignore
//! use simplemongo::{prelude::*, bson::doc, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let users = store.database("app").collection("users");
//!
//!     users.insert_one(doc! { "name": "a", "count": 1 }).await?;
//!     users.update_one(doc! { "name": "a" }, Update::new().inc("count", 1)).await?;
//!
//!     let a = users.find_one("name", "a").await?;
//!     println!("{:?}", a);
//!
//!     // Find-and-mutate reports a missing match as a recoverable error.
//!     let gone = users.find_and_delete(doc! { "name": "b" }).await.optional()?;
//!     assert!(gone.is_none());
//!
//!     store.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Diagnostics
//!
//! Install [`JsonPrinter`](diagnostics::JsonPrinter) to print found documents,
//! inserted ids, counts and command results as pretty JSON on stdout:
//!
//! ```ignore
//! use std::sync::Arc;
//! use simplemongo::{prelude::*, diagnostics::JsonPrinter, memory::InMemoryStore};
//!
//! let store = DocumentStore::new(InMemoryStore::new()).with_hook(Arc::new(JsonPrinter::stdout()));
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB over the official driver (requires `mongodb` feature)

pub mod prelude;

pub use simplemongo_core::{backend, collection, diagnostics, document, error, query, store, update};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use simplemongo_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend and connection entry points.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use simplemongo_mongodb::{
        ClientConfig, DEFAULT_CONNECT_TIMEOUT, MongoDbStore, MongoDbStoreBuilder, connect, connect_with_config,
        connect_with_timeout,
    };
}
