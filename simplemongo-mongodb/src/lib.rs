//! MongoDB backend implementation for simplemongo.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Every operation is forwarded to the official driver as a single call; filters,
//! updates and commands are passed through unchanged.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! simplemongo = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! [`connect`] builds a client and verifies the store answers a `ping`.
//! [`connect_with_timeout`] additionally pins the Stable API to version 1 and
//! bounds the attempt to [`DEFAULT_CONNECT_TIMEOUT`]. For anything else use
//! [`MongoDbStoreBuilder`] or a [`ClientConfig`].
//!
//! # Example
//!
//! ```ignore
//! use simplemongo::{bson::doc, mongodb::connect_with_timeout};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = connect_with_timeout("mongodb://localhost:27017").await?;
//!     let users = store.collection("app", "users");
//!
//!     users.insert_one(doc! { "name": "Alice" }).await?;
//!
//!     store.close().await?;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as simplemongo_mongodb;

pub mod config;
pub mod store;

use std::time::Duration;

use simplemongo_core::{backend::StoreBackendBuilder, error::DocumentStoreResult, store::DocumentStore};

pub use config::ClientConfig;
pub use store::{MongoDbStore, MongoDbStoreBuilder};

/// Bound applied by [`connect_with_timeout`].
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connects to the store at `uri` and verifies it is reachable.
///
/// # Errors
///
/// Returns [`DocumentStoreError::Initialization`](simplemongo_core::error::DocumentStoreError::Initialization)
/// for a malformed URI or an unreachable store.
pub async fn connect(uri: &str) -> DocumentStoreResult<DocumentStore<MongoDbStore>> {
    let backend = MongoDbStore::builder(uri)
        .build()
        .await?;

    Ok(DocumentStore::new(backend))
}

/// Connects with the Stable API v1 option set, giving up after [`DEFAULT_CONNECT_TIMEOUT`].
///
/// # Errors
///
/// As [`connect`], plus [`DocumentStoreError::Timeout`](simplemongo_core::error::DocumentStoreError::Timeout)
/// when the attempt takes too long.
pub async fn connect_with_timeout(uri: &str) -> DocumentStoreResult<DocumentStore<MongoDbStore>> {
    let backend = MongoDbStore::builder(uri)
        .server_api_v1(true)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .build()
        .await?;

    Ok(DocumentStore::new(backend))
}

/// Connects using a [`ClientConfig`], typically read with [`ClientConfig::from_env`].
pub async fn connect_with_config(config: ClientConfig) -> DocumentStoreResult<DocumentStore<MongoDbStore>> {
    let backend = MongoDbStoreBuilder::from_config(config)
        .build()
        .await?;

    Ok(DocumentStore::new(backend))
}
