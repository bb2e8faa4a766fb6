//! In-memory document storage backend for simplemongo.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It interprets filter and update documents itself, which makes it a drop-in
//! stand-in for a live server in tests and examples.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Filters** - Implicit equality, comparison, `$in`/`$nin`, `$exists`, `$not`, `$and`/`$or`/`$nor`, dotted paths
//! - **Updates** - `$set`, `$unset`, `$inc`, `$mul`, `$min`, `$max`, `$rename`, `$push`, `$addToSet`
//! - **Commands** - `ping`, `buildInfo`, `count`, `drop`, `listCollections`
//!
//! # Quick Start
//!
//! ```ignore
//! use simplemongo::{prelude::*, bson::doc, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let users = store.collection("app", "users");
//!
//!     users.insert_one(doc! { "name": "Alice" }).await?;
//!     assert_eq!(users.count(doc! {}).await?, 1);
//!
//!     store.close().await?;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as simplemongo_memory;

pub mod filter;
pub mod store;
pub mod update;

mod evaluator;
mod path;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
