//! A thin procedural facade over a MongoDB-style document store.
//!
//! This crate is the core of the simplemongo project and provides:
//!
//! - **Store backend abstraction** ([`backend`]) - The trait a concrete store implements
//! - **Client and database handles** ([`store`]) - Connection lifecycle and administrative commands
//! - **Collection handle** ([`collection`]) - One method per find/insert/update/delete/replace/count/distinct primitive
//! - **Filters and find options** ([`query`]) - Typed filter builder and sort/skip/limit options
//! - **Update specifications** ([`update`]) - Typed builder for field operators
//! - **Documents** ([`document`]) - Conversions between `serde` types, BSON documents and JSON text
//! - **Diagnostics** ([`diagnostics`]) - Optional hooks replacing console output
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use simplemongo::{prelude::*, bson::doc, memory::InMemoryStore};
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let users = store.database("app").collection("users");
//!
//! users.insert_one(doc! { "name": "Alice" }).await?;
//! assert!(users.find_one("name", "Alice").await?.is_some());
//! assert!(users.find_one("name", "Bob").await?.is_none());
//! ```

#[allow(unused_extern_crates)]
extern crate self as simplemongo_core;

pub mod backend;
pub mod collection;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod query;
pub mod store;
pub mod update;
