//! Convenient re-exports of commonly used types from simplemongo.
//!
//! ```ignore
//! use simplemongo::prelude::*;
//! ```

pub use simplemongo_core::{
    backend::{Namespace, StoreBackend, StoreBackendBuilder},
    collection::Collection,
    diagnostics::{Diagnostic, DiagnosticHook, JsonPrinter, TracingHook},
    document::{from_document, to_document},
    error::{DocumentStoreError, DocumentStoreResult, OptionalExt},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, Sort, SortDirection},
    store::{Database, DocumentStore},
    update::Update,
};
