//! Observability hooks for facade operations.
//!
//! Facade operations never write to stdout themselves. When a [`DiagnosticHook`]
//! is installed on a [`DocumentStore`](crate::store::DocumentStore), operations
//! report what they saw as [`Diagnostic`] events:
//!
//! - [`JsonPrinter`] renders events as pretty JSON text, one block per document
//! - [`TracingHook`] forwards events to `tracing` at debug level
//!
//! ```ignore
//! let store = DocumentStore::new(backend).with_hook(Arc::new(JsonPrinter::stdout()));
//! ```

use bson::{Bson, Document};
use std::{
    fmt::Debug,
    io::{self, Stdout, Write},
    sync::{Mutex, PoisonError},
};
use tracing::{debug, warn};

use crate::{backend::Namespace, document::render_json, error::DocumentStoreResult};

/// Which find-and-mutate operation produced a [`Diagnostic::Mutated`] event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// The removed document.
    Deleted,
    /// The document after the update.
    Updated,
    /// The document before it was replaced.
    Replaced,
}

/// An event reported by a facade operation.
#[derive(Debug, Clone, Copy)]
pub enum Diagnostic<'a> {
    /// A multi-document find returned these documents.
    Found {
        namespace: &'a Namespace,
        documents: &'a [Document],
    },
    /// A single-document find matched nothing.
    Missing { namespace: &'a Namespace },
    /// A batch insert stored documents under these ids.
    Inserted {
        namespace: &'a Namespace,
        ids: &'a [Bson],
    },
    /// An exact count next to the store's estimate of the collection size.
    Counted {
        namespace: &'a Namespace,
        count: u64,
        estimated: u64,
    },
    /// Distinct values of a field.
    Distinct {
        namespace: &'a Namespace,
        field: &'a str,
        values: &'a [Bson],
    },
    /// A find-and-mutate operation touched this document.
    Mutated {
        namespace: &'a Namespace,
        mutation: Mutation,
        document: &'a Document,
    },
    /// An administrative command returned this result.
    CommandResult {
        database: &'a str,
        result: &'a Document,
    },
}

/// Receives [`Diagnostic`] events. Implementations must not fail or block for long.
pub trait DiagnosticHook: Send + Sync + Debug {
    fn observe(&self, event: &Diagnostic<'_>);
}

/// Writes events as human-readable text, documents rendered as JSON with four-space indent.
#[derive(Debug)]
pub struct JsonPrinter<W: Write + Send = Stdout> {
    out: Mutex<W>,
}

impl JsonPrinter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    /// Consumes the printer and returns the writer.
    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn render(event: &Diagnostic<'_>) -> DocumentStoreResult<String> {
        let mut text = String::new();

        match event {
            Diagnostic::Found { documents, .. } => {
                for document in documents.iter() {
                    text.push_str(&render_json(document)?);
                    text.push('\n');
                }
            }
            Diagnostic::Missing { namespace } => {
                text.push_str(&format!("No document was found in {namespace}\n"));
            }
            Diagnostic::Inserted { ids, .. } => {
                text.push_str(&format!("{} documents inserted with IDs:\n", ids.len()));
                for id in ids.iter() {
                    text.push_str(&format!("\t{}\n", render_scalar(id)?));
                }
            }
            Diagnostic::Counted { count, estimated, .. } => {
                text.push_str(&format!("{count} of {estimated}\n"));
            }
            Diagnostic::Distinct { values, .. } => {
                for value in values.iter() {
                    text.push_str(&render_scalar(value)?);
                    text.push('\n');
                }
            }
            Diagnostic::Mutated { document, .. } => {
                text.push_str(&render_json(document)?);
                text.push('\n');
            }
            Diagnostic::CommandResult { result, .. } => {
                text.push_str(&render_json(result)?);
                text.push('\n');
            }
        }

        Ok(text)
    }
}

impl<W: Write + Send> DiagnosticHook for JsonPrinter<W>
where
    W: Debug,
{
    fn observe(&self, event: &Diagnostic<'_>) {
        let text = match Self::render(event) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "failed to render diagnostic event");
                return;
            }
        };

        // A writer that panicked mid-event leaves the lock poisoned; keep printing.
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);

        if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
            warn!(error = %e, "failed to write diagnostic event");
        }
    }
}

// Strings print bare, everything else as compact JSON.
fn render_scalar(value: &Bson) -> DocumentStoreResult<String> {
    match value {
        Bson::String(s) => Ok(s.clone()),
        other => Ok(serde_json::to_string(other)?),
    }
}

/// Forwards events to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHook;

impl DiagnosticHook for TracingHook {
    fn observe(&self, event: &Diagnostic<'_>) {
        match event {
            Diagnostic::Found { namespace, documents } => {
                debug!(%namespace, found = documents.len(), "documents found");
            }
            Diagnostic::Missing { namespace } => {
                debug!(%namespace, "no document found");
            }
            Diagnostic::Inserted { namespace, ids } => {
                debug!(%namespace, inserted = ids.len(), ?ids, "documents inserted");
            }
            Diagnostic::Counted { namespace, count, estimated } => {
                debug!(%namespace, count, estimated, "documents counted");
            }
            Diagnostic::Distinct { namespace, field, values } => {
                debug!(%namespace, field, distinct = values.len(), "distinct values");
            }
            Diagnostic::Mutated { namespace, mutation, document } => {
                debug!(%namespace, ?mutation, id = ?document.get("_id"), "document mutated");
            }
            Diagnostic::CommandResult { database, result } => {
                debug!(database, ok = ?result.get("ok"), "command completed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn printed(event: Diagnostic<'_>) -> String {
        let printer = JsonPrinter::new(Vec::new());
        printer.observe(&event);
        String::from_utf8(printer.into_inner()).unwrap()
    }

    #[test]
    fn count_prints_exact_of_estimated() {
        let ns = Namespace::new("app", "users");
        let text = printed(Diagnostic::Counted { namespace: &ns, count: 3, estimated: 5 });
        assert_eq!(text, "3 of 5\n");
    }

    #[test]
    fn inserted_ids_are_listed() {
        let ns = Namespace::new("app", "users");
        let ids = [Bson::Int32(1), Bson::String("two".into())];
        let text = printed(Diagnostic::Inserted { namespace: &ns, ids: &ids });
        assert_eq!(text, "2 documents inserted with IDs:\n\t1\n\ttwo\n");
    }

    #[test]
    fn found_documents_print_as_pretty_json() {
        let ns = Namespace::new("app", "users");
        let documents = [doc! { "name": "a" }, doc! { "name": "b" }];
        let text = printed(Diagnostic::Found { namespace: &ns, documents: &documents });
        assert_eq!(text, "{\n    \"name\": \"a\"\n}\n{\n    \"name\": \"b\"\n}\n");
    }

    #[test]
    fn missing_names_the_namespace() {
        let ns = Namespace::new("app", "users");
        assert_eq!(
            printed(Diagnostic::Missing { namespace: &ns }),
            "No document was found in app.users\n"
        );
    }

    #[derive(Debug, Default)]
    struct PanicsOnce {
        panicked: bool,
        written: Vec<u8>,
    }

    impl Write for PanicsOnce {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if !self.panicked {
                self.panicked = true;
                panic!("writer failed");
            }
            self.written.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn printing_continues_after_a_writer_panic() {
        let ns = Namespace::new("app", "users");
        let event = Diagnostic::Counted { namespace: &ns, count: 3, estimated: 5 };
        let printer = JsonPrinter::new(PanicsOnce::default());

        let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| printer.observe(&event)));
        assert!(first.is_err());

        printer.observe(&event);
        assert_eq!(printer.into_inner().written, b"3 of 5\n");
    }
}
