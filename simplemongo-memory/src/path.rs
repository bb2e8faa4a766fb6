//! Dotted field paths (`"address.city"`, `"tags.0"`) over BSON documents.

use bson::{Bson, Document};

use simplemongo_core::error::{DocumentStoreError, DocumentStoreResult};

/// Collects every value reachable through `path`.
///
/// Arrays of sub-documents fan out, so `"items.sku"` yields the `sku` of each
/// item. A numeric segment indexes into an array. An empty result means the
/// field is missing.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Vec<&'a Bson> {
    let segments = path.split('.').collect::<Vec<_>>();
    let mut found = Vec::new();

    if let Some((head, rest)) = segments.split_first() {
        if let Some(value) = document.get(*head) {
            collect(value, rest, &mut found);
        }
    }

    found
}

fn collect<'a>(value: &'a Bson, segments: &[&str], found: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = segments.split_first() else {
        found.push(value);
        return;
    };

    match value {
        Bson::Document(document) => {
            if let Some(child) = document.get(*head) {
                collect(child, rest, found);
            }
        }
        Bson::Array(items) => match head.parse::<usize>() {
            Ok(index) => {
                if let Some(item) = items.get(index) {
                    collect(item, rest, found);
                }
            }
            Err(_) => {
                for item in items.iter().filter(|item| matches!(item, Bson::Document(_))) {
                    collect(item, segments, found);
                }
            }
        },
        _ => {}
    }
}

/// Returns the single value at `path`, without fanning out over arrays.
pub(crate) fn get_path<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    match path.split_once('.') {
        None => document.get(path),
        Some((head, rest)) => get_in_value(document.get(head)?, rest),
    }
}

fn get_in_value<'a>(value: &'a Bson, path: &str) -> Option<&'a Bson> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };

    let child = match value {
        Bson::Document(document) => document.get(head)?,
        Bson::Array(items) => items.get(head.parse::<usize>().ok()?)?,
        _ => return None,
    };

    match rest {
        Some(rest) => get_in_value(child, rest),
        None => Some(child),
    }
}

/// Sets the value at `path`, creating intermediate documents as needed.
pub(crate) fn set_path(document: &mut Document, path: &str, value: Bson) -> DocumentStoreResult<()> {
    let Some((head, rest)) = path.split_once('.') else {
        document.insert(path, value);
        return Ok(());
    };

    if !document.contains_key(head) {
        document.insert(head, Document::new());
    }

    match document.get_mut(head) {
        Some(Bson::Document(child)) => set_path(child, rest, value),
        Some(Bson::Array(items)) => set_in_array(items, rest, value),
        _ => Err(DocumentStoreError::InvalidUpdate(format!(
            "cannot create field '{rest}' inside non-document value '{head}'"
        ))),
    }
}

fn set_in_array(items: &mut Vec<Bson>, path: &str, value: Bson) -> DocumentStoreResult<()> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let index = head
        .parse::<usize>()
        .map_err(|_| DocumentStoreError::InvalidUpdate(format!("cannot use '{head}' as an array index")))?;

    match rest {
        None => {
            if index >= items.len() {
                items.resize(index + 1, Bson::Null);
            }
            items[index] = value;
            Ok(())
        }
        Some(rest) => match items.get_mut(index) {
            Some(Bson::Document(child)) => set_path(child, rest, value),
            _ => Err(DocumentStoreError::InvalidUpdate(format!(
                "cannot create field '{rest}' at array index {index}"
            ))),
        },
    }
}

/// Removes and returns the value at `path`. Missing paths are not an error.
pub(crate) fn remove_path(document: &mut Document, path: &str) -> Option<Bson> {
    match path.split_once('.') {
        None => document.remove(path),
        Some((head, rest)) => match document.get_mut(head)? {
            Bson::Document(child) => remove_path(child, rest),
            _ => None,
        },
    }
}
