//! Conversions between typed values, BSON documents and diagnostic JSON text.
//!
//! The facade itself only moves [`bson::Document`] values around. These helpers
//! let callers keep their own `serde` types at the edges.

use bson::{Bson, Document, deserialize_from_bson, serialize_to_bson};
use serde::{Deserialize, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Serializes a value into a BSON document.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidDocument`] if the value does not serialize
/// to a document (for example a bare integer or a sequence).
pub fn to_document<T: Serialize>(value: &T) -> DocumentStoreResult<Document> {
    match serialize_to_bson(value)? {
        Bson::Document(document) => Ok(document),
        other => Err(DocumentStoreError::InvalidDocument(format!(
            "expected a document, got {:?}",
            other.element_type()
        ))),
    }
}

/// Deserializes a BSON document into a typed value.
pub fn from_document<T>(document: Document) -> DocumentStoreResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    Ok(deserialize_from_bson(Bson::Document(document))?)
}

/// Renders any serializable value as JSON indented with four spaces.
///
/// ObjectIds and other BSON-specific types are rendered in their extended JSON form.
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> DocumentStoreResult<String> {
    let mut buffer = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;

    String::from_utf8(buffer).map_err(|e| DocumentStoreError::Serialization(e.to_string()))
}

/// Returns a copy of `document` without its `_id` field.
///
/// Handy when comparing a stored document to the one that was inserted, since the
/// store assigns the identifier.
pub fn without_id(document: &Document) -> Document {
    document
        .iter()
        .filter(|(key, _)| key.as_str() != "_id")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Pet {
        name: String,
        legs: i32,
    }

    #[test]
    fn typed_values_convert_through_documents() {
        let pet = Pet { name: "rex".into(), legs: 4 };
        let document = to_document(&pet).unwrap();
        assert_eq!(document, doc! { "name": "rex", "legs": 4 });
        assert_eq!(from_document::<Pet>(document).unwrap(), pet);
    }

    #[test]
    fn non_document_values_are_rejected() {
        assert!(matches!(
            to_document(&42),
            Err(DocumentStoreError::InvalidDocument(_))
        ));
    }

    #[test]
    fn render_json_uses_four_space_indent() {
        let text = render_json(&doc! { "name": "a" }).unwrap();
        assert_eq!(text, "{\n    \"name\": \"a\"\n}");
    }

    #[test]
    fn without_id_drops_only_the_identifier() {
        let stored = doc! { "_id": 1, "name": "a", "count": 2 };
        assert_eq!(without_id(&stored), doc! { "name": "a", "count": 2 });
    }
}
