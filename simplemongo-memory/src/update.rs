//! Application of update operator documents.

use bson::{Bson, Document};
use std::cmp::Ordering;

use simplemongo_core::error::{DocumentStoreError, DocumentStoreResult};

use crate::{
    evaluator::{Comparable, same_value},
    path::{get_path, remove_path, set_path},
};

const OPERATORS: &[&str] = &[
    "$set", "$unset", "$inc", "$mul", "$min", "$max", "$rename", "$push", "$addToSet",
];

/// Checks that `update` is a nonempty document made only of known operators.
pub fn validate_update(update: &Document) -> DocumentStoreResult<()> {
    if update.is_empty() {
        return Err(DocumentStoreError::InvalidUpdate(
            "update document must not be empty".to_string(),
        ));
    }

    for (operator, operand) in update {
        if !operator.starts_with('$') {
            return Err(DocumentStoreError::InvalidUpdate(format!(
                "update document must contain only operators, found '{operator}'"
            )));
        }

        if !OPERATORS.contains(&operator.as_str()) {
            return Err(DocumentStoreError::InvalidUpdate(format!("unknown update operator: {operator}")));
        }

        if !matches!(operand, Bson::Document(_)) {
            return Err(DocumentStoreError::InvalidUpdate(format!("{operator} needs a document operand")));
        }
    }

    Ok(())
}

/// Applies a validated update to `document` in place.
///
/// The `_id` field may be set to its current value but never changed.
pub fn apply_update(document: &mut Document, update: &Document) -> DocumentStoreResult<()> {
    validate_update(update)?;
    let id = document.get("_id").cloned();

    for (operator, operand) in update {
        let Bson::Document(fields) = operand else {
            continue;
        };

        for (field, value) in fields {
            apply_operator(document, operator, field, value)?;
        }
    }

    if document.get("_id") != id.as_ref() {
        return Err(DocumentStoreError::InvalidUpdate(
            "the immutable field '_id' cannot be modified".to_string(),
        ));
    }

    Ok(())
}

fn apply_operator(document: &mut Document, operator: &str, field: &str, value: &Bson) -> DocumentStoreResult<()> {
    match operator {
        "$set" => set_path(document, field, value.clone()),
        "$unset" => {
            remove_path(document, field);
            Ok(())
        }
        "$inc" => {
            let next = match get_path(document, field) {
                Some(current) => arith(current, value, Arith::Add)?,
                None => arith(&Bson::Int32(0), value, Arith::Add)?,
            };
            set_path(document, field, next)
        }
        "$mul" => {
            let next = match get_path(document, field) {
                Some(current) => arith(current, value, Arith::Mul)?,
                None => arith(value, &Bson::Int32(0), Arith::Mul)?,
            };
            set_path(document, field, next)
        }
        "$min" | "$max" => {
            let wanted = if operator == "$min" { Ordering::Less } else { Ordering::Greater };
            let replace = match get_path(document, field) {
                Some(current) => Comparable::from(value).sort_cmp(&Comparable::from(current)) == wanted,
                None => true,
            };

            if replace {
                set_path(document, field, value.clone())?;
            }

            Ok(())
        }
        "$rename" => {
            let Bson::String(target) = value else {
                return Err(DocumentStoreError::InvalidUpdate(
                    "$rename target must be a string".to_string(),
                ));
            };

            if target == field {
                return Err(DocumentStoreError::InvalidUpdate(
                    "$rename source and target must differ".to_string(),
                ));
            }

            match remove_path(document, field) {
                Some(moved) => set_path(document, target, moved),
                None => Ok(()),
            }
        }
        "$push" | "$addToSet" => {
            let items = match value {
                Bson::Document(modifiers) if modifiers.contains_key("$each") => match modifiers.get("$each") {
                    Some(Bson::Array(items)) => items.clone(),
                    _ => {
                        return Err(DocumentStoreError::InvalidUpdate(
                            "$each needs an array".to_string(),
                        ));
                    }
                },
                single => vec![single.clone()],
            };

            let mut array = match get_path(document, field) {
                Some(Bson::Array(existing)) => existing.clone(),
                Some(_) => {
                    return Err(DocumentStoreError::InvalidUpdate(format!(
                        "{operator} needs '{field}' to be an array"
                    )));
                }
                None => Vec::new(),
            };

            for item in items {
                if operator == "$push" || !array.iter().any(|existing| same_value(existing, &item)) {
                    array.push(item);
                }
            }

            set_path(document, field, Bson::Array(array))
        }
        _ => Err(DocumentStoreError::InvalidUpdate(format!("unknown update operator: {operator}"))),
    }
}

#[derive(Debug, Clone, Copy)]
enum Arith {
    Add,
    Mul,
}

impl Arith {
    fn name(self) -> &'static str {
        match self {
            Arith::Add => "$inc",
            Arith::Mul => "$mul",
        }
    }

    fn ints(self, a: i64, b: i64) -> DocumentStoreResult<i64> {
        match self {
            Arith::Add => a.checked_add(b),
            Arith::Mul => a.checked_mul(b),
        }
        .ok_or_else(|| DocumentStoreError::InvalidUpdate(format!("{} overflowed a 64-bit integer", self.name())))
    }

    fn floats(self, a: f64, b: f64) -> f64 {
        match self {
            Arith::Add => a + b,
            Arith::Mul => a * b,
        }
    }
}

// Int32 results widen to Int64 on overflow; any double makes the result a double.
fn arith(current: &Bson, operand: &Bson, arith: Arith) -> DocumentStoreResult<Bson> {
    Ok(match (current, operand) {
        (Bson::Int32(a), Bson::Int32(b)) => {
            let wide = arith.ints(i64::from(*a), i64::from(*b))?;
            i32::try_from(wide).map_or(Bson::Int64(wide), Bson::Int32)
        }
        (Bson::Int32(_) | Bson::Int64(_), Bson::Int32(_) | Bson::Int64(_)) => {
            Bson::Int64(arith.ints(as_i64(current), as_i64(operand))?)
        }
        _ => match (as_f64(current), as_f64(operand)) {
            (Some(a), Some(b)) => Bson::Double(arith.floats(a, b)),
            _ => {
                return Err(DocumentStoreError::InvalidUpdate(format!(
                    "{} needs numeric values",
                    arith.name()
                )));
            }
        },
    })
}

fn as_i64(value: &Bson) -> i64 {
    match value {
        Bson::Int32(n) => i64::from(*n),
        Bson::Int64(n) => *n,
        _ => 0,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn updated(mut document: Document, update: Document) -> Document {
        apply_update(&mut document, &update).unwrap();
        document
    }

    #[test]
    fn set_and_unset() {
        assert_eq!(
            updated(doc! { "a": 1, "b": 2 }, doc! { "$set": { "a": 5, "c.d": true }, "$unset": { "b": "" } }),
            doc! { "a": 5, "c": { "d": true } }
        );
    }

    #[test]
    fn inc_creates_missing_fields_and_widens() {
        assert_eq!(updated(doc! {}, doc! { "$inc": { "n": 2 } }), doc! { "n": 2 });
        assert_eq!(
            updated(doc! { "n": i32::MAX }, doc! { "$inc": { "n": 1 } }),
            doc! { "n": i64::from(i32::MAX) + 1 }
        );
        assert_eq!(updated(doc! { "n": 1 }, doc! { "$inc": { "n": 0.5 } }), doc! { "n": 1.5 });
    }

    #[test]
    fn mul_on_missing_field_sets_zero() {
        assert_eq!(updated(doc! {}, doc! { "$mul": { "n": 3 } }), doc! { "n": 0 });
        assert_eq!(updated(doc! { "n": 4 }, doc! { "$mul": { "n": 3 } }), doc! { "n": 12 });
    }

    #[test]
    fn min_max_replace_only_when_better() {
        let document = doc! { "lo": 5, "hi": 5 };
        assert_eq!(
            updated(document.clone(), doc! { "$min": { "lo": 3, "hi": 7 } }),
            doc! { "lo": 3, "hi": 5 }
        );
        assert_eq!(
            updated(document, doc! { "$max": { "lo": 9, "hi": 1 } }),
            doc! { "lo": 9, "hi": 5 }
        );
    }

    #[test]
    fn rename_moves_values() {
        assert_eq!(
            updated(doc! { "old": 1, "other": 2 }, doc! { "$rename": { "old": "new" } }),
            doc! { "other": 2, "new": 1 }
        );
    }

    #[test]
    fn push_and_add_to_set() {
        assert_eq!(
            updated(doc! { "tags": ["a"] }, doc! { "$push": { "tags": "a" } }),
            doc! { "tags": ["a", "a"] }
        );
        assert_eq!(
            updated(doc! { "tags": ["a"] }, doc! { "$addToSet": { "tags": { "$each": ["a", "b"] } } }),
            doc! { "tags": ["a", "b"] }
        );
        assert_eq!(updated(doc! {}, doc! { "$push": { "tags": 1 } }), doc! { "tags": [1] });
    }

    #[test]
    fn add_to_set_treats_numeric_widths_as_duplicates() {
        assert_eq!(
            updated(doc! { "tags": [1] }, doc! { "$addToSet": { "tags": { "$each": [1.0, 1i64, 2] } } }),
            doc! { "tags": [1, 2] }
        );
    }

    #[test]
    fn rejects_malformed_updates() {
        let mut document = doc! { "_id": 1, "a": 1 };

        for update in [
            doc! {},
            doc! { "a": 2 },
            doc! { "$set": 3 },
            doc! { "$bogus": { "a": 1 } },
            doc! { "$inc": { "a": "x" } },
            doc! { "$set": { "_id": 2 } },
            doc! { "$push": { "a": 1 } },
        ] {
            assert!(
                matches!(apply_update(&mut document, &update), Err(DocumentStoreError::InvalidUpdate(_))),
                "{update} should be rejected"
            );
        }
    }

    #[test]
    fn setting_id_to_itself_is_allowed() {
        assert_eq!(updated(doc! { "_id": 1 }, doc! { "$set": { "_id": 1 } }), doc! { "_id": 1 });
    }
}
