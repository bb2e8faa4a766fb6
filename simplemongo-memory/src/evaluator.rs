//! Query expression evaluation for in-memory document filtering.
//!
//! Matching follows the store's rules for the operators the memory backend
//! supports:
//!
//! - an array field matches a scalar comparison when any element does
//! - `{ field: null }` matches documents where the field is null or missing
//! - `$ne` and `$nin` match documents where the field is missing
//! - ordering comparisons only match values of the same type bracket

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};
use std::cmp::Ordering;

use simplemongo_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, QueryVisitor},
};

use crate::path::lookup;

/// Comparable representation of BSON values.
///
/// Integers stay exact as `i64` and only meet doubles through `cmp_int_double`,
/// so `1`, `1i64` and `1.0` compare equal without large integers colliding.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(ObjectId),
    Array(Vec<Comparable<'a>>),
    /// Embedded document; field order is significant.
    Map(Vec<(&'a str, Comparable<'a>)>),
    /// Any other BSON type, compared structurally.
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Int(i64::from(*value)),
            Bson::Int64(value) => Comparable::Int(*value),
            Bson::Double(value) => Comparable::Double(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            other => Comparable::Other(other),
        }
    }
}

impl Comparable<'_> {
    // Position in the store's cross-type sort order.
    fn type_rank(&self) -> u8 {
        match self {
            Comparable::Null => 1,
            Comparable::Int(_) | Comparable::Double(_) => 2,
            Comparable::String(_) => 3,
            Comparable::Map(_) => 4,
            Comparable::Array(_) => 5,
            Comparable::Other(_) => 6,
            Comparable::ObjectId(_) => 7,
            Comparable::Bool(_) => 8,
            Comparable::DateTime(_) => 9,
        }
    }

    /// Total order used for sorting, ranking types first and values second.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.type_rank()
            .cmp(&other.type_rank())
            .then_with(|| match (self, other) {
                (Comparable::Array(a), Comparable::Array(b)) => cmp_sequence(a.iter(), b.iter()),
                (Comparable::Map(a), Comparable::Map(b)) => cmp_sequence(
                    a.iter().map(|(_, v)| v),
                    b.iter().map(|(_, v)| v),
                ),
                _ => self.partial_cmp(other).unwrap_or(Ordering::Equal),
            })
    }
}

/// Returns true when two values are equal under the store's comparison rules.
pub(crate) fn same_value(left: &Bson, right: &Bson) -> bool {
    Comparable::from(left) == Comparable::from(right)
}

// Exact comparison of an integer against a double, `None` when the double is NaN.
fn cmp_int_double(int: i64, double: f64) -> Option<Ordering> {
    // 2^63 is exactly representable; every i64 is below it and at or above its negation.
    const BOUND: f64 = 9_223_372_036_854_775_808.0;

    if double.is_nan() {
        return None;
    }
    if double >= BOUND {
        return Some(Ordering::Less);
    }
    if double < -BOUND {
        return Some(Ordering::Greater);
    }

    let whole = double.trunc();
    let fraction = double - whole;

    Some(int.cmp(&(whole as i64)).then_with(|| {
        if fraction > 0.0 {
            Ordering::Less
        } else if fraction < 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }))
}

fn cmp_sequence<'c, 'a: 'c>(
    mut left: impl Iterator<Item = &'c Comparable<'a>>,
    mut right: impl Iterator<Item = &'c Comparable<'a>>,
) -> Ordering {
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a), Some(b)) => match a.sort_cmp(b) {
                Ordering::Equal => continue,
                ordering => return ordering,
            },
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Int(a), Comparable::Int(b)) => a == b,
            (Comparable::Double(a), Comparable::Double(b)) => a == b,
            (Comparable::Int(a), Comparable::Double(b)) | (Comparable::Double(b), Comparable::Int(a)) => {
                cmp_int_double(*a, *b) == Some(Ordering::Equal)
            }
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Int(b)) => Some(a.cmp(b)),
            (Comparable::Double(a), Comparable::Double(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Double(b)) => cmp_int_double(*a, *b),
            (Comparable::Double(a), Comparable::Int(b)) => cmp_int_double(*b, *a).map(Ordering::reverse),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Evaluates a filter expression against a single document.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    // True when any candidate value, or any element of an array candidate, equals `value`.
    fn any_equal(candidates: &[&Bson], value: &Bson) -> bool {
        let wanted = Comparable::from(value);

        if candidates.is_empty() {
            return wanted == Comparable::Null;
        }

        candidates.iter().any(|candidate| {
            let candidate = Comparable::from(*candidate);
            candidate == wanted
                || matches!(&candidate, Comparable::Array(items) if items.iter().any(|item| *item == wanted))
        })
    }

    fn any_ordered(candidates: &[&Bson], value: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
        let bound = Comparable::from(value);
        let satisfies = |candidate: &Comparable<'_>| candidate.partial_cmp(&bound).is_some_and(&accept);

        candidates.iter().any(|candidate| match Comparable::from(*candidate) {
            Comparable::Array(items) => items.iter().any(&satisfies),
            scalar => satisfies(&scalar),
        })
    }

    fn any_of(candidates: &[&Bson], values: &Bson) -> DocumentStoreResult<bool> {
        match values {
            Bson::Array(values) => Ok(values
                .iter()
                .any(|value| Self::any_equal(candidates, value))),
            _ => Err(DocumentStoreError::InvalidFilter(
                "$in and $nin need an array".to_string(),
            )),
        }
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(!lookup(self.document, field).is_empty() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let candidates = lookup(self.document, field);

        Ok(match op {
            FieldOp::Eq => Self::any_equal(&candidates, value),
            FieldOp::Ne => !Self::any_equal(&candidates, value),
            FieldOp::Gt => Self::any_ordered(&candidates, value, |o| o == Ordering::Greater),
            FieldOp::Gte => Self::any_ordered(&candidates, value, |o| o != Ordering::Less),
            FieldOp::Lt => Self::any_ordered(&candidates, value, |o| o == Ordering::Less),
            FieldOp::Lte => Self::any_ordered(&candidates, value, |o| o != Ordering::Greater),
            FieldOp::AnyOf => Self::any_of(&candidates, value)?,
            FieldOp::NoneOf => !Self::any_of(&candidates, value)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use simplemongo_core::query::Filter;

    fn matches(document: &Document, expr: Expr) -> bool {
        DocumentEvaluator::new(document).evaluate(&expr).unwrap()
    }

    #[test]
    fn numbers_compare_across_widths() {
        let document = doc! { "n": 5i64 };
        assert!(matches(&document, Filter::eq("n", 5)));
        assert!(matches(&document, Filter::gt("n", 4.5)));
        assert!(!matches(&document, Filter::lt("n", 5)));
        assert!(matches(&document, Filter::lte("n", 5)));
    }

    #[test]
    fn ordering_does_not_cross_types() {
        let document = doc! { "n": "10" };
        assert!(!matches(&document, Filter::gt("n", 1)));
        assert!(!matches(&document, Filter::lt("n", 1)));
    }

    #[test]
    fn arrays_match_any_element() {
        let document = doc! { "tags": ["red", "blue"], "scores": [3, 9] };
        assert!(matches(&document, Filter::eq("tags", "blue")));
        assert!(matches(&document, Filter::eq("tags", vec!["red", "blue"])));
        assert!(matches(&document, Filter::gt("scores", 8)));
        assert!(!matches(&document, Filter::gt("scores", 9)));
        assert!(matches(&document, Filter::any_of("tags", ["green", "red"])));
        assert!(matches(&document, Filter::none_of("tags", ["green"])));
    }

    #[test]
    fn missing_fields() {
        let document = doc! { "a": 1 };
        assert!(matches(&document, Filter::eq("b", Bson::Null)));
        assert!(matches(&document, Filter::ne("b", 1)));
        assert!(matches(&document, Filter::none_of("b", [1])));
        assert!(!matches(&document, Filter::gt("b", 0)));
        assert!(matches(&document, Filter::not_exists("b")));
        assert!(matches(&document, Filter::gt("b", 0).not()));
    }

    #[test]
    fn dotted_paths_reach_into_embedded_documents() {
        let document = doc! { "address": { "city": "Oslo" }, "items": [{ "qty": 2 }, { "qty": 7 }] };
        assert!(matches(&document, Filter::eq("address.city", "Oslo")));
        assert!(matches(&document, Filter::gte("items.qty", 7)));
        assert!(matches(&document, Filter::exists("items.qty")));
        assert!(!matches(&document, Filter::exists("address.zip")));
    }

    #[test]
    fn object_ids_compare_by_value() {
        let id = ObjectId::new();
        let document = doc! { "_id": id };
        assert!(matches(&document, Filter::eq("_id", id)));
        assert!(!matches(&document, Filter::eq("_id", ObjectId::new())));
    }

    #[test]
    fn sort_order_ranks_types_before_values() {
        let null = Bson::Null;
        let one = Bson::Int32(1);
        let two = Bson::Double(2.0);
        let text = Bson::String("a".into());

        assert_eq!(Comparable::from(&null).sort_cmp(&Comparable::from(&one)), Ordering::Less);
        assert_eq!(Comparable::from(&two).sort_cmp(&Comparable::from(&one)), Ordering::Greater);
        assert_eq!(Comparable::from(&text).sort_cmp(&Comparable::from(&two)), Ordering::Greater);
    }

    #[test]
    fn large_integers_compare_exactly() {
        let document = doc! { "_id": 9_007_199_254_740_992i64 };
        assert!(!matches(&document, Filter::eq("_id", 9_007_199_254_740_993i64)));
        assert!(matches(&document, Filter::lt("_id", 9_007_199_254_740_993i64)));
        assert!(matches(&document, Filter::eq("_id", 9_007_199_254_740_992.0)));
        assert!(matches(&document, Filter::gt("_id", 9_007_199_254_740_991.5)));
    }

    #[test]
    fn same_value_ignores_numeric_width() {
        assert!(same_value(&Bson::Int32(1), &Bson::Int64(1)));
        assert!(same_value(&Bson::Int64(1), &Bson::Double(1.0)));
        assert!(!same_value(&Bson::Int32(1), &Bson::Double(1.5)));
        assert!(!same_value(&Bson::Int64(i64::MAX), &Bson::Double(9_223_372_036_854_775_808.0)));
        assert!(!same_value(&Bson::Int32(1), &Bson::String("1".into())));
    }
}
