//! Parsing of filter documents into [`Expr`] trees.
//!
//! Supported: implicit equality, `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`,
//! `$in`, `$nin`, `$exists`, `$not` under a field, and top-level `$and`,
//! `$or` and `$nor`.

use bson::{Bson, Document};

use simplemongo_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp},
};

/// Parses a filter document. An empty document matches everything.
pub fn parse_filter(filter: &Document) -> DocumentStoreResult<Expr> {
    let mut exprs = Vec::with_capacity(filter.len());

    for (key, value) in filter {
        let expr = match key.as_str() {
            "$and" => Expr::And(parse_clauses(key, value)?),
            "$or" => Expr::Or(parse_clauses(key, value)?),
            "$nor" => Expr::Or(parse_clauses(key, value)?).not(),
            operator if operator.starts_with('$') => {
                return Err(DocumentStoreError::InvalidFilter(format!(
                    "unknown top level operator: {operator}"
                )));
            }
            field => parse_field(field, value)?,
        };
        exprs.push(expr);
    }

    Ok(collapse(exprs))
}

fn collapse(mut exprs: Vec<Expr>) -> Expr {
    match exprs.len() {
        1 => exprs.remove(0),
        _ => Expr::And(exprs),
    }
}

fn parse_clauses(operator: &str, value: &Bson) -> DocumentStoreResult<Vec<Expr>> {
    let Bson::Array(clauses) = value else {
        return Err(DocumentStoreError::InvalidFilter(format!("{operator} must be an array")));
    };

    if clauses.is_empty() {
        return Err(DocumentStoreError::InvalidFilter(format!(
            "{operator} must be a nonempty array"
        )));
    }

    clauses
        .iter()
        .map(|clause| match clause {
            Bson::Document(clause) => parse_filter(clause),
            _ => Err(DocumentStoreError::InvalidFilter(format!(
                "{operator} entries must be documents"
            ))),
        })
        .collect()
}

fn parse_field(field: &str, value: &Bson) -> DocumentStoreResult<Expr> {
    match value {
        Bson::Document(operators) if is_operator_document(operators) => parse_operators(field, operators),
        other => Ok(Expr::field(field.to_string(), FieldOp::Eq, other.clone())),
    }
}

fn is_operator_document(document: &Document) -> bool {
    document
        .keys()
        .next()
        .is_some_and(|key| key.starts_with('$'))
}

fn parse_operators(field: &str, operators: &Document) -> DocumentStoreResult<Expr> {
    let mut exprs = Vec::with_capacity(operators.len());

    for (operator, operand) in operators {
        let expr = match operator.as_str() {
            "$exists" => Expr::Exists(field.to_string(), truthy(operand)),
            "$not" => match operand {
                Bson::Document(inner) if is_operator_document(inner) => parse_operators(field, inner)?.not(),
                _ => {
                    return Err(DocumentStoreError::InvalidFilter(
                        "$not needs an operator document".to_string(),
                    ));
                }
            },
            name => {
                let op = FieldOp::from_operator(name).ok_or_else(|| {
                    DocumentStoreError::InvalidFilter(format!("unknown operator: {name}"))
                })?;

                if matches!(op, FieldOp::AnyOf | FieldOp::NoneOf) && !matches!(operand, Bson::Array(_)) {
                    return Err(DocumentStoreError::InvalidFilter(format!("{name} needs an array")));
                }

                Expr::field(field.to_string(), op, operand.clone())
            }
        };
        exprs.push(expr);
    }

    Ok(collapse(exprs))
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use simplemongo_core::query::Filter;

    #[test]
    fn implicit_equality_and_operator_documents() {
        let expr = parse_filter(&doc! { "name": "a", "age": { "$gte": 18, "$lt": 65 } }).unwrap();

        assert_eq!(
            expr,
            Filter::and([
                Filter::eq("name", "a"),
                Filter::and([Filter::gte("age", 18), Filter::lt("age", 65)]),
            ])
        );
    }

    #[test]
    fn nor_becomes_negated_or() {
        let expr = parse_filter(&doc! { "$nor": [{ "a": 1 }, { "b": 2 }] }).unwrap();
        assert_eq!(expr, Filter::or([Filter::eq("a", 1), Filter::eq("b", 2)]).not());
    }

    #[test]
    fn builder_filters_parse_back() {
        let original = Filter::exists("x").not().or(Filter::none_of("tag", ["a", "b"]));
        let document: Document = original.clone().into();
        let parsed = parse_filter(&document).unwrap();

        assert_eq!(parsed, Filter::or([Filter::or([Filter::exists("x")]).not(), Filter::none_of("tag", ["a", "b"])]));
    }

    #[test]
    fn embedded_documents_without_operators_are_equality() {
        let expr = parse_filter(&doc! { "address": { "city": "Oslo" } }).unwrap();
        assert_eq!(expr, Filter::eq("address", doc! { "city": "Oslo" }));
    }

    #[test]
    fn rejects_unknown_operators() {
        assert!(matches!(
            parse_filter(&doc! { "a": { "$regex": "x" } }),
            Err(DocumentStoreError::InvalidFilter(_))
        ));
        assert!(matches!(
            parse_filter(&doc! { "$where": "true" }),
            Err(DocumentStoreError::InvalidFilter(_))
        ));
        assert!(matches!(
            parse_filter(&doc! { "a": { "$in": 3 } }),
            Err(DocumentStoreError::InvalidFilter(_))
        ));
        assert!(matches!(
            parse_filter(&doc! { "$or": [] }),
            Err(DocumentStoreError::InvalidFilter(_))
        ));
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert_eq!(parse_filter(&Document::new()).unwrap(), Expr::And(Vec::new()));
    }
}
