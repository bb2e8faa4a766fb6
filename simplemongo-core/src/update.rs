//! Builder for update specifications.
//!
//! Update specifications are plain documents of field operators. The builder
//! groups operands by operator so repeated calls merge instead of overwriting:
//!
//! ```ignore
//! use simplemongo::update::Update;
//!
//! let update = Update::new()
//!     .set("status", "archived")
//!     .inc("revision", 1)
//!     .unset("draft");
//!
//! posts.update_many(doc! { "owner": "alice" }, update).await?;
//! ```

use bson::{Bson, Document};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    operators: Document,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `field` to `value`, creating it if missing.
    pub fn set(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.push_operand("$set", field.into(), value.into())
    }

    /// Removes `field`.
    pub fn unset(self, field: impl Into<String>) -> Self {
        self.push_operand("$unset", field.into(), Bson::String(String::new()))
    }

    /// Adds `amount` to a numeric field. A missing field is treated as zero.
    pub fn inc(self, field: impl Into<String>, amount: impl Into<Bson>) -> Self {
        self.push_operand("$inc", field.into(), amount.into())
    }

    pub fn mul(self, field: impl Into<String>, factor: impl Into<Bson>) -> Self {
        self.push_operand("$mul", field.into(), factor.into())
    }

    /// Sets `field` to `value` when `value` is lower than the current value or the field is missing.
    pub fn min(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.push_operand("$min", field.into(), value.into())
    }

    /// Sets `field` to `value` when `value` is greater than the current value or the field is missing.
    pub fn max(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.push_operand("$max", field.into(), value.into())
    }

    pub fn rename(self, field: impl Into<String>, new: impl Into<String>) -> Self {
        self.push_operand("$rename", field.into(), Bson::String(new.into()))
    }

    /// Appends `value` to an array field.
    pub fn push(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.push_operand("$push", field.into(), value.into())
    }

    /// Appends `value` to an array field unless it is already present.
    pub fn add_to_set(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.push_operand("$addToSet", field.into(), value.into())
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn into_document(self) -> Document {
        self.operators
    }

    fn push_operand(mut self, operator: &str, field: String, value: Bson) -> Self {
        match self.operators.get_mut(operator) {
            Some(Bson::Document(operands)) => {
                operands.insert(field, value);
            }
            _ => {
                let mut operands = Document::new();
                operands.insert(field, value);
                self.operators.insert(operator, operands);
            }
        }
        self
    }
}

impl From<Update> for Document {
    fn from(update: Update) -> Self {
        update.into_document()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn operands_merge_per_operator() {
        let update: Document = Update::new()
            .set("a", 1)
            .inc("count", 1)
            .set("b", "two")
            .into();

        assert_eq!(
            update,
            doc! {
                "$set": { "a": 1, "b": "two" },
                "$inc": { "count": 1 },
            }
        );
    }

    #[test]
    fn unset_and_rename_use_store_operand_shapes() {
        let update: Document = Update::new().unset("draft").rename("nick", "alias").into();
        assert_eq!(
            update,
            doc! { "$unset": { "draft": "" }, "$rename": { "nick": "alias" } }
        );
    }

    #[test]
    fn min_and_max_build_their_operators() {
        let update: Document = Update::new().min("low", 3).max("high", 9).min("floor", 0.5).into();
        assert_eq!(
            update,
            doc! { "$min": { "low": 3, "floor": 0.5 }, "$max": { "high": 9 } }
        );
    }
}
