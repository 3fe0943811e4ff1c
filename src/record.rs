//! Immutable entity records with association slots.
//!
//! A [`Record`] is an opaque value tagged with an entity type: a bag of
//! column values plus named association slots. Records are never mutated
//! in place: "setting" an association produces a new `Record` value via
//! [`Record::with_association`], so other holders of the same record are
//! never affected by a preload.
//!
//! ```rust
//! use lodestone::{AssociationValue, KeyValue, Record};
//!
//! let post = Record::new("post").field("id", 1).field("title", "hello");
//!
//! assert_eq!(post.entity(), "post");
//! assert_eq!(post.key("id"), KeyValue::Int(1));
//! assert!(!post.is_loaded("comments"));
//!
//! let loaded = post.with_association("comments", AssociationValue::Many(vec![]));
//! assert!(loaded.is_loaded("comments"));
//! // The original value is untouched.
//! assert!(!post.is_loaded("comments"));
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::key::KeyValue;

/// The value held by an association slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssociationValue {
    /// The association has not been loaded.
    NotLoaded,
    /// A to-one association: the related record, or `None` if absent.
    One(Option<Box<Record>>),
    /// A to-many association: the related records in fetch order.
    Many(Vec<Record>),
}

impl AssociationValue {
    /// Wrap a single related record.
    pub fn one(record: Record) -> Self {
        Self::One(Some(Box::new(record)))
    }

    /// The loaded empty value for a to-one association.
    pub fn none() -> Self {
        Self::One(None)
    }

    /// Check if this slot has been loaded.
    pub fn is_loaded(&self) -> bool {
        !matches!(self, Self::NotLoaded)
    }
}

const NOT_LOADED: &AssociationValue = &AssociationValue::NotLoaded;

/// An immutable record tagged with an entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    entity: SmolStr,
    fields: IndexMap<SmolStr, KeyValue>,
    associations: IndexMap<SmolStr, AssociationValue>,
}

impl Record {
    /// Create a new record of the given entity type with no fields.
    pub fn new(entity: impl Into<SmolStr>) -> Self {
        Self {
            entity: entity.into(),
            fields: IndexMap::new(),
            associations: IndexMap::new(),
        }
    }

    /// Add a field value (builder style).
    pub fn field(mut self, name: impl Into<SmolStr>, value: impl Into<KeyValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// The entity type this record belongs to.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Get a field value if present.
    pub fn get(&self, name: &str) -> Option<&KeyValue> {
        self.fields.get(name)
    }

    /// Get a field value for joining; a missing field reads as `Null`,
    /// which matches no fetched row.
    pub fn key(&self, name: &str) -> KeyValue {
        self.fields.get(name).cloned().unwrap_or(KeyValue::Null)
    }

    /// Get an association slot; a slot never set reads as `NotLoaded`.
    pub fn association(&self, name: &str) -> &AssociationValue {
        self.associations.get(name).unwrap_or(NOT_LOADED)
    }

    /// Check if an association slot holds a concrete loaded value.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.association(name).is_loaded()
    }

    /// Return a copy of this record with the named association slot set.
    ///
    /// The receiver is left untouched; records are immutable values.
    pub fn with_association(&self, name: impl Into<SmolStr>, value: AssociationValue) -> Self {
        let mut next = self.clone();
        next.associations.insert(name.into(), value);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_reads_null() {
        let record = Record::new("user").field("id", 1);
        assert_eq!(record.key("id"), KeyValue::Int(1));
        assert_eq!(record.key("missing"), KeyValue::Null);
        assert!(record.get("missing").is_none());
    }

    #[test]
    fn test_unset_association_is_not_loaded() {
        let record = Record::new("user");
        assert_eq!(record.association("posts"), &AssociationValue::NotLoaded);
        assert!(!record.is_loaded("posts"));
    }

    #[test]
    fn test_with_association_returns_new_value() {
        let user = Record::new("user").field("id", 1);
        let child = Record::new("post").field("id", 10);

        let loaded = user.with_association("posts", AssociationValue::Many(vec![child]));

        assert!(loaded.is_loaded("posts"));
        assert!(!user.is_loaded("posts"));
        // Fields carry over untouched.
        assert_eq!(loaded.key("id"), KeyValue::Int(1));
    }

    #[test]
    fn test_association_value_helpers() {
        let record = Record::new("profile");
        assert!(AssociationValue::one(record).is_loaded());
        assert!(AssociationValue::none().is_loaded());
        assert!(!AssociationValue::NotLoaded.is_loaded());
    }
}
