//! Association metadata.
//!
//! An [`AssociationDescriptor`] tells the engine everything it needs to
//! join one association: which side owns the key, which field to read
//! from the records being preloaded, which field to match on the fetched
//! rows, and which entity the rows belong to. Descriptors are resolved
//! through the [`AssociationReflect`] trait, normally backed by an
//! [`AssociationMap`] registry built from the application's schema.
//!
//! ```rust
//! use lodestone::{AssociationDescriptor, AssociationMap, AssociationReflect};
//!
//! let mut map = AssociationMap::new();
//! map.register("post", AssociationDescriptor::has_many("comments", "comment")
//!     .related_key("post_id"));
//! map.register("post", AssociationDescriptor::belongs_to("author", "user")
//!     .owner_key("author_id"));
//!
//! let assoc = map.describe("post", "comments").unwrap();
//! assert_eq!(assoc.owner_key, "id");
//! assert_eq!(assoc.related_key, "post_id");
//! assert!(map.describe("post", "tags").is_none());
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Cardinality and key ownership of an association.
///
/// This is a closed enumeration: the combine step dispatches on it
/// exhaustively, since the behavioral variation is small and closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssociationKind {
    /// Parent owns the key, at most one related row (e.g. User has one
    /// Profile).
    HasOne,
    /// Parent owns the key, arbitrarily many related rows (e.g. User has
    /// many Posts).
    HasMany,
    /// The record itself holds the foreign key (e.g. Post belongs to
    /// User).
    BelongsTo,
}

impl AssociationKind {
    /// Check if this association yields arbitrarily many rows.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::HasMany)
    }

    /// Check if the parent side owns the join key.
    pub fn owns_key(&self) -> bool {
        matches!(self, Self::HasOne | Self::HasMany)
    }
}

/// The join metadata for one association field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDescriptor {
    /// Name of the association field.
    pub field: SmolStr,
    /// Cardinality and key ownership.
    pub kind: AssociationKind,
    /// Field read from the records being preloaded (primary key for
    /// has-one/has-many, foreign key for belongs-to).
    pub owner_key: SmolStr,
    /// Counterpart field on the fetched rows (foreign key for
    /// has-one/has-many, primary key for belongs-to). Fetched rows are
    /// sorted ascending by this field.
    pub related_key: SmolStr,
    /// Entity type of the fetched rows.
    pub related_entity: SmolStr,
    /// Query source (table or named query) the rows are fetched from.
    pub source: SmolStr,
}

impl AssociationDescriptor {
    fn new(
        field: impl Into<SmolStr>,
        kind: AssociationKind,
        related_entity: impl Into<SmolStr>,
    ) -> Self {
        let related_entity = related_entity.into();
        Self {
            field: field.into(),
            kind,
            owner_key: "id".into(),
            related_key: "id".into(),
            related_entity: related_entity.clone(),
            source: related_entity,
        }
    }

    /// Create a has-one descriptor. Defaults: `owner_key = "id"`,
    /// `related_key = "id"`, source named after the related entity.
    pub fn has_one(field: impl Into<SmolStr>, related_entity: impl Into<SmolStr>) -> Self {
        Self::new(field, AssociationKind::HasOne, related_entity)
    }

    /// Create a has-many descriptor.
    pub fn has_many(field: impl Into<SmolStr>, related_entity: impl Into<SmolStr>) -> Self {
        Self::new(field, AssociationKind::HasMany, related_entity)
    }

    /// Create a belongs-to descriptor.
    pub fn belongs_to(field: impl Into<SmolStr>, related_entity: impl Into<SmolStr>) -> Self {
        Self::new(field, AssociationKind::BelongsTo, related_entity)
    }

    /// Set the field read from the records being preloaded.
    pub fn owner_key(mut self, key: impl Into<SmolStr>) -> Self {
        self.owner_key = key.into();
        self
    }

    /// Set the counterpart field on the fetched rows.
    pub fn related_key(mut self, key: impl Into<SmolStr>) -> Self {
        self.related_key = key.into();
        self
    }

    /// Set the query source the rows are fetched from.
    pub fn source(mut self, source: impl Into<SmolStr>) -> Self {
        self.source = source.into();
        self
    }
}

/// Resolves an (entity type, field name) pair to an association
/// descriptor.
pub trait AssociationReflect {
    /// Look up the descriptor for `field` on `entity`, or `None` if the
    /// entity has no such association.
    fn describe(&self, entity: &str, field: &str) -> Option<&AssociationDescriptor>;
}

/// A registry of association descriptors keyed by entity and field.
#[derive(Debug, Clone, Default)]
pub struct AssociationMap {
    entities: HashMap<SmolStr, HashMap<SmolStr, AssociationDescriptor>>,
}

impl AssociationMap {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under the given entity type.
    pub fn register(&mut self, entity: impl Into<SmolStr>, descriptor: AssociationDescriptor) {
        self.entities
            .entry(entity.into())
            .or_default()
            .insert(descriptor.field.clone(), descriptor);
    }

    /// Iterate all descriptors declared for an entity.
    pub fn associations_of(&self, entity: &str) -> impl Iterator<Item = &AssociationDescriptor> {
        self.entities.get(entity).into_iter().flat_map(HashMap::values)
    }
}

impl AssociationReflect for AssociationMap {
    fn describe(&self, entity: &str, field: &str) -> Option<&AssociationDescriptor> {
        self.entities.get(entity)?.get(field)
    }
}

impl<R: AssociationReflect + ?Sized> AssociationReflect for &R {
    fn describe(&self, entity: &str, field: &str) -> Option<&AssociationDescriptor> {
        (**self).describe(entity, field)
    }
}
