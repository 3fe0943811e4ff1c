//! # lodestone
//!
//! Batch association preloading engine for Rust data mappers.
//!
//! Given a batch of already-loaded records and a declarative tree of
//! association fields, `lodestone` issues one batch fetch per
//! association level, merges the fetched rows back onto the correct
//! parents by key, and hands the records back in the exact order and
//! shape they came in. The crate provides:
//!
//! - Three association cardinalities: has-one, has-many, belongs-to
//! - Multi-level preload trees, loaded depth-first
//! - A sort-merge join that restores the caller's original record order
//! - Nil-tolerant batches (nils pass through untouched, in place)
//! - Path-addressed preloading of records nested in tuple/list shapes
//! - Immutable records: a preload returns new values, never mutates
//!
//! The database side stays behind two seams: [`AssociationReflect`]
//! resolves association metadata, and [`BatchFetcher`] executes the
//! batch queries. Anything implementing both is a [`PreloadSource`].
//!
//! ## Describing associations
//!
//! ```rust
//! use lodestone::{AssociationDescriptor, AssociationMap, AssociationReflect};
//!
//! let mut schema = AssociationMap::new();
//! schema.register(
//!     "post",
//!     AssociationDescriptor::has_many("comments", "comment").related_key("post_id"),
//! );
//! schema.register(
//!     "post",
//!     AssociationDescriptor::belongs_to("author", "user").owner_key("author_id"),
//! );
//!
//! assert!(schema.describe("post", "comments").is_some());
//! ```
//!
//! ## Preload specs
//!
//! A spec is a field name, a field with a sub-spec, or an ordered
//! sequence mixing both:
//!
//! ```rust
//! use lodestone::spec::{field, nested, normalize};
//!
//! // comments (with their authors), then the post author
//! let spec = vec![nested("comments", ["author"]), field("author")];
//! assert_eq!(normalize(spec).unwrap().len(), 2);
//! ```
//!
//! ## Preloading
//!
//! ```rust,ignore
//! use lodestone::{Preloader, spec::nested};
//!
//! let preloader = Preloader::new(repo);
//!
//! // One fetch for all comments, one for all their authors.
//! let posts = preloader
//!     .preload(posts, nested("comments", ["author"]))
//!     .await?;
//! ```
//!
//! ## Records nested in container shapes
//!
//! Rows that arrive as tuples or lists are addressed with a typed path;
//! everything around the record survives the preload untouched:
//!
//! ```rust,ignore
//! use lodestone::{Container, PathSpec};
//!
//! // Each row is (record, comment_count); the record sits at tuple index 0.
//! let path = PathSpec::root().tuple(0);
//! let rows = preloader.run(rows, "author", &path).await?;
//! ```
//!
//! ## Errors
//!
//! Configuration mistakes (unknown association, duplicate field in a
//! spec, mixed entity types) fail fast with [`PreloadError`]; fetch
//! failures propagate unchanged as [`FetchError`]. A failed call leaves
//! nothing mutated; records and containers are immutable values.
//!
//! ```rust
//! use lodestone::spec::normalize;
//!
//! assert!(normalize(vec!["comments", "comments"]).is_err());
//! ```

pub mod error;
pub mod fetch;
pub mod key;
pub mod logging;
pub mod path;
pub mod preloader;
pub mod record;
pub mod reflection;
pub mod spec;

pub use error::{FetchError, FetchResult, PreloadError, PreloadResult};
pub use fetch::{BatchFetcher, PreloadSource};
pub use key::KeyValue;
pub use path::{unextract, Container, PathSpec, PathStep};
pub use preloader::Preloader;
pub use record::{AssociationValue, Record};
pub use reflection::{
    AssociationDescriptor, AssociationKind, AssociationMap, AssociationReflect,
};
pub use spec::{PreloadNode, PreloadSpec};

/// Commonly used types, importable in one line.
pub mod prelude {
    pub use crate::error::{FetchError, PreloadError, PreloadResult};
    pub use crate::fetch::{BatchFetcher, PreloadSource};
    pub use crate::key::KeyValue;
    pub use crate::path::{Container, PathSpec};
    pub use crate::preloader::Preloader;
    pub use crate::record::{AssociationValue, Record};
    pub use crate::reflection::{AssociationDescriptor, AssociationMap, AssociationReflect};
    pub use crate::spec::{field, nested, PreloadSpec};
}
