//! Error types for preload operations.
//!
//! Two failure families exist:
//! - [`PreloadError`]: configuration mistakes in the caller's spec or
//!   metadata (unknown association, duplicate field, mixed entity types).
//!   These are fatal and never retried.
//! - [`FetchError`]: the fetch collaborator failed. It is propagated
//!   unchanged so the caller's own retry/transaction policy governs.
//!
//! Path addressing mistakes are not errors at all: they are caller
//! contract violations and panic (see [`crate::path`]).
//!
//! ```rust
//! use lodestone::{FetchError, PreloadError};
//!
//! let err = PreloadError::unknown_association("post", "authr");
//! assert!(err.to_string().contains("authr"));
//!
//! let err: PreloadError = FetchError::new("connection reset").into();
//! assert!(matches!(err, PreloadError::Fetch(_)));
//! ```

use smol_str::SmolStr;
use thiserror::Error;

/// Result type for preload operations.
pub type PreloadResult<T> = Result<T, PreloadError>;

/// Result type for the fetch collaborator.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while preloading associations.
#[derive(Error, Debug)]
pub enum PreloadError {
    /// The requested association field is not declared on the entity.
    #[error("entity `{entity}` has no association named `{field}`")]
    UnknownAssociation {
        /// The entity type that was inspected.
        entity: SmolStr,
        /// The association field that could not be resolved.
        field: SmolStr,
    },

    /// The same association field was named twice at one level of the
    /// preload tree.
    #[error("association `{field}` is named more than once at the same level of the preload spec")]
    DuplicateField {
        /// The duplicated field.
        field: SmolStr,
    },

    /// Records of more than one entity type were passed to a single
    /// preload call.
    #[error("cannot preload records of mixed entity types: expected `{expected}`, found `{found}`")]
    MixedEntities {
        /// Entity type resolved from the first non-nil record.
        expected: SmolStr,
        /// The conflicting entity type.
        found: SmolStr,
    },

    /// The fetch collaborator failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl PreloadError {
    /// Create an unknown-association error.
    pub fn unknown_association(entity: impl Into<SmolStr>, field: impl Into<SmolStr>) -> Self {
        Self::UnknownAssociation {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Create a duplicate-field error.
    pub fn duplicate_field(field: impl Into<SmolStr>) -> Self {
        Self::DuplicateField {
            field: field.into(),
        }
    }

    /// Create a mixed-entities error.
    pub fn mixed_entities(expected: impl Into<SmolStr>, found: impl Into<SmolStr>) -> Self {
        Self::MixedEntities {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// An error raised by the fetch collaborator.
///
/// The preloader never constructs these itself beyond wrapping; the
/// message and source come from whatever backend executes the batch
/// query.
#[derive(Error, Debug)]
#[error("fetch failed: {message}")]
pub struct FetchError {
    /// Human-readable description of the failure.
    pub message: String,
    /// The underlying backend error, if any.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl FetchError {
    /// Create a new fetch error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying backend error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}
