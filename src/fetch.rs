//! The batch fetch boundary.
//!
//! The preloader never talks to a database itself. It hands an
//! [`AssociationDescriptor`] and the set of join keys it collected to a
//! [`BatchFetcher`], and expects back the related rows **sorted ascending
//! by the descriptor's `related_key`**. That ordering contract is imposed
//! on the fetch collaborator (usually a single `... WHERE related_key IN
//! (keys) ORDER BY related_key` query) and is not re-derived by the
//! engine.
//!
//! Connection and session lifecycle belong entirely to the fetcher; the
//! engine holds no resource across calls.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::FetchResult;
use crate::key::KeyValue;
use crate::record::Record;
use crate::reflection::{AssociationDescriptor, AssociationReflect};

/// Executes the batch fetch for one association level.
#[async_trait]
pub trait BatchFetcher: Send + Sync {
    /// Fetch the rows of `descriptor.related_entity` whose
    /// `descriptor.related_key` is in `keys`.
    ///
    /// Contract: the returned rows are sorted ascending by
    /// `descriptor.related_key`. An empty key set must return an empty
    /// row set without error. Errors are propagated to the caller
    /// unchanged; the engine never retries.
    async fn fetch(
        &self,
        descriptor: &AssociationDescriptor,
        keys: &BTreeSet<KeyValue>,
    ) -> FetchResult<Vec<Record>>;
}

#[async_trait]
impl<F: BatchFetcher + ?Sized> BatchFetcher for &F {
    async fn fetch(
        &self,
        descriptor: &AssociationDescriptor,
        keys: &BTreeSet<KeyValue>,
    ) -> FetchResult<Vec<Record>> {
        (**self).fetch(descriptor, keys).await
    }
}

/// Everything the preloader needs from a repository: association
/// metadata plus batch fetching.
///
/// Blanket-implemented, so any type providing both capabilities is a
/// source.
pub trait PreloadSource: AssociationReflect + BatchFetcher {}

impl<S: AssociationReflect + BatchFetcher> PreloadSource for S {}
