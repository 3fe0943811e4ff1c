//! The preloading engine.
//!
//! [`Preloader`] folds a batch of already-loaded records through a
//! normalized preload tree: one batch fetch per association level, a
//! sort-merge join to attach fetched rows to the right parents, and an
//! order restoration step so callers get their records back in the exact
//! sequence they passed them in, nils included, untouched, at their
//! original positions.
//!
//! ```rust,ignore
//! let preloader = Preloader::new(repo);
//!
//! // posts.comments.author, then posts.author
//! let posts = preloader
//!     .preload(posts, nested("comments", ["author"]))
//!     .await?;
//! ```
//!
//! The whole call either attaches the entire requested tree or fails;
//! no partially-combined result is ever returned. Cancellation follows
//! async Rust: dropping the future aborts at the pending fetch, and a
//! deadline is the caller's `tokio::time::timeout` around the call.

use std::collections::BTreeSet;

use futures::future::BoxFuture;
use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::error::{PreloadError, PreloadResult};
use crate::fetch::PreloadSource;
use crate::key::KeyValue;
use crate::path::{unextract, Container, PathSpec};
use crate::record::{AssociationValue, Record};
use crate::reflection::{AssociationDescriptor, AssociationKind};
use crate::spec::{normalize, PreloadNode, PreloadSpec};

/// Association preloading engine over a [`PreloadSource`].
pub struct Preloader<S> {
    source: S,
}

impl<S: PreloadSource> Preloader<S> {
    /// Create a preloader over the given source.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Get the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Preload the associations named by `spec` onto `records`.
    ///
    /// Records come back in the caller's order, nils at their original
    /// positions. Every field named in the spec is concretely loaded on
    /// every non-nil record afterwards, possibly to `One(None)` or
    /// `Many(vec![])`, never left `NotLoaded`.
    pub async fn preload(
        &self,
        records: Vec<Option<Record>>,
        spec: impl Into<PreloadSpec>,
    ) -> PreloadResult<Vec<Option<Record>>> {
        let nodes = normalize(spec)?;
        self.preload_nodes(records, &nodes).await
    }

    /// Preload records nested at `path` inside `containers`, returning
    /// containers of the exact same shape and order.
    ///
    /// The empty path treats each container as a bare record slot.
    ///
    /// # Panics
    /// Panics if `path` does not address a record slot in every
    /// container (caller contract violation, see [`crate::path`]).
    pub async fn run(
        &self,
        containers: Vec<Container>,
        spec: impl Into<PreloadSpec>,
        path: &PathSpec,
    ) -> PreloadResult<Vec<Container>> {
        let nodes = normalize(spec)?;
        let records = containers
            .iter()
            .map(|container| container.extract_record(path))
            .collect();
        let loaded = self.preload_nodes(records, &nodes).await?;
        Ok(unextract(loaded, containers, path))
    }

    /// Fold the record sequence through each top-level node in turn.
    ///
    /// Boxed for async recursion: sub-trees re-enter this through
    /// [`preload_node`](Self::preload_node).
    fn preload_nodes<'a>(
        &'a self,
        records: Vec<Option<Record>>,
        nodes: &'a [PreloadNode],
    ) -> BoxFuture<'a, PreloadResult<Vec<Option<Record>>>> {
        Box::pin(async move {
            let mut records = records;
            for node in nodes {
                records = self.preload_node(records, node).await?;
            }
            Ok(records)
        })
    }

    /// Load one association level: resolve the descriptor, fetch by key
    /// set, recurse into sub-nodes depth-first, then combine.
    async fn preload_node(
        &self,
        records: Vec<Option<Record>>,
        node: &PreloadNode,
    ) -> PreloadResult<Vec<Option<Record>>> {
        let Some(entity) = resolve_entity(&records)? else {
            // Empty or entirely-nil input passes through unchanged.
            return Ok(records);
        };
        let descriptor = self
            .source
            .describe(&entity, &node.field)
            .ok_or_else(|| PreloadError::unknown_association(entity.clone(), node.field.clone()))?;

        let keys = collect_keys(&records, descriptor);
        debug!(
            entity = %entity,
            field = %node.field,
            keys = keys.len(),
            "Preloading association"
        );
        let rows = self.source.fetch(descriptor, &keys).await?;

        // Nested associations attach to the fetched rows before those
        // rows attach to their parents.
        let rows = if node.children.is_empty() {
            rows
        } else {
            let slots = rows.into_iter().map(Some).collect();
            let loaded = self.preload_nodes(slots, &node.children).await?;
            loaded.into_iter().flatten().collect()
        };

        Ok(combine(records, descriptor, rows))
    }
}

/// Entity type of the first non-nil record, verifying every other
/// non-nil record matches it. `None` when there is no non-nil record.
fn resolve_entity(records: &[Option<Record>]) -> PreloadResult<Option<SmolStr>> {
    let mut entity: Option<SmolStr> = None;
    for record in records.iter().flatten() {
        match &entity {
            None => entity = Some(record.entity().into()),
            Some(expected) if expected.as_str() != record.entity() => {
                return Err(PreloadError::mixed_entities(
                    expected.clone(),
                    record.entity(),
                ));
            }
            Some(_) => {}
        }
    }
    Ok(entity)
}

/// Collect the fetch key set: `owner_key` values of the non-nil records.
///
/// `Null` keys are dropped: they join nothing, and for belongs-to this
/// is what restricts the fetch to records whose foreign key is set. The
/// `BTreeSet` both deduplicates and keeps the keys ascending.
fn collect_keys(
    records: &[Option<Record>],
    descriptor: &AssociationDescriptor,
) -> BTreeSet<KeyValue> {
    records
        .iter()
        .flatten()
        .map(|record| record.key(&descriptor.owner_key))
        .filter(|key| !key.is_null())
        .collect()
}

/// Sort-merge join of key-sorted `rows` onto `records`, restoring the
/// caller's original order.
fn combine(
    records: Vec<Option<Record>>,
    descriptor: &AssociationDescriptor,
    rows: Vec<Record>,
) -> Vec<Option<Record>> {
    let mut out: Vec<Option<Record>> = vec![None; records.len()];

    // Pair every non-nil record with its original position; nils keep
    // their slots in `out` untouched.
    let mut indexed: Vec<(usize, KeyValue, Record)> = records
        .into_iter()
        .enumerate()
        .filter_map(|(pos, slot)| {
            slot.map(|record| (pos, record.key(&descriptor.owner_key), record))
        })
        .collect();

    // One linear scan; the stable sort only runs when the caller's order
    // is not already key-ascending. The carried position doubles as the
    // inverse permutation.
    let presorted = indexed.windows(2).all(|pair| pair[0].1 <= pair[1].1);
    if !presorted {
        indexed.sort_by(|a, b| a.1.cmp(&b.1));
    }

    let row_keys: Vec<KeyValue> = rows
        .iter()
        .map(|row| row.key(&descriptor.related_key))
        .collect();
    trace!(
        records = indexed.len(),
        rows = rows.len(),
        presorted,
        "Merging fetched rows"
    );

    let mut cursor = 0usize;
    for (pos, key, record) in indexed {
        let value = matched_value(descriptor, &rows, &row_keys, &mut cursor, &key);
        out[pos] = Some(record.with_association(descriptor.field.clone(), value));
    }
    out
}

/// Two-pointer merge step for one record key.
///
/// The cursor never advances past rows matching the current key, so
/// consecutive records sharing a key see the same rows.
fn matched_value(
    descriptor: &AssociationDescriptor,
    rows: &[Record],
    row_keys: &[KeyValue],
    cursor: &mut usize,
    key: &KeyValue,
) -> AssociationValue {
    if key.is_null() {
        return empty_value(descriptor.kind);
    }
    // Rows keyed below the current record match nothing; drop them.
    while *cursor < row_keys.len() && row_keys[*cursor] < *key {
        *cursor += 1;
    }
    match descriptor.kind {
        AssociationKind::BelongsTo => {
            if *cursor < row_keys.len() && row_keys[*cursor] == *key {
                AssociationValue::one(rows[*cursor].clone())
            } else {
                AssociationValue::none()
            }
        }
        AssociationKind::HasMany => {
            let end = group_end(row_keys, *cursor, key);
            AssociationValue::Many(rows[*cursor..end].to_vec())
        }
        AssociationKind::HasOne => {
            let end = group_end(row_keys, *cursor, key);
            if end - *cursor > 1 {
                debug!(
                    field = %descriptor.field,
                    key = ?key,
                    dropped = end - *cursor - 1,
                    "Multiple rows matched a has-one association; keeping the first"
                );
            }
            match rows[*cursor..end].first() {
                Some(row) => AssociationValue::one(row.clone()),
                None => AssociationValue::none(),
            }
        }
    }
}

/// End of the run of rows equal to `key`, starting at `start`.
fn group_end(row_keys: &[KeyValue], start: usize, key: &KeyValue) -> usize {
    let mut end = start;
    while end < row_keys.len() && row_keys[end] == *key {
        end += 1;
    }
    end
}

/// The loaded empty value for an association kind.
fn empty_value(kind: AssociationKind) -> AssociationValue {
    if kind.is_many() {
        AssociationValue::Many(Vec::new())
    } else {
        AssociationValue::none()
    }
}
