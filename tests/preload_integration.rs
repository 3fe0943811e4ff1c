//! Integration tests for the preloading engine.
//!
//! These tests drive the public surface end-to-end through an in-memory
//! source and verify:
//! - Order preservation and nil passthrough
//! - Grouping behavior per association kind
//! - Depth-first loading of nested trees
//! - Path-addressed preloading of nested container shapes
//! - Idempotence of re-preloading

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use smol_str::SmolStr;

use lodestone::spec::{field, nested};
use lodestone::{
    AssociationDescriptor, AssociationMap, AssociationReflect, AssociationValue, BatchFetcher,
    Container, FetchError, FetchResult, KeyValue, PathSpec, PreloadError, Preloader, Record,
};

/// In-memory preload source backed by an association map and a row store
/// keyed by query source. Fetches filter by key membership and sort by
/// the related key, as the fetch contract requires.
struct MemorySource {
    schema: AssociationMap,
    store: HashMap<SmolStr, Vec<Record>>,
}

impl MemorySource {
    fn new(schema: AssociationMap) -> Self {
        Self {
            schema,
            store: HashMap::new(),
        }
    }

    fn rows(mut self, source: &str, rows: Vec<Record>) -> Self {
        self.store.insert(source.into(), rows);
        self
    }
}

impl AssociationReflect for MemorySource {
    fn describe(&self, entity: &str, f: &str) -> Option<&AssociationDescriptor> {
        self.schema.describe(entity, f)
    }
}

#[async_trait]
impl BatchFetcher for MemorySource {
    async fn fetch(
        &self,
        descriptor: &AssociationDescriptor,
        keys: &BTreeSet<KeyValue>,
    ) -> FetchResult<Vec<Record>> {
        let mut rows: Vec<Record> = self
            .store
            .get(&descriptor.source)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|row| keys.contains(&row.key(&descriptor.related_key)))
            .collect();
        rows.sort_by_key(|row| row.key(&descriptor.related_key));
        Ok(rows)
    }
}

fn blog_schema() -> AssociationMap {
    let mut schema = AssociationMap::new();
    schema.register(
        "post",
        AssociationDescriptor::has_many("comments", "comment").related_key("post_id"),
    );
    schema.register(
        "post",
        AssociationDescriptor::has_one("cover", "image").related_key("post_id"),
    );
    schema.register(
        "post",
        AssociationDescriptor::belongs_to("author", "user").owner_key("author_id"),
    );
    schema.register(
        "comment",
        AssociationDescriptor::belongs_to("author", "user").owner_key("author_id"),
    );
    schema
}

fn post(id: i64, author_id: impl Into<KeyValue>) -> Record {
    Record::new("post")
        .field("id", id)
        .field("author_id", author_id.into())
}

fn comment(id: i64, post_id: i64, author_id: i64) -> Record {
    Record::new("comment")
        .field("id", id)
        .field("post_id", post_id)
        .field("author_id", author_id)
}

fn image(id: i64, post_id: i64) -> Record {
    Record::new("image").field("id", id).field("post_id", post_id)
}

fn user(id: i64) -> Record {
    Record::new("user").field("id", id)
}

fn comment_ids(record: &Record) -> Vec<KeyValue> {
    match record.association("comments") {
        AssociationValue::Many(rows) => rows.iter().map(|r| r.key("id")).collect(),
        other => panic!("comments not loaded as Many: {other:?}"),
    }
}

/// Preloading a permuted batch and un-permuting the result matches
/// preloading the batch directly.
#[tokio::test]
async fn test_order_preservation_under_permutation() {
    let source = MemorySource::new(blog_schema()).rows(
        "comment",
        vec![comment(10, 1, 7), comment(11, 2, 7), comment(12, 3, 8)],
    );
    let preloader = Preloader::new(source);

    let records: Vec<Option<Record>> =
        vec![Some(post(1, 7)), Some(post(2, 7)), Some(post(3, 8))];
    let direct = preloader
        .preload(records.clone(), "comments")
        .await
        .unwrap();

    // Permutation [2, 0, 1] and its inverse [1, 2, 0].
    let permuted = vec![records[2].clone(), records[0].clone(), records[1].clone()];
    let loaded = preloader.preload(permuted, "comments").await.unwrap();
    let unpermuted = vec![loaded[1].clone(), loaded[2].clone(), loaded[0].clone()];

    assert_eq!(unpermuted, direct);
}

/// Nils at arbitrary positions come back as nils at identical positions.
#[tokio::test]
async fn test_nil_passthrough() {
    let source =
        MemorySource::new(blog_schema()).rows("comment", vec![comment(10, 1, 7)]);
    let preloader = Preloader::new(source);

    let out = preloader
        .preload(vec![None, Some(post(1, 7)), None], "comments")
        .await
        .unwrap();

    assert!(out[0].is_none());
    assert!(out[2].is_none());
    assert_eq!(comment_ids(out[1].as_ref().unwrap()), vec![KeyValue::Int(10)]);
}

/// P1(key=1), P2(key=2) with children C1(fk=1), C2(fk=1), C3(fk=2):
/// P1 gets [C1, C2] and P2 gets [C3].
#[tokio::test]
async fn test_has_many_grouping() {
    let source = MemorySource::new(blog_schema()).rows(
        "comment",
        vec![comment(1, 1, 7), comment(2, 1, 7), comment(3, 2, 7)],
    );
    let preloader = Preloader::new(source);

    let out = preloader
        .preload(vec![Some(post(1, 7)), Some(post(2, 7))], "comments")
        .await
        .unwrap();

    assert_eq!(
        comment_ids(out[0].as_ref().unwrap()),
        vec![KeyValue::Int(1), KeyValue::Int(2)]
    );
    assert_eq!(comment_ids(out[1].as_ref().unwrap()), vec![KeyValue::Int(3)]);
}

/// Two fetched rows for one has-one key: the first fetched row wins.
#[tokio::test]
async fn test_has_one_first_wins() {
    let source = MemorySource::new(blog_schema())
        .rows("image", vec![image(100, 1), image(101, 1)]);
    let preloader = Preloader::new(source);

    let out = preloader
        .preload(vec![Some(post(1, 7))], "cover")
        .await
        .unwrap();

    assert_eq!(
        out[0].as_ref().unwrap().association("cover"),
        &AssociationValue::one(image(100, 1))
    );
}

/// A belongs-to key with no fetched counterpart resolves to a loaded
/// None, not NotLoaded.
#[tokio::test]
async fn test_belongs_to_miss_is_none() {
    let source = MemorySource::new(blog_schema()).rows("user", vec![user(7)]);
    let preloader = Preloader::new(source);

    let out = preloader
        .preload(vec![Some(post(1, 99))], "author")
        .await
        .unwrap();

    let record = out[0].as_ref().unwrap();
    assert!(record.is_loaded("author"));
    assert_eq!(record.association("author"), &AssociationValue::none());
}

/// comments -> [author]: authors attach to the fetched comments before
/// the comments attach to their posts.
#[tokio::test]
async fn test_depth_first_nesting() {
    let source = MemorySource::new(blog_schema())
        .rows("comment", vec![comment(10, 1, 8), comment(11, 2, 9)])
        .rows("user", vec![user(7), user(8), user(9)]);
    let preloader = Preloader::new(source);

    let out = preloader
        .preload(
            vec![Some(post(1, 7)), Some(post(2, 7))],
            vec![nested("comments", ["author"]), field("author")],
        )
        .await
        .unwrap();

    for (i, author_id) in [(0usize, 8i64), (1, 9)] {
        let record = out[i].as_ref().unwrap();
        let AssociationValue::Many(comments) = record.association("comments") else {
            panic!("comments not loaded");
        };
        assert_eq!(
            comments[0].association("author"),
            &AssociationValue::one(user(author_id))
        );
        // The sibling branch loaded the post author too.
        assert_eq!(record.association("author"), &AssociationValue::one(user(7)));
    }
}

/// Records at path [1, 0] inside (x, [record, y]) shapes preload without
/// touching x or y, and the containers keep their shape and order.
#[tokio::test]
async fn test_path_preserving_preload() {
    let source = MemorySource::new(blog_schema()).rows("user", vec![user(7), user(8)]);
    let preloader = Preloader::new(source);

    let wrap = |record: Record, tag: &str| {
        Container::Tuple(vec![
            Container::Value(tag.into()),
            Container::List(vec![
                Container::record(record),
                Container::Value("y".into()),
            ]),
        ])
    };
    let containers = vec![wrap(post(1, 8), "first"), wrap(post(2, 7), "second")];
    let path = PathSpec::root().tuple(1).list(0);

    let out = preloader.run(containers, "author", &path).await.unwrap();

    let expected_shape = |tag: &str, record: Record| {
        Container::Tuple(vec![
            Container::Value(tag.into()),
            Container::List(vec![
                Container::record(record),
                Container::Value("y".into()),
            ]),
        ])
    };
    assert_eq!(
        out[0],
        expected_shape(
            "first",
            post(1, 8).with_association("author", AssociationValue::one(user(8)))
        )
    );
    assert_eq!(
        out[1],
        expected_shape(
            "second",
            post(2, 7).with_association("author", AssociationValue::one(user(7)))
        )
    );
}

/// Preloading an already-loaded field again with the same spec returns a
/// result equal in content to the input.
#[tokio::test]
async fn test_idempotence() {
    let source = MemorySource::new(blog_schema())
        .rows("comment", vec![comment(10, 1, 8)])
        .rows("user", vec![user(8)]);
    let preloader = Preloader::new(source);

    let records = vec![Some(post(1, 8)), None];
    let spec = vec![nested("comments", ["author"]), field("author")];

    let once = preloader.preload(records, spec.clone()).await.unwrap();
    let twice = preloader.preload(once.clone(), spec).await.unwrap();

    assert_eq!(twice, once);
}

/// An empty fetch still loads every requested slot concretely.
#[tokio::test]
async fn test_empty_fetch_loads_empty_values() {
    let preloader = Preloader::new(MemorySource::new(blog_schema()));

    let out = preloader
        .preload(vec![Some(post(1, 7))], vec!["comments", "cover", "author"])
        .await
        .unwrap();

    let record = out[0].as_ref().unwrap();
    assert_eq!(record.association("comments"), &AssociationValue::Many(vec![]));
    assert_eq!(record.association("cover"), &AssociationValue::none());
    assert_eq!(record.association("author"), &AssociationValue::none());
}

/// Configuration errors surface before any fetch happens.
#[tokio::test]
async fn test_unknown_association_error() {
    let preloader = Preloader::new(MemorySource::new(blog_schema()));
    let err = preloader
        .preload(vec![Some(post(1, 7))], "reactions")
        .await
        .unwrap_err();
    assert!(matches!(err, PreloadError::UnknownAssociation { .. }));
}

/// A failing fetcher propagates its error unchanged through the engine.
#[tokio::test]
async fn test_fetch_error_propagation() {
    struct FailingSource(AssociationMap);

    impl AssociationReflect for FailingSource {
        fn describe(&self, entity: &str, f: &str) -> Option<&AssociationDescriptor> {
            self.0.describe(entity, f)
        }
    }

    #[async_trait]
    impl BatchFetcher for FailingSource {
        async fn fetch(
            &self,
            _descriptor: &AssociationDescriptor,
            _keys: &BTreeSet<KeyValue>,
        ) -> FetchResult<Vec<Record>> {
            Err(FetchError::new("replica lag exceeded"))
        }
    }

    let preloader = Preloader::new(FailingSource(blog_schema()));
    let err = preloader
        .preload(vec![Some(post(1, 7))], "comments")
        .await
        .unwrap_err();

    match err {
        PreloadError::Fetch(fetch) => assert_eq!(fetch.message, "replica lag exceeded"),
        other => panic!("expected fetch error, got {other:?}"),
    }
}
