//! Addressing records nested inside container shapes.
//!
//! Query layers rarely hand back bare records: a row may be a tuple of a
//! record and an aggregate, or a list of such tuples. A [`PathSpec`] is a
//! closed sequence of typed index steps describing where the record sits
//! inside one of those shapes, and [`Container`] is the runtime shape
//! itself. Get and replace dispatch exhaustively on step kind.
//!
//! Path mistakes (an index out of range, a tuple step aimed at a list)
//! are contract violations in the caller-supplied path or shape. They
//! panic rather than returning a recoverable error.
//!
//! ```rust
//! use lodestone::{Container, KeyValue, PathSpec, Record};
//!
//! // (flag, [record, count])
//! let shape = Container::Tuple(vec![
//!     Container::Value(true.into()),
//!     Container::List(vec![
//!         Container::record(Record::new("post").field("id", 1)),
//!         Container::Value(7.into()),
//!     ]),
//! ]);
//!
//! let path = PathSpec::root().tuple(1).list(0);
//! let leaf = shape.extract(&path);
//! assert!(matches!(leaf, Container::Record(Some(_))));
//! ```

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::key::KeyValue;
use crate::record::Record;

/// One typed step into a container shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathStep {
    /// Index into a tuple.
    Tuple(usize),
    /// Index into a list.
    List(usize),
}

/// An ordered sequence of steps addressing a value inside a container.
///
/// The empty path addresses the container itself.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PathSpec {
    steps: SmallVec<[PathStep; 4]>,
}

impl PathSpec {
    /// The empty path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Append a tuple-index step.
    pub fn tuple(mut self, index: usize) -> Self {
        self.steps.push(PathStep::Tuple(index));
        self
    }

    /// Append a list-index step.
    pub fn list(mut self, index: usize) -> Self {
        self.steps.push(PathStep::List(index));
        self
    }

    /// Check if this is the empty path.
    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// The steps in order.
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }
}

impl FromIterator<PathStep> for PathSpec {
    fn from_iter<I: IntoIterator<Item = PathStep>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

/// A heterogeneous container shape holding records, opaque values, and
/// nested tuples/lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Container {
    /// A record slot (nil allowed).
    Record(Option<Record>),
    /// An opaque non-record value, carried through untouched.
    Value(KeyValue),
    /// A fixed-shape group of containers.
    Tuple(Vec<Container>),
    /// An ordered list of containers.
    List(Vec<Container>),
}

impl Container {
    /// Wrap a record.
    pub fn record(record: Record) -> Self {
        Self::Record(Some(record))
    }

    /// An empty record slot.
    pub fn nil() -> Self {
        Self::Record(None)
    }

    /// Walk `path` into this container and return the addressed value.
    ///
    /// # Panics
    /// Panics if a step's kind does not match the container at that
    /// depth, or if an index is out of range.
    pub fn extract(&self, path: &PathSpec) -> &Container {
        let mut current = self;
        for step in path.steps() {
            current = match (step, current) {
                (PathStep::Tuple(i), Container::Tuple(items)) => items
                    .get(*i)
                    .unwrap_or_else(|| panic!("tuple index {i} out of range (len {})", items.len())),
                (PathStep::List(i), Container::List(items)) => items
                    .get(*i)
                    .unwrap_or_else(|| panic!("list index {i} out of range (len {})", items.len())),
                (step, other) => panic!("path step {step:?} does not match container {other:?}"),
            };
        }
        current
    }

    /// Extract the record slot addressed by `path`.
    ///
    /// # Panics
    /// Panics under the same conditions as [`extract`](Self::extract),
    /// or if the addressed value is not a record slot.
    pub fn extract_record(&self, path: &PathSpec) -> Option<Record> {
        match self.extract(path) {
            Container::Record(slot) => slot.clone(),
            other => panic!("path does not address a record slot: {other:?}"),
        }
    }

    /// Return a copy of this container with the value at `path` replaced.
    ///
    /// The empty path returns `value` directly.
    ///
    /// # Panics
    /// Panics if a step's kind does not match the container at that
    /// depth, or if an index is out of range.
    pub fn replace(self, path: &PathSpec, value: Container) -> Container {
        replace_at(self, path.steps(), value)
    }
}

fn replace_at(container: Container, steps: &[PathStep], value: Container) -> Container {
    let Some((step, rest)) = steps.split_first() else {
        return value;
    };
    match (step, container) {
        (PathStep::Tuple(i), Container::Tuple(mut items)) => {
            assert!(*i < items.len(), "tuple index {i} out of range (len {})", items.len());
            let inner = std::mem::replace(&mut items[*i], Container::nil());
            items[*i] = replace_at(inner, rest, value);
            Container::Tuple(items)
        }
        (PathStep::List(i), Container::List(mut items)) => {
            assert!(*i < items.len(), "list index {i} out of range (len {})", items.len());
            let inner = std::mem::replace(&mut items[*i], Container::nil());
            items[*i] = replace_at(inner, rest, value);
            Container::List(items)
        }
        (step, other) => panic!("path step {step:?} does not match container {other:?}"),
    }
}

/// Pair each new record with its original container and replace the slot
/// at `path`, preserving every other part of the shape.
///
/// # Panics
/// Panics if the two sequences differ in length, or on any path/shape
/// mismatch.
pub fn unextract(
    new_records: Vec<Option<Record>>,
    originals: Vec<Container>,
    path: &PathSpec,
) -> Vec<Container> {
    assert_eq!(
        new_records.len(),
        originals.len(),
        "record and container sequences must be the same length"
    );
    new_records
        .into_iter()
        .zip(originals)
        .map(|(record, original)| original.replace(path, Container::Record(record)))
        .collect()
}
