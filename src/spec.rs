//! Preload specifications.
//!
//! A [`PreloadSpec`] is what callers hand to the engine: a single field
//! name, a field with a nested sub-spec, or an ordered sequence mixing
//! both. Normalization turns it into an ordered forest of
//! [`PreloadNode`]s, rejecting a field named twice at the same level.
//!
//! ```rust
//! use lodestone::spec::{field, nested, normalize};
//!
//! // posts (with their comments and author), then profile
//! let spec = vec![
//!     nested("posts", [nested("comments", ["author"]), field("author")]),
//!     field("profile"),
//! ];
//!
//! let nodes = normalize(spec).unwrap();
//! assert_eq!(nodes.len(), 2);
//! assert_eq!(nodes[0].field, "posts");
//! assert_eq!(nodes[0].children.len(), 2);
//! assert!(nodes[1].children.is_empty());
//! ```

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::{PreloadError, PreloadResult};

/// A user-supplied association spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreloadSpec {
    /// A single association field (leaf).
    Field(SmolStr),
    /// An association field with a sub-spec for its rows.
    Nested(SmolStr, Box<PreloadSpec>),
    /// An ordered sequence of specs.
    Seq(Vec<PreloadSpec>),
}

impl From<&str> for PreloadSpec {
    fn from(field: &str) -> Self {
        Self::Field(field.into())
    }
}

impl From<SmolStr> for PreloadSpec {
    fn from(field: SmolStr) -> Self {
        Self::Field(field)
    }
}

impl<T: Into<PreloadSpec>> From<Vec<T>> for PreloadSpec {
    fn from(items: Vec<T>) -> Self {
        Self::Seq(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PreloadSpec>> FromIterator<T> for PreloadSpec {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::Seq(iter.into_iter().map(Into::into).collect())
    }
}

/// Create a leaf spec for a single association field.
pub fn field(name: impl Into<SmolStr>) -> PreloadSpec {
    PreloadSpec::Field(name.into())
}

/// Create a spec for a field with a nested sub-spec.
pub fn nested<T: Into<PreloadSpec>>(
    name: impl Into<SmolStr>,
    sub: impl IntoIterator<Item = T>,
) -> PreloadSpec {
    PreloadSpec::Nested(
        name.into(),
        Box::new(PreloadSpec::Seq(
            sub.into_iter().map(Into::into).collect(),
        )),
    )
}

/// One node of a normalized preload tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreloadNode {
    /// The association field to load.
    pub field: SmolStr,
    /// Sub-nodes applied to the fetched rows, in order.
    pub children: Vec<PreloadNode>,
}

impl PreloadNode {
    /// Create a leaf node.
    pub fn leaf(field: impl Into<SmolStr>) -> Self {
        Self {
            field: field.into(),
            children: Vec::new(),
        }
    }
}

/// Normalize a spec into an ordered forest of nodes.
///
/// A field named more than once at the same tree level is a
/// [`PreloadError::DuplicateField`].
pub fn normalize(spec: impl Into<PreloadSpec>) -> PreloadResult<Vec<PreloadNode>> {
    let mut nodes = Vec::new();
    collect(spec.into(), &mut nodes)?;
    Ok(nodes)
}

fn collect(spec: PreloadSpec, out: &mut Vec<PreloadNode>) -> PreloadResult<()> {
    match spec {
        PreloadSpec::Field(field) => push(out, PreloadNode::leaf(field)),
        PreloadSpec::Nested(field, sub) => {
            let mut children = Vec::new();
            collect(*sub, &mut children)?;
            push(out, PreloadNode { field, children })
        }
        PreloadSpec::Seq(items) => {
            for item in items {
                collect(item, out)?;
            }
            Ok(())
        }
    }
}

fn push(out: &mut Vec<PreloadNode>, node: PreloadNode) -> PreloadResult<()> {
    if out.iter().any(|existing| existing.field == node.field) {
        return Err(PreloadError::duplicate_field(node.field));
    }
    out.push(node);
    Ok(())
}
