//! Join key values.
//!
//! Associations are joined on column values, so the engine needs a value
//! type with a total order: the merge step walks two key-sorted sequences
//! in lockstep, and key sets are kept in ascending order. [`KeyValue`]
//! is the closed set of orderable column values the engine joins on.
//!
//! Floats are deliberately absent: `f64` has no total order. Callers
//! with float keys must map them to a string or integer representation
//! upstream.
//!
//! ```rust
//! use lodestone::KeyValue;
//!
//! let id: KeyValue = 42.into();
//! assert!(matches!(id, KeyValue::Int(42)));
//!
//! // Null never joins anything, including another Null.
//! assert!(KeyValue::Null.is_null());
//! assert!(KeyValue::Null < KeyValue::Int(0));
//! ```

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A join key value with a total order.
///
/// Ordering is by variant first (`Null < Bool < Int < String`), then by
/// value within the variant. The cross-variant ordering only matters for
/// keeping key sets sorted; real schemas join on a single column type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyValue {
    /// Absent value. A `Null` key matches no fetched row.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// String value.
    String(SmolStr),
}

impl KeyValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for KeyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for KeyValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for KeyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for KeyValue {
    fn from(v: &str) -> Self {
        Self::String(v.into())
    }
}

impl From<String> for KeyValue {
    fn from(v: String) -> Self {
        Self::String(v.into())
    }
}

impl From<SmolStr> for KeyValue {
    fn from(v: SmolStr) -> Self {
        Self::String(v)
    }
}

impl<T: Into<KeyValue>> From<Option<T>> for KeyValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
