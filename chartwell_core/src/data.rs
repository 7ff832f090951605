// Copyright 2025 the Chartwell Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Data iterator boundary.

use alloc::string::String;

use serde::{Deserialize, Serialize};

use crate::surface::NodeId;

/// A cell value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Present but empty.
    Null,
    /// A number.
    Number(f64),
    /// A string.
    Str(String),
    /// A boolean.
    Bool(bool),
}

impl Value {
    /// Converts to a number; non-numeric values yield NaN.
    ///
    /// Numeric strings parse, booleans map to 0 and 1.
    #[must_use]
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Str(s) => s.trim().parse().unwrap_or(f64::NAN),
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Null => f64::NAN,
        }
    }

    /// Returns the string payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Derived per-point annotations cached on the iterator.
#[derive(Clone, Debug, PartialEq)]
pub enum MetaValue {
    /// A derived number (e.g. a pixel coordinate).
    Number(f64),
    /// A rendered shape.
    Node(NodeId),
    /// A derived flag (e.g. "missing").
    Bool(bool),
}

/// A restartable, finite row cursor.
///
/// The cursor starts before the first row; [`advance`](Self::advance) must be called before
/// reading.
pub trait DataIterator {
    /// Moves to the next row. Returns `false` past the end.
    fn advance(&mut self) -> bool;
    /// Moves back before the first row.
    fn reset(&mut self);
    /// Returns the current row index, if positioned on a row.
    fn index(&self) -> Option<usize>;
    /// Reads a field. `None` means the field is absent for this row, which differs from a
    /// present [`Value::Null`].
    fn get(&self, field: &str) -> Option<Value>;
    /// Reads a per-row annotation.
    fn meta(&self, field: &str) -> Option<MetaValue>;
    /// Writes a per-row annotation.
    fn set_meta(&mut self, field: &str, value: MetaValue);
    /// Returns the number of rows.
    fn row_count(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_number_handles_all_variants() {
        assert_eq!(Value::Number(2.5).to_number(), 2.5);
        assert_eq!(Value::from(" 7 ").to_number(), 7.0);
        assert_eq!(Value::Bool(true).to_number(), 1.0);
        assert!(Value::Null.to_number().is_nan());
        assert!(Value::from("abc").to_number().is_nan());
    }

    #[test]
    fn untagged_serde_round_trip() {
        let v: Value = serde_json::from_str("\"A\"").unwrap();
        assert_eq!(v, Value::from("A"));
        let n: Value = serde_json::from_str("3").unwrap();
        assert_eq!(n, Value::Number(3.0));
        let z: Value = serde_json::from_str("null").unwrap();
        assert_eq!(z, Value::Null);
    }
}
