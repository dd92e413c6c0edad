// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Numeric values flowing through the DAG

use crate::error::{EquationError, Result};
use nalgebra::DVector;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A scalar or a one-dimensional array of floats
///
/// Serializes as a bare number or a flat list of numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Array(DVector<f64>),
}

impl Value {
    pub fn array(values: impl IntoIterator<Item = f64>) -> Self {
        Value::Array(DVector::from_vec(values.into_iter().collect()))
    }

    pub fn len(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::Array(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Scalar(_))
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(s) => Some(*s),
            Value::Array(_) => None,
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        match self {
            Value::Scalar(s) => std::slice::from_ref(s),
            Value::Array(v) => v.as_slice(),
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.as_slice().to_vec()
    }

    /// Applies `f` elementwise.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Value {
        match self {
            Value::Scalar(s) => Value::Scalar(f(*s)),
            Value::Array(v) => Value::Array(v.map(f)),
        }
    }

    /// Combines two values elementwise, broadcasting scalars against arrays.
    ///
    /// Arrays of different length are rejected; `name` identifies the
    /// operation in the error.
    pub fn zip_with(&self, other: &Value, name: &str, f: impl Fn(f64, f64) -> f64) -> Result<Value> {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(f(*a, *b))),
            (Value::Scalar(a), Value::Array(b)) => Ok(Value::Array(b.map(|y| f(*a, y)))),
            (Value::Array(a), Value::Scalar(b)) => Ok(Value::Array(a.map(|x| f(x, *b)))),
            (Value::Array(a), Value::Array(b)) => {
                if a.len() != b.len() {
                    return Err(EquationError::Shape {
                        name: name.to_string(),
                        left: a.len(),
                        right: b.len(),
                    });
                }
                Ok(Value::Array(a.zip_map(b, f)))
            }
        }
    }

    /// Element-wise comparison within `epsilon`; NaN matches NaN.
    pub fn approx_eq(&self, other: &Value, epsilon: f64) -> bool {
        self.len() == other.len()
            && self
                .as_slice()
                .iter()
                .zip(other.as_slice())
                .all(|(a, b)| (a - b).abs() <= epsilon || (a.is_nan() && b.is_nan()))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Scalar(s) => serializer.serialize_f64(*s),
            Value::Array(v) => serializer.collect_seq(v.iter()),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Scalar(f64),
            Array(Vec<f64>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Scalar(s) => Value::Scalar(s),
            Repr::Array(v) => Value::from(v),
        })
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Scalar(0.0)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Scalar(value as f64)
    }
}

impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Value::Array(DVector::from_vec(value))
    }
}

impl From<&[f64]> for Value {
    fn from(value: &[f64]) -> Self {
        Value::Array(DVector::from_column_slice(value))
    }
}

impl From<DVector<f64>> for Value {
    fn from(value: DVector<f64>) -> Self {
        Value::Array(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(s) => write!(f, "{}", s),
            Value::Array(v) => {
                write!(f, "[")?;
                for (i, x) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", x)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Reduction applied when partition entries are collapsed into one value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    #[default]
    Sum,
    Product,
    Mean,
    Min,
    Max,
}

impl Reducer {
    pub fn name(&self) -> &'static str {
        match self {
            Reducer::Sum => "sum",
            Reducer::Product => "product",
            Reducer::Mean => "mean",
            Reducer::Min => "min",
            Reducer::Max => "max",
        }
    }

    /// Folds `values` elementwise into a single value.
    pub fn reduce<'a>(&self, values: impl IntoIterator<Item = &'a Value>) -> Result<Value> {
        let mut iter = values.into_iter();
        let Some(first) = iter.next() else {
            return Ok(Value::Scalar(match self {
                Reducer::Product => 1.0,
                _ => 0.0,
            }));
        };

        let mut acc = first.clone();
        let mut count = 1usize;
        for value in iter {
            count += 1;
            acc = match self {
                Reducer::Sum | Reducer::Mean => acc.zip_with(value, self.name(), |a, b| a + b)?,
                Reducer::Product => acc.zip_with(value, self.name(), |a, b| a * b)?,
                Reducer::Min => acc.zip_with(value, self.name(), f64::min)?,
                Reducer::Max => acc.zip_with(value, self.name(), f64::max)?,
            };
        }

        if *self == Reducer::Mean {
            let n = count as f64;
            acc = acc.map(|x| x / n);
        }
        Ok(acc)
    }
}

impl FromStr for Reducer {
    type Err = EquationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(Reducer::Sum),
            "product" => Ok(Reducer::Product),
            "mean" => Ok(Reducer::Mean),
            "min" => Ok(Reducer::Min),
            "max" => Ok(Reducer::Max),
            other => Err(EquationError::lookup(format!("reducer '{}'", other))),
        }
    }
}

/// Tags attached to a partition entry.
///
/// An empty set marks an untagged entry, which every tag selects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_untagged(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// True if a tag-scoped operator with `tag` applies to this entry
    pub fn selects(&self, tag: &str) -> bool {
        self.is_untagged() || self.contains(tag)
    }

    pub fn union(&self, other: &TagSet) -> TagSet {
        TagSet(self.0.union(&other.0).cloned().collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        TagSet(iter.into_iter().map(Into::into).collect())
    }
}

/// One evaluated partition entry
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub value: Value,
    pub tags: TagSet,
}

/// Result of evaluating a literal: a plain value, or one value per partition entry
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Value(Value),
    Parts(Vec<Part>),
}

impl Output {
    pub fn is_parts(&self) -> bool {
        matches!(self, Output::Parts(_))
    }

    /// Collapses partition entries with `reducer`; plain values pass through.
    pub fn collapse(self, reducer: Reducer) -> Result<Value> {
        match self {
            Output::Value(v) => Ok(v),
            Output::Parts(parts) => reducer.reduce(parts.iter().map(|p| &p.value)),
        }
    }
}

impl From<Value> for Output {
    fn from(value: Value) -> Self {
        Output::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_scalar_against_array() {
        let a = Value::Scalar(2.0);
        let b = Value::from(vec![1.0, 2.0, 3.0]);
        let r = a.zip_with(&b, "multiply", |x, y| x * y).unwrap();
        assert_eq!(r.to_vec(), vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_array_length_mismatch() {
        let a = Value::from(vec![1.0, 2.0]);
        let b = Value::from(vec![1.0, 2.0, 3.0]);
        let err = a.zip_with(&b, "add", |x, y| x + y).unwrap_err();
        assert!(matches!(err, EquationError::Shape { left: 2, right: 3, .. }));
    }

    #[test]
    fn test_reducers() {
        let values = [Value::Scalar(1.0), Value::Scalar(2.0), Value::Scalar(6.0)];
        assert_eq!(Reducer::Sum.reduce(&values).unwrap(), Value::Scalar(9.0));
        assert_eq!(Reducer::Product.reduce(&values).unwrap(), Value::Scalar(12.0));
        assert_eq!(Reducer::Mean.reduce(&values).unwrap(), Value::Scalar(3.0));
        assert_eq!(Reducer::Min.reduce(&values).unwrap(), Value::Scalar(1.0));
        assert_eq!(Reducer::Max.reduce(&values).unwrap(), Value::Scalar(6.0));
        assert_eq!("MEAN".parse::<Reducer>().unwrap(), Reducer::Mean);
        assert!("median".parse::<Reducer>().is_err());
    }

    #[test]
    fn test_json_shape() {
        assert_eq!(serde_json::to_string(&Value::Scalar(2.5)).unwrap(), "2.5");
        assert_eq!(serde_json::to_string(&Value::from(vec![1.0, 2.0])).unwrap(), "[1.0,2.0]");

        let parsed: Value = serde_json::from_str("[1, 2, 3]").unwrap();
        assert!(parsed.approx_eq(&Value::array([1.0, 2.0, 3.0]), 0.0));
        assert_eq!(serde_json::from_str::<Value>("4").unwrap(), Value::Scalar(4.0));
    }

    #[test]
    fn test_untagged_entries_are_selected_by_any_tag() {
        let untagged = TagSet::new();
        let tagged: TagSet = ["tag1"].into_iter().collect();
        assert!(untagged.selects("tag2"));
        assert!(tagged.selects("tag1"));
        assert!(!tagged.selects("tag2"));
    }
}
