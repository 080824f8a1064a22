//! Runtime values and their shapes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Shape of a [`Value`]. Fixed once at trace time; there is no shape polymorphism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Scalar,
    Vector(usize),
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar => write!(f, "f64"),
            Shape::Vector(len) => write!(f, "f64[{len}]"),
        }
    }
}

/// A scalar or a fixed-length sequence of doubles.
/// Uses Arc for the sequence to make Clone O(1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(f64),
    Vector(Arc<[f64]>),
}

impl Value {
    pub fn scalar(v: f64) -> Self {
        Value::Scalar(v)
    }

    pub fn vector(items: impl IntoIterator<Item = f64>) -> Self {
        Value::Vector(items.into_iter().collect())
    }

    pub fn shape(&self) -> Shape {
        match self {
            Value::Scalar(_) => Shape::Scalar,
            Value::Vector(items) => Shape::Vector(items.len()),
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Vector(_) => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[f64]> {
        match self {
            Value::Scalar(_) => None,
            Value::Vector(items) => Some(items),
        }
    }

    /// Bit patterns of every element, used to deduplicate constants.
    pub(crate) fn bit_key(&self) -> (Shape, Vec<u64>) {
        let bits = match self {
            Value::Scalar(v) => vec![v.to_bits()],
            Value::Vector(items) => items.iter().map(|v| v.to_bits()).collect(),
        };
        (self.shape(), bits)
    }

    #[cfg(feature = "json")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// A JSON number is a scalar, a JSON array of numbers a vector.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(items: Vec<f64>) -> Self {
        Value::Vector(items.into())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(v) => write!(f, "{v}"),
            Value::Vector(items) => {
                write!(f, "[")?;
                for (index, v) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Numeric semantics of the primitive operations.
pub mod ops {
    use super::*;
    use crate::error::{Error, Result};

    fn map(a: &Value, f: impl Fn(f64) -> f64) -> Value {
        match a {
            Value::Scalar(v) => Value::Scalar(f(*v)),
            Value::Vector(items) => Value::Vector(items.iter().map(|v| f(*v)).collect()),
        }
    }

    pub fn negate(a: &Value) -> Value {
        map(a, |v| -v)
    }

    pub fn tanh(a: &Value) -> Value {
        map(a, f64::tanh)
    }

    /// Elementwise `a - b`. Both operands must have the same shape; scalars do not broadcast.
    pub fn subtract(a: &Value, b: &Value) -> Result<Value> {
        match (a, b) {
            (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(a - b)),
            (Value::Vector(xs), Value::Vector(ys)) if xs.len() == ys.len() => Ok(Value::Vector(
                xs.iter().zip(ys.iter()).map(|(x, y)| x - y).collect(),
            )),
            _ => Err(Error::ShapeMismatch {
                expected: a.shape(),
                actual: b.shape(),
            }),
        }
    }
}
