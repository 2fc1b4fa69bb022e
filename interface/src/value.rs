//! # Field values
//!
//! [Value] is the type-erased payload exchanged with the process variable layer:
//! written into the dispatcher and published by the [Publisher](crate::Publisher)s.

use std::fmt::{self, Display};

/// Process variable value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Floats(Vec<f64>),
    Bools(Vec<bool>),
    Text(String),
}

impl Value {
    /// Returns the value as an integer
    ///
    /// Booleans and integral floats are accepted
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(x) if x.fract() == 0. => Some(*x as i64),
            _ => None,
        }
    }
    /// Returns the value as a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }
    /// Returns the value as a vector of floats
    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            Value::Floats(x) => Some(x.as_slice()),
            _ => None,
        }
    }
    /// Returns the value as a vector of booleans
    ///
    /// A vector of floats is converted with non-zero meaning `true`
    pub fn as_bools(&self) -> Option<Vec<bool>> {
        match self {
            Value::Bools(b) => Some(b.clone()),
            Value::Floats(x) => Some(x.iter().map(|x| *x != 0.).collect()),
            _ => None,
        }
    }
    /// Returns the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        self.as_int().map(|i| i != 0)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}
impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}
impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(value as i64)
    }
}
impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Int(value as i64)
    }
}
impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}
impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Value::Floats(value)
    }
}
impl From<&[f64]> for Value {
    fn from(value: &[f64]) -> Self {
        Value::Floats(value.to_vec())
    }
}
impl From<Vec<bool>> for Value {
    fn from(value: Vec<bool>) -> Self {
        Value::Bools(value)
    }
}
impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}
impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Floats(x) => write!(f, "[{} floats]", x.len()),
            Value::Bools(b) => write!(
                f,
                "[{}/{} enabled]",
                b.iter().filter(|b| **b).count(),
                b.len()
            ),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}
