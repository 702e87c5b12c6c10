//! Property values

use serde::{Deserialize, Serialize};
use std::fmt;

/// A property value read from a model or declared in a schema rule.
///
/// Deserializes untagged so schema files can list plain JSON/YAML scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Unset value (`$` in STEP, `null` in schema files)
    Null,
    /// Boolean value (`.T.` / `.F.`)
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real value
    Real(f64),
    /// Text value
    Text(String),
}

impl Value {
    /// Numeric view used by range rules.
    ///
    /// Text is parsed leniently, so `"12.5"` and `"12,5"` both yield 12.5.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            Value::Text(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<f64>()
                    .ok()
                    .or_else(|| trimmed.replace(',', ".").parse::<f64>().ok())
            }
            Value::Boolean(_) | Value::Null => None,
        }
    }

    /// Text view, if the value is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Equality used for enumeration membership.
    ///
    /// Numbers compare numerically across integer/real/numeric text, everything
    /// else compares by its rendered text.
    pub fn matches(&self, other: &Value) -> bool {
        if self == other {
            return true;
        }
        let numeric = |v: &Value| matches!(v, Value::Integer(_) | Value::Real(_));
        if numeric(self) || numeric(other) {
            if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
                return a == b;
            }
        }
        self.to_string() == other.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}
