use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::error::{DatabaseError, Result};

/// Column type tags as they appear in `<table>_schema.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int,
    Float,
    Bool,
    Str,
    Char,
}

impl DataType {
    /// Convert a textual field to a typed value, dispatched on the tag.
    pub fn parse(&self, raw: &str) -> Result<Value> {
        match self {
            DataType::Int => raw
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| self.conversion_error(raw)),
            DataType::Float => raw
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| self.conversion_error(raw)),
            DataType::Bool => {
                if raw.eq_ignore_ascii_case("true") {
                    Ok(Value::Bool(true))
                } else if raw.eq_ignore_ascii_case("false") {
                    Ok(Value::Bool(false))
                } else {
                    Err(self.conversion_error(raw))
                }
            }
            DataType::Str | DataType::Char => Ok(Value::Str(raw.to_string())),
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "int" => Some(DataType::Int),
            "float" => Some(DataType::Float),
            "bool" => Some(DataType::Bool),
            "str" => Some(DataType::Str),
            "char" => Some(DataType::Char),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Bool => "bool",
            DataType::Str => "str",
            DataType::Char => "char",
        }
    }

    fn conversion_error(&self, raw: &str) -> DatabaseError {
        DatabaseError::TypeConversion {
            value: raw.to_string(),
            target: self.as_str().to_string(),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field value decoded according to its declared column type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl Value {
    /// Integer view used by the nested condition form's relational
    /// operators. Non-integer values fail rather than coerce silently.
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            other => {
                other
                    .to_string()
                    .parse::<i64>()
                    .map_err(|_| DatabaseError::TypeConversion {
                        value: other.to_string(),
                        target: "int".to_string(),
                    })
            }
        }
    }
}

impl fmt::Display for Value {
    /// Canonical text, as stored in page files and the primary-key index.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
            _ => None, // Mixed types
        }
    }
}
