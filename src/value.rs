//! Typed values produced by the literal parser and stored on entities.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A parsed literal or stored attribute value.
///
/// Serialized untagged so stored rows read as plain JSON. Dates serialize as
/// `YYYY-MM-DD` strings and come back as [`Value::Text`]; the schema coerces
/// them back into dates on load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// True for the empty text value, the only "blank" a literal can produce.
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Text(s) if s.is_empty())
    }

    /// Short kind name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::text("Casa").to_string(), "Casa");
        let d = NaiveDate::from_ymd_opt(2008, 11, 2).unwrap();
        assert_eq!(Value::Date(d).to_string(), "2008-11-02");
    }

    #[test]
    fn test_untagged_json() {
        let json = serde_json::to_string(&vec![
            Value::Int(1),
            Value::Float(6.49),
            Value::Bool(false),
            Value::text("x"),
        ])
        .unwrap();
        assert_eq!(json, r#"[1,6.49,false,"x"]"#);

        let back: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[0], Value::Int(1));
        assert_eq!(back[1], Value::Float(6.49));
        assert_eq!(back[3], Value::text("x"));
    }

    #[test]
    fn test_blank() {
        assert!(Value::text("").is_blank());
        assert!(!Value::text(" ").is_blank());
        assert!(!Value::Int(0).is_blank());
    }
}
