//! Statements: one data row each.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::value::Value;

pub const INSERT: &str = "+";
pub const DELETE: &str = "-";
pub const UPDATE: &str = "~";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Insert,
    Update,
    Delete,
}

impl Action {
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            INSERT => Some(Action::Insert),
            UPDATE => Some(Action::Update),
            DELETE => Some(Action::Delete),
            _ => None,
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            Action::Insert => INSERT,
            Action::Update => UPDATE,
            Action::Delete => DELETE,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Insert => write!(f, "insert"),
            Action::Update => write!(f, "update"),
            Action::Delete => write!(f, "delete"),
        }
    }
}

/// Where a row came from, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    /// 1-based line number
    pub line_number: usize,
    /// Trimmed fields re-joined with commas
    pub content: String,
}

impl SourceLocation {
    pub fn new(line_number: usize, fields: &[String]) -> Self {
        Self {
            line_number,
            content: fields.join(","),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line_number, self.content)
    }
}

/// An action plus the parsed value of each column, keyed by 1-based
/// position after the marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    action: Action,
    values: BTreeMap<usize, Value>,
    location: SourceLocation,
}

impl Statement {
    pub fn new(action: Action, values: BTreeMap<usize, Value>, location: SourceLocation) -> Self {
        Self {
            action,
            values,
            location,
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn values(&self) -> &BTreeMap<usize, Value> {
        &self.values
    }

    /// Value at a column position; a missing trailing field reads as empty text.
    pub fn value(&self, position: usize) -> Value {
        self.values
            .get(&position)
            .cloned()
            .unwrap_or_else(|| Value::text(""))
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }
}
