//! Statement groups: one header block each.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use super::statement::{SourceLocation, Statement};
use crate::naming::NameResolution;
use crate::schema::EntityType;

static KEY_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{([^{}]+)\}$").expect("valid key marker pattern"));

/// How one header column was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderColumn {
    pub position: usize,
    pub attribute: String,
    /// Declared with `{}`
    pub is_key: bool,
}

/// Split a header column into its resolved attribute name and key flag.
pub fn read_header_column(position: usize, raw: &str, naming: &NameResolution) -> HeaderColumn {
    let raw = raw.trim();
    let (name, is_key) = match KEY_MARKER.captures(raw) {
        Some(captures) => (captures.get(1).map_or("", |m| m.as_str()), true),
        None => (raw, false),
    };
    HeaderColumn {
        position,
        attribute: naming.resolve(name),
        is_key,
    }
}

/// Type and column metadata of a header block plus its statements.
#[derive(Debug, Clone)]
pub struct StatementGroup {
    type_name: String,
    entity_type: Arc<EntityType>,
    key_columns: BTreeMap<usize, String>,
    attribute_columns: BTreeMap<usize, String>,
    has_primary_key: bool,
    primary_key_column: Option<(usize, String)>,
    statements: Vec<Statement>,
    location: SourceLocation,
}

impl StatementGroup {
    /// Classify the header columns against the resolved entity type.
    ///
    /// Explicit `{}` keys are authoritative. Only when none were declared is
    /// the entity's primary-key column promoted into the key columns.
    pub fn new(
        type_name: impl Into<String>,
        entity_type: Arc<EntityType>,
        columns: Vec<HeaderColumn>,
        location: SourceLocation,
    ) -> Self {
        let mut key_columns = BTreeMap::new();
        let mut attribute_columns = BTreeMap::new();
        let mut has_primary_key = false;
        let mut primary_key_column = None;

        for column in columns {
            if entity_type.is_primary_key_attribute(&column.attribute) {
                primary_key_column = Some((column.position, column.attribute.clone()));
                if column.is_key {
                    has_primary_key = true;
                }
            }
            if column.is_key {
                key_columns.insert(column.position, column.attribute);
            } else {
                attribute_columns.insert(column.position, column.attribute);
            }
        }

        if key_columns.is_empty() {
            if let Some((position, attribute)) = &primary_key_column {
                attribute_columns.remove(position);
                key_columns.insert(*position, attribute.clone());
                has_primary_key = true;
            }
        }

        Self {
            type_name: type_name.into(),
            entity_type,
            key_columns,
            attribute_columns,
            has_primary_key,
            primary_key_column,
            statements: Vec::new(),
            location,
        }
    }

    pub fn add_statement(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// Type name as written in the header.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.entity_type
    }

    pub fn key_columns(&self) -> &BTreeMap<usize, String> {
        &self.key_columns
    }

    pub fn attribute_columns(&self) -> &BTreeMap<usize, String> {
        &self.attribute_columns
    }

    /// True when the entity's primary key is one of the key columns, so
    /// lookups go by primary key.
    pub fn has_primary_key(&self) -> bool {
        self.has_primary_key
    }

    pub fn primary_key_column(&self) -> Option<(usize, &str)> {
        self.primary_key_column
            .as_ref()
            .map(|(position, name)| (*position, name.as_str()))
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }
}
