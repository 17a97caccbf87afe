//! Block parser.
//!
//! Rows are classified in this order:
//!
//! 1. empty row, empty first field, or first field starting with `#`: skipped
//! 2. first field `+`, `-` or `~`: a statement of the open group
//! 3. first field starting with a letter: a header opening a new group
//! 4. anything else: [`DocumentError::UnrecognizedRow`]

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use super::group::{read_header_column, StatementGroup};
use super::reader::split_record;
use super::statement::{Action, SourceLocation, Statement};
use crate::literal::LiteralParser;
use crate::naming::NameResolution;
use crate::schema::{TypeNamespace, TypeResolutionError};
use crate::value::Value;

/// Error raised while parsing a document. Any of these aborts the parse.
#[derive(Debug, Clone)]
pub enum DocumentError {
    Io { path: String, reason: String },
    /// A statement row appeared before any header
    Structure { location: SourceLocation },
    TypeResolution {
        location: SourceLocation,
        source: TypeResolutionError,
    },
    UnknownAttribute {
        location: SourceLocation,
        entity: String,
        attribute: String,
    },
    UnrecognizedRow { location: SourceLocation },
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::Io { path, reason } => write!(f, "Failed to read {}: {}", path, reason),
            DocumentError::Structure { location } => {
                write!(f, "Statement without a preceding header at {}", location)
            }
            DocumentError::TypeResolution { location, source } => {
                write!(f, "{} at {}", source, location)
            }
            DocumentError::UnknownAttribute { location, entity, attribute } => write!(
                f,
                "Entity '{}' has no attribute '{}' at {}",
                entity, attribute, location
            ),
            DocumentError::UnrecognizedRow { location } => {
                write!(f, "Unrecognized row at {}", location)
            }
        }
    }
}

impl std::error::Error for DocumentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DocumentError::TypeResolution { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Knobs for turning text into statement groups.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub literal_parser: LiteralParser,
    pub naming: NameResolution,
    /// Namespace for bare type names in headers
    pub default_namespace: Option<String>,
}

impl ParseOptions {
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = Some(namespace.into());
        self
    }

    pub fn with_literal_parser(mut self, parser: LiteralParser) -> Self {
        self.literal_parser = parser;
        self
    }

    pub fn with_naming(mut self, naming: NameResolution) -> Self {
        self.naming = naming;
        self
    }
}

/// Parsed statement groups in source order.
#[derive(Debug, Clone, Default)]
pub struct Document {
    groups: Vec<StatementGroup>,
}

impl Document {
    /// Parse document text.
    pub fn parse(
        text: &str,
        namespace: &dyn TypeNamespace,
        options: &ParseOptions,
    ) -> Result<Self, DocumentError> {
        Self::parse_lines(text.lines(), namespace, options)
    }

    /// Read and parse a file; invalid UTF-8 is replaced, not rejected.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        namespace: &dyn TypeNamespace,
        options: &ParseOptions,
    ) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| DocumentError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&String::from_utf8_lossy(&bytes), namespace, options)
    }

    pub fn parse_lines<'a, I>(
        lines: I,
        namespace: &dyn TypeNamespace,
        options: &ParseOptions,
    ) -> Result<Self, DocumentError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut groups: Vec<StatementGroup> = Vec::new();

        for (index, line) in lines.into_iter().enumerate() {
            let fields = split_record(line);
            let Some(first) = fields.first() else {
                continue;
            };
            if first.is_empty() || first.starts_with('#') {
                continue;
            }

            let location = SourceLocation::new(index + 1, &fields);

            if let Some(action) = Action::from_marker(first) {
                let group = groups
                    .last_mut()
                    .ok_or_else(|| DocumentError::Structure { location: location.clone() })?;
                group.add_statement(parse_statement(action, &fields, location, options));
            } else if first.chars().next().is_some_and(|c| c.is_alphabetic()) {
                let group = parse_header(&fields, location, namespace, options)?;
                tracing::debug!(
                    "Opened group {} at line {} (keys: {:?}, attributes: {:?})",
                    group.type_name(),
                    group.location().line_number,
                    group.key_columns(),
                    group.attribute_columns()
                );
                groups.push(group);
            } else {
                return Err(DocumentError::UnrecognizedRow { location });
            }
        }

        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[StatementGroup] {
        &self.groups
    }

    /// Number of statements across all groups.
    pub fn statement_count(&self) -> usize {
        self.groups.iter().map(|g| g.statements().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

fn parse_header(
    fields: &[String],
    location: SourceLocation,
    namespace: &dyn TypeNamespace,
    options: &ParseOptions,
) -> Result<StatementGroup, DocumentError> {
    let type_name = &fields[0];
    let entity_type = namespace
        .resolve_type(type_name, options.default_namespace.as_deref())
        .map_err(|source| DocumentError::TypeResolution {
            location: location.clone(),
            source,
        })?;

    let mut columns = Vec::new();
    for (index, raw) in fields.iter().enumerate().skip(1) {
        // blank header cells declare nothing
        if raw.is_empty() {
            continue;
        }
        let column = read_header_column(index, raw, &options.naming);
        if !entity_type.has_attribute(&column.attribute) {
            return Err(DocumentError::UnknownAttribute {
                location,
                entity: entity_type.qualified_name(),
                attribute: column.attribute,
            });
        }
        columns.push(column);
    }

    Ok(StatementGroup::new(type_name.clone(), entity_type, columns, location))
}

fn parse_statement(
    action: Action,
    fields: &[String],
    location: SourceLocation,
    options: &ParseOptions,
) -> Statement {
    let values: BTreeMap<usize, Value> = fields
        .iter()
        .enumerate()
        .skip(1)
        .map(|(position, field)| (position, options.literal_parser.parse(field)))
        .collect();
    Statement::new(action, values, location)
}
