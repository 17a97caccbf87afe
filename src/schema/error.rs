//! Error types for schema loading, type resolution and attribute access.

use std::fmt;

use super::types::FieldType;

/// Error raised while loading or validating schema files
#[derive(Debug, Clone)]
pub enum SchemaError {
    Io { path: String, reason: String },
    Parse { path: String, reason: String },
    DuplicateEntity(String),
    DuplicateField { entity: String, field: String },
    MultiplePrimaryKeys { entity: String },
    InvalidGenerated { entity: String, field: String },
    InvalidReference { entity: String, field: String, reason: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Io { path, reason } => write!(f, "Failed to read schema {}: {}", path, reason),
            SchemaError::Parse { path, reason } => {
                write!(f, "Failed to parse schema {}: {}", path, reason)
            }
            SchemaError::DuplicateEntity(name) => write!(f, "Entity '{}' is declared twice", name),
            SchemaError::DuplicateField { entity, field } => {
                write!(f, "Entity '{}' declares field '{}' twice", entity, field)
            }
            SchemaError::MultiplePrimaryKeys { entity } => {
                write!(f, "Entity '{}' declares more than one primary key", entity)
            }
            SchemaError::InvalidGenerated { entity, field } => write!(
                f,
                "Field '{}.{}' is generated but not an integer primary key",
                entity, field
            ),
            SchemaError::InvalidReference { entity, field, reason } => {
                write!(f, "Invalid reference '{}.{}': {}", entity, field, reason)
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// A header names an entity type the namespace cannot provide
#[derive(Debug, Clone, PartialEq)]
pub enum TypeResolutionError {
    UnknownNamespace { namespace: String, name: String },
    UnknownType { namespace: Option<String>, name: String },
    Ambiguous { name: String, namespaces: Vec<String> },
}

impl fmt::Display for TypeResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeResolutionError::UnknownNamespace { namespace, name } => {
                write!(f, "Unknown namespace '{}' for type '{}'", namespace, name)
            }
            TypeResolutionError::UnknownType { namespace: Some(ns), name } => {
                write!(f, "Type '{}' not found in namespace '{}'", name, ns)
            }
            TypeResolutionError::UnknownType { namespace: None, name } => {
                write!(f, "Type '{}' not found in any namespace", name)
            }
            TypeResolutionError::Ambiguous { name, namespaces } => write!(
                f,
                "Type '{}' is declared in several namespaces ({}); qualify it",
                name,
                namespaces.join(", ")
            ),
        }
    }
}

impl std::error::Error for TypeResolutionError {}

/// Assigning or reading an attribute through an entity type failed
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeError {
    UnknownAttribute { entity: String, attribute: String },
    TypeMismatch {
        entity: String,
        attribute: String,
        expected: FieldType,
        found: String,
    },
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeError::UnknownAttribute { entity, attribute } => {
                write!(f, "Entity '{}' has no attribute '{}'", entity, attribute)
            }
            AttributeError::TypeMismatch { entity, attribute, expected, found } => write!(
                f,
                "Attribute '{}.{}' expects {}, got {}",
                entity, attribute, expected, found
            ),
        }
    }
}

impl std::error::Error for AttributeError {}
