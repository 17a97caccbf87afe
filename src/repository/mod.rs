//! Persistence collaborators.
//!
//! The execution engine talks to storage only through [`Repository`]:
//! key lookup, equality-conjunction search, staging adds and removals, and
//! committing. Two backends ship with the crate: [`MemoryRepository`] and the
//! file-backed [`JsonFileRepository`].

pub mod json_file;
pub mod memory;

use std::fmt;

use crate::entity::{Entity, RowId};
use crate::schema::EntityType;
use crate::value::Value;

pub use json_file::{snapshot_of, JsonFileRepository, StoreSnapshot};
pub use memory::MemoryRepository;

/// Error type for repository operations
#[derive(Debug, Clone, PartialEq)]
pub enum PersistenceError {
    DuplicateKey { entity: String, key: String },
    MissingKey { entity: String, attribute: String },
    NoPrimaryKey(String),
    NotFound { entity: String, id: RowId },
    UnknownType(String),
    Io { path: String, reason: String },
    Serialization(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::DuplicateKey { entity, key } => {
                write!(f, "Duplicate primary key {} for {}", key, entity)
            }
            PersistenceError::MissingKey { entity, attribute } => {
                write!(f, "Primary key '{}' of {} is not set", attribute, entity)
            }
            PersistenceError::NoPrimaryKey(entity) => {
                write!(f, "Entity {} has no primary key", entity)
            }
            PersistenceError::NotFound { entity, id } => {
                write!(f, "Row {} of {} no longer exists", id, entity)
            }
            PersistenceError::UnknownType(name) => write!(f, "Unknown entity type in store: {}", name),
            PersistenceError::Io { path, reason } => write!(f, "IO error on {}: {}", path, reason),
            PersistenceError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for PersistenceError {}

/// Equality conjunction over attribute names.
///
/// A `None` value matches instances where the attribute is unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    terms: Vec<(String, Option<Value>)>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, attribute: impl Into<String>, value: Option<Value>) -> Self {
        self.push(attribute, value);
        self
    }

    pub fn push(&mut self, attribute: impl Into<String>, value: Option<Value>) {
        self.terms.push((attribute.into(), value));
    }

    pub fn terms(&self) -> &[(String, Option<Value>)] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluate against an instance through its type's attribute interface.
    pub fn matches(&self, entity_type: &EntityType, entity: &Entity) -> bool {
        self.terms
            .iter()
            .all(|(attribute, value)| entity_type.get_attribute(entity, attribute) == value.as_ref())
    }
}

/// Storage backend consumed by the execution engine.
///
/// Values handed to `get_by_key` and inside predicates are already coerced
/// to the attribute's stored type. `add` of an instance that carries a
/// repository identity stages an update; without one it stages an insert.
/// Nothing is visible to reads until `commit`; a failed commit discards
/// everything staged.
pub trait Repository {
    fn get_by_key(&self, entity_type: &EntityType, key: &Value) -> Result<Option<Entity>, PersistenceError>;

    fn find(&self, entity_type: &EntityType, predicate: &Predicate) -> Result<Vec<Entity>, PersistenceError>;

    fn add(&mut self, entity_type: &EntityType, entity: Entity) -> Result<(), PersistenceError>;

    fn remove(&mut self, entity_type: &EntityType, entity: &Entity) -> Result<(), PersistenceError>;

    fn commit(&mut self) -> Result<(), PersistenceError>;

    /// Discard staged changes.
    fn rollback(&mut self);
}
