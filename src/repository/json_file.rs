//! JSON-file backed repository.
//!
//! The store is one JSON object keyed by qualified type name, each holding
//! an array of row objects:
//!
//! ```json
//! { "budget.Category": [ { "name": "Expenses" } ] }
//! ```
//!
//! Rows are kept in a [`MemoryRepository`] and written back on every
//! successful commit through a temporary file and a rename. A commit whose
//! write fails is undone in memory as well.

use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{MemoryRepository, PersistenceError, Predicate, Repository};
use crate::entity::Entity;
use crate::schema::{EntityType, SchemaRegistry};
use crate::value::Value;

type StoreContents = IndexMap<String, Vec<IndexMap<String, Value>>>;

#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    inner: MemoryRepository,
}

impl JsonFileRepository {
    /// Open a store. A missing file is an empty store and is created on the
    /// first commit.
    pub fn open<P: AsRef<Path>>(path: P, registry: &SchemaRegistry) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let mut inner = MemoryRepository::new();

        if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
            let store: StoreContents = if contents.trim().is_empty() {
                StoreContents::new()
            } else {
                serde_json::from_str(&contents)
                    .map_err(|e| PersistenceError::Serialization(format!("{}: {}", path.display(), e)))?
            };

            for (type_name, rows) in store {
                let entity_type = registry
                    .get_qualified(&type_name)
                    .ok_or_else(|| PersistenceError::UnknownType(type_name.clone()))?;
                for row in rows {
                    let fields = entity_type
                        .coerce_row(row)
                        .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
                    inner.load_row(&entity_type, fields);
                }
            }
            tracing::debug!("Loaded store {}", path.display());
        }

        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Committed rows, in memory.
    pub fn memory(&self) -> &MemoryRepository {
        &self.inner
    }

    /// Committed rows of every type, in the on-disk layout.
    pub fn snapshot(&self) -> StoreSnapshot {
        snapshot_of(&self.inner)
    }

    fn flush(&self) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| io_error(&self.path, e))?;
        Ok(())
    }
}

/// Rows grouped by qualified type name.
pub type StoreSnapshot = IndexMap<String, Vec<Entity>>;

/// Clone the committed contents of a memory repository.
pub fn snapshot_of(repo: &MemoryRepository) -> StoreSnapshot {
    repo.type_names()
        .map(|name| {
            let rows: Vec<Entity> = repo.rows(name).into_iter().cloned().collect();
            (name.to_string(), rows)
        })
        .collect()
}

fn io_error(path: &Path, err: std::io::Error) -> PersistenceError {
    PersistenceError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

impl Repository for JsonFileRepository {
    fn get_by_key(&self, entity_type: &EntityType, key: &Value) -> Result<Option<Entity>, PersistenceError> {
        self.inner.get_by_key(entity_type, key)
    }

    fn find(&self, entity_type: &EntityType, predicate: &Predicate) -> Result<Vec<Entity>, PersistenceError> {
        self.inner.find(entity_type, predicate)
    }

    fn add(&mut self, entity_type: &EntityType, entity: Entity) -> Result<(), PersistenceError> {
        self.inner.add(entity_type, entity)
    }

    fn remove(&mut self, entity_type: &EntityType, entity: &Entity) -> Result<(), PersistenceError> {
        self.inner.remove(entity_type, entity)
    }

    fn commit(&mut self) -> Result<(), PersistenceError> {
        let mut previous = self.inner.clone();
        self.inner.commit()?;
        if let Err(err) = self.flush() {
            previous.rollback();
            self.inner = previous;
            return Err(err);
        }
        Ok(())
    }

    fn rollback(&mut self) {
        self.inner.rollback();
    }
}
