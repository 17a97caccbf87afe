//! In-memory repository.
//!
//! Committed rows live in per-type tables keyed by qualified type name.
//! Adds and removals are staged and applied together on commit; if any
//! staged change fails validation the tables are restored and the staged
//! list is dropped.

use indexmap::IndexMap;
use std::collections::BTreeMap;

use super::{PersistenceError, Predicate, Repository};
use crate::entity::{Entity, RowId};
use crate::schema::{EntityType, FieldType};
use crate::value::Value;

/// Primary-key rules captured when a change is staged.
#[derive(Debug, Clone)]
struct KeyRule {
    field: Option<String>,
    generated: bool,
}

impl KeyRule {
    fn of(entity_type: &EntityType) -> Self {
        match entity_type.primary_key() {
            Some(pk) => Self {
                field: Some(pk.name.clone()),
                generated: pk.generated && pk.field_type == FieldType::Integer,
            },
            None => Self {
                field: None,
                generated: false,
            },
        }
    }
}

#[derive(Debug, Clone)]
enum Change {
    Insert { key: KeyRule, entity: Entity },
    Update { key: KeyRule, entity: Entity },
    Delete { type_name: String, id: RowId },
}

/// How to put a table back after a failed commit.
#[derive(Debug)]
enum Undo {
    Inserted { type_name: String, id: RowId, next_id: RowId, last_generated: i64 },
    Updated { type_name: String, previous: Entity },
    Deleted { type_name: String, previous: Entity },
}

#[derive(Debug, Clone, Default)]
struct Table {
    next_id: RowId,
    last_generated: i64,
    rows: BTreeMap<RowId, Entity>,
}

impl Table {
    fn store(&mut self, mut entity: Entity) -> RowId {
        let id = self.next_id;
        self.next_id += 1;
        entity.set_id(id);
        self.rows.insert(id, entity);
        id
    }

    fn key_taken(&self, field: &str, key: &Value, except: Option<RowId>) -> bool {
        self.rows
            .iter()
            .any(|(id, row)| Some(*id) != except && row.field(field) == Some(key))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    tables: IndexMap<String, Table>,
    staged: Vec<Change>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed rows of a type, in storage order.
    pub fn rows(&self, type_name: &str) -> Vec<&Entity> {
        self.tables
            .get(type_name)
            .map(|t| t.rows.values().collect())
            .unwrap_or_default()
    }

    pub fn count(&self, type_name: &str) -> usize {
        self.tables.get(type_name).map_or(0, |t| t.rows.len())
    }

    /// Qualified names of every type with a table.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|k| k.as_str())
    }

    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Store an already-persisted row directly, bypassing staging.
    pub fn load_row(&mut self, entity_type: &EntityType, fields: IndexMap<String, Value>) -> RowId {
        let table = self.tables.entry(entity_type.qualified_name()).or_default();
        if let Some(pk) = entity_type.primary_key() {
            if let Some(Value::Int(i)) = fields.get(&pk.name) {
                table.last_generated = table.last_generated.max(*i);
            }
        }
        table.store(Entity::with_fields(entity_type.qualified_name(), fields))
    }

    fn apply(&mut self, change: Change) -> Result<Undo, PersistenceError> {
        match change {
            Change::Insert { key, mut entity } => {
                let type_name = entity.type_name().to_string();
                let table = self.tables.entry(type_name.clone()).or_default();
                let next_id = table.next_id;
                let last_generated = table.last_generated;

                if let Some(field) = &key.field {
                    if key.generated && entity.field(field).is_none() {
                        table.last_generated += 1;
                        entity.set_field(field.clone(), Value::Int(table.last_generated));
                    }
                    check_key(table, &type_name, field, &entity, None)?;
                    if let Some(Value::Int(i)) = entity.field(field) {
                        table.last_generated = table.last_generated.max(*i);
                    }
                }

                let id = table.store(entity);
                Ok(Undo::Inserted { type_name, id, next_id, last_generated })
            }
            Change::Update { key, entity } => {
                let type_name = entity.type_name().to_string();
                let id = entity.id().ok_or_else(|| PersistenceError::NotFound {
                    entity: type_name.clone(),
                    id: 0,
                })?;
                let table = self
                    .tables
                    .get_mut(&type_name)
                    .ok_or_else(|| PersistenceError::NotFound { entity: type_name.clone(), id })?;
                if !table.rows.contains_key(&id) {
                    return Err(PersistenceError::NotFound { entity: type_name, id });
                }
                if let Some(field) = &key.field {
                    check_key(table, &type_name, field, &entity, Some(id))?;
                }
                let previous = table
                    .rows
                    .insert(id, entity)
                    .ok_or_else(|| PersistenceError::NotFound { entity: type_name.clone(), id })?;
                Ok(Undo::Updated { type_name, previous })
            }
            Change::Delete { type_name, id } => {
                let previous = self
                    .tables
                    .get_mut(&type_name)
                    .and_then(|t| t.rows.remove(&id))
                    .ok_or_else(|| PersistenceError::NotFound { entity: type_name.clone(), id })?;
                Ok(Undo::Deleted { type_name, previous })
            }
        }
    }

    fn undo(&mut self, undo: Undo) {
        match undo {
            Undo::Inserted { type_name, id, next_id, last_generated } => {
                if let Some(table) = self.tables.get_mut(&type_name) {
                    table.rows.remove(&id);
                    table.next_id = next_id;
                    table.last_generated = last_generated;
                }
            }
            Undo::Updated { type_name, previous } | Undo::Deleted { type_name, previous } => {
                if let (Some(table), Some(id)) = (self.tables.get_mut(&type_name), previous.id()) {
                    table.rows.insert(id, previous);
                }
            }
        }
    }

    fn table_rows<'a>(&'a self, entity_type: &EntityType) -> impl Iterator<Item = &'a Entity> + 'a {
        self.tables
            .get(&entity_type.qualified_name())
            .into_iter()
            .flat_map(|t| t.rows.values())
    }
}

fn check_key(
    table: &Table,
    type_name: &str,
    field: &str,
    entity: &Entity,
    except: Option<RowId>,
) -> Result<(), PersistenceError> {
    let key = entity.field(field).ok_or_else(|| PersistenceError::MissingKey {
        entity: type_name.to_string(),
        attribute: field.to_string(),
    })?;
    if table.key_taken(field, key, except) {
        return Err(PersistenceError::DuplicateKey {
            entity: type_name.to_string(),
            key: key.to_string(),
        });
    }
    Ok(())
}

impl Repository for MemoryRepository {
    fn get_by_key(&self, entity_type: &EntityType, key: &Value) -> Result<Option<Entity>, PersistenceError> {
        let pk = entity_type
            .primary_key()
            .ok_or_else(|| PersistenceError::NoPrimaryKey(entity_type.qualified_name()))?;
        Ok(self
            .table_rows(entity_type)
            .find(|row| row.field(&pk.name) == Some(key))
            .cloned())
    }

    fn find(&self, entity_type: &EntityType, predicate: &Predicate) -> Result<Vec<Entity>, PersistenceError> {
        Ok(self
            .table_rows(entity_type)
            .filter(|row| predicate.matches(entity_type, row))
            .cloned()
            .collect())
    }

    fn add(&mut self, entity_type: &EntityType, entity: Entity) -> Result<(), PersistenceError> {
        let key = KeyRule::of(entity_type);
        let change = if entity.id().is_some() {
            Change::Update { key, entity }
        } else {
            Change::Insert { key, entity }
        };
        self.staged.push(change);
        Ok(())
    }

    fn remove(&mut self, entity_type: &EntityType, entity: &Entity) -> Result<(), PersistenceError> {
        let id = entity.id().ok_or_else(|| PersistenceError::NotFound {
            entity: entity_type.qualified_name(),
            id: 0,
        })?;
        self.staged.push(Change::Delete {
            type_name: entity_type.qualified_name(),
            id,
        });
        Ok(())
    }

    fn commit(&mut self) -> Result<(), PersistenceError> {
        let staged = std::mem::take(&mut self.staged);
        let mut applied = Vec::with_capacity(staged.len());

        for change in staged {
            match self.apply(change) {
                Ok(undo) => applied.push(undo),
                Err(err) => {
                    for undo in applied.into_iter().rev() {
                        self.undo(undo);
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    fn rollback(&mut self) {
        self.staged.clear();
    }
}
