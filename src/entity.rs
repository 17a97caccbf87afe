//! Entity instances handled by the execution engine and repositories.
//!
//! An [`Entity`] is representation-neutral: a type name, an optional
//! repository identity and a map of stored field values. Reading and writing
//! attributes by name goes through the entity's
//! [`EntityType`](crate::schema::EntityType), which knows about references
//! and value coercion.

use indexmap::IndexMap;
use serde::Serialize;

use crate::value::Value;

/// Identity a repository assigns to a stored row.
pub type RowId = u64;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    #[serde(skip)]
    type_name: String,
    #[serde(skip)]
    id: Option<RowId>,
    #[serde(flatten)]
    fields: IndexMap<String, Value>,
}

impl Entity {
    /// A new, empty instance of the given (qualified) type, not yet stored.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
            fields: IndexMap::new(),
        }
    }

    pub fn with_fields(type_name: impl Into<String>, fields: IndexMap<String, Value>) -> Self {
        Self {
            type_name: type_name.into(),
            id: None,
            fields,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Repository identity; `None` until the instance has been stored.
    pub fn id(&self) -> Option<RowId> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: RowId) {
        self.id = Some(id);
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn unset_field(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(name)
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields() {
        let mut entity = Entity::new("model.Category");
        assert_eq!(entity.id(), None);

        entity.set_field("name", Value::text("Casa"));
        entity.set_field("parent_name", Value::text("Root"));
        assert_eq!(entity.field("name"), Some(&Value::text("Casa")));

        assert_eq!(entity.unset_field("parent_name"), Some(Value::text("Root")));
        assert_eq!(entity.field("parent_name"), None);
        assert_eq!(entity.fields().len(), 1);
    }

    #[test]
    fn test_serializes_fields_only() {
        let mut entity = Entity::new("model.Category");
        entity.set_id(7);
        entity.set_field("name", Value::text("Casa"));

        let json = serde_json::to_string(&entity).unwrap();
        assert_eq!(json, r#"{"name":"Casa"}"#);
    }
}
