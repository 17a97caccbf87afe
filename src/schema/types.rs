//! Entity type definitions.
//!
//! [`SchemaFile`], [`EntityDef`] and [`FieldDef`] mirror the YAML layout.
//! [`EntityType`] is the validated descriptor handed to the block parser and
//! the execution engine; it is the only place that knows how an attribute
//! name maps onto stored fields.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{AttributeError, SchemaError};
use crate::entity::Entity;
use crate::value::Value;

/// Storage type of a field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    String,
    Integer,
    Float,
    Boolean,
    Date,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
        };
        write!(f, "{}", name)
    }
}

/// Reference to another entity, stored through a local foreign-key field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceDef {
    /// Target entity, bare (same namespace) or qualified
    pub entity: String,
    /// Local field holding the target's key
    pub via: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub primary_key: bool,
    /// Integer primary key assigned by the repository
    #[serde(default)]
    pub generated: bool,
    #[serde(default)]
    pub references: Option<ReferenceDef>,
    #[serde(default)]
    pub doc: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDef {
    pub name: String,
    #[serde(default)]
    pub doc: Option<String>,
    pub fields: Vec<FieldDef>,
}

/// One schema file: a namespace and the entities declared in it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaFile {
    #[serde(default)]
    pub namespace: String,
    pub entities: Vec<EntityDef>,
}

/// Validated entity type descriptor.
#[derive(Debug, Clone)]
pub struct EntityType {
    namespace: String,
    name: String,
    fields: IndexMap<String, FieldDef>,
    primary_key: Option<String>,
}

impl EntityType {
    /// Validate a definition and build its descriptor.
    ///
    /// Reference targets are checked later by the registry, once every
    /// namespace is loaded.
    pub fn from_def(namespace: &str, def: EntityDef) -> Result<Self, SchemaError> {
        let mut fields: IndexMap<String, FieldDef> = IndexMap::new();
        let mut primary_key = None;

        for field in def.fields {
            if fields.contains_key(&field.name) {
                return Err(SchemaError::DuplicateField {
                    entity: def.name.clone(),
                    field: field.name,
                });
            }
            if field.primary_key {
                if primary_key.is_some() {
                    return Err(SchemaError::MultiplePrimaryKeys { entity: def.name.clone() });
                }
                primary_key = Some(field.name.clone());
            }
            if field.generated && !(field.primary_key && field.field_type == FieldType::Integer) {
                return Err(SchemaError::InvalidGenerated {
                    entity: def.name.clone(),
                    field: field.name,
                });
            }
            fields.insert(field.name.clone(), field);
        }

        for field in fields.values() {
            let Some(reference) = &field.references else {
                continue;
            };
            let invalid = |reason: &str| SchemaError::InvalidReference {
                entity: def.name.clone(),
                field: field.name.clone(),
                reason: reason.to_string(),
            };
            match fields.get(&reference.via) {
                None => return Err(invalid(&format!("via field '{}' is not declared", reference.via))),
                Some(via) if via.references.is_some() => {
                    return Err(invalid(&format!("via field '{}' is itself a reference", reference.via)))
                }
                Some(_) => {}
            }
            if field.primary_key {
                return Err(invalid("a reference cannot be the primary key"));
            }
        }

        Ok(Self {
            namespace: namespace.to_string(),
            name: def.name,
            fields,
            primary_key,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `namespace.Name`, or the bare name in the root namespace.
    pub fn qualified_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.values()
    }

    pub fn primary_key(&self) -> Option<&FieldDef> {
        self.primary_key.as_ref().and_then(|pk| self.fields.get(pk))
    }

    pub fn is_primary_key_attribute(&self, name: &str) -> bool {
        self.primary_key.as_deref() == Some(name)
    }

    /// Convert `value` to what the attribute stores.
    ///
    /// `Ok(None)` means the attribute is left unset: empty text on anything
    /// but a plain string field.
    pub fn coerce_attribute(&self, name: &str, value: Value) -> Result<Option<Value>, AttributeError> {
        let (field, is_reference) = self.storage_field(name)?;
        if value.is_blank() && (is_reference || field.field_type != FieldType::String) {
            return Ok(None);
        }
        coerce(field.field_type, value).map(Some).map_err(|found| AttributeError::TypeMismatch {
            entity: self.qualified_name(),
            attribute: name.to_string(),
            expected: field.field_type,
            found,
        })
    }

    /// Assign an attribute on an instance of this type.
    pub fn set_attribute(&self, entity: &mut Entity, name: &str, value: Value) -> Result<(), AttributeError> {
        let target = self.storage_field(name)?.0.name.clone();
        match self.coerce_attribute(name, value)? {
            Some(value) => entity.set_field(target, value),
            None => {
                entity.unset_field(&target);
            }
        }
        Ok(())
    }

    /// Read an attribute from an instance of this type.
    pub fn get_attribute<'e>(&self, entity: &'e Entity, name: &str) -> Option<&'e Value> {
        let (field, _) = self.storage_field(name).ok()?;
        entity.field(&field.name)
    }

    /// Coerce every stored field of a loaded row, dropping undeclared ones.
    pub fn coerce_row(&self, row: IndexMap<String, Value>) -> Result<IndexMap<String, Value>, AttributeError> {
        let mut coerced = IndexMap::new();
        for (name, value) in row {
            match self.fields.get(&name) {
                Some(field) if field.references.is_none() => {
                    if let Some(value) = self.coerce_attribute(&name, value)? {
                        coerced.insert(name, value);
                    }
                }
                _ => {}
            }
        }
        Ok(coerced)
    }

    /// The stored field behind an attribute, and whether it was reached
    /// through a reference.
    fn storage_field(&self, name: &str) -> Result<(&FieldDef, bool), AttributeError> {
        let field = self.fields.get(name).ok_or_else(|| AttributeError::UnknownAttribute {
            entity: self.qualified_name(),
            attribute: name.to_string(),
        })?;
        match &field.references {
            Some(reference) => self
                .fields
                .get(&reference.via)
                .map(|via| (via, true))
                .ok_or_else(|| AttributeError::UnknownAttribute {
                    entity: self.qualified_name(),
                    attribute: reference.via.clone(),
                }),
            None => Ok((field, false)),
        }
    }
}

pub(crate) fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

fn coerce(field_type: FieldType, value: Value) -> Result<Value, String> {
    match (field_type, value) {
        (FieldType::String, Value::Text(s)) => Ok(Value::Text(s)),
        (FieldType::String, other) => Ok(Value::Text(other.to_string())),
        (FieldType::Integer, Value::Int(i)) => Ok(Value::Int(i)),
        (FieldType::Float, Value::Float(f)) => Ok(Value::Float(f)),
        (FieldType::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
        (FieldType::Boolean, Value::Bool(b)) => Ok(Value::Bool(b)),
        (FieldType::Date, Value::Date(d)) => Ok(Value::Date(d)),
        (FieldType::Date, Value::Text(s)) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|_| format!("text '{}'", s)),
        (_, other) => Err(format!("{} '{}'", other.kind(), other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category() -> EntityType {
        let def: EntityDef = serde_yaml::from_str(
            r#"
name: Category
fields:
  - name: name
    primary_key: true
  - name: parent_name
  - name: parent
    references:
      entity: Category
      via: parent_name
"#,
        )
        .unwrap();
        EntityType::from_def("model", def).unwrap()
    }

    fn entry() -> EntityType {
        let def: EntityDef = serde_yaml::from_str(
            r#"
name: BudgetEntry
fields:
  - name: id
    type: integer
    primary_key: true
    generated: true
  - name: name
  - name: date
    type: date
  - name: amount
    type: float
  - name: payed
    type: boolean
"#,
        )
        .unwrap();
        EntityType::from_def("model", def).unwrap()
    }

    #[test]
    fn test_descriptor() {
        let ty = category();
        assert_eq!(ty.qualified_name(), "model.Category");
        assert!(ty.is_primary_key_attribute("name"));
        assert!(!ty.is_primary_key_attribute("parent"));
        assert_eq!(
            ty.attribute_names().collect::<Vec<_>>(),
            vec!["name", "parent_name", "parent"]
        );
    }

    #[test]
    fn test_reference_writes_through() {
        let ty = category();
        let mut entity = Entity::new(ty.qualified_name());

        ty.set_attribute(&mut entity, "parent", Value::text("Expenses")).unwrap();
        assert_eq!(entity.field("parent_name"), Some(&Value::text("Expenses")));
        assert_eq!(ty.get_attribute(&entity, "parent"), Some(&Value::text("Expenses")));

        ty.set_attribute(&mut entity, "parent", Value::text("")).unwrap();
        assert_eq!(entity.field("parent_name"), None);
    }

    #[test]
    fn test_coercion() {
        let ty = entry();
        let date = NaiveDate::from_ymd_opt(2008, 11, 2).unwrap();

        assert_eq!(ty.coerce_attribute("amount", Value::Int(200)).unwrap(), Some(Value::Float(200.0)));
        assert_eq!(
            ty.coerce_attribute("date", Value::text("2008-11-02")).unwrap(),
            Some(Value::Date(date))
        );
        assert_eq!(ty.coerce_attribute("name", Value::Int(12)).unwrap(), Some(Value::text("12")));
        assert_eq!(ty.coerce_attribute("name", Value::text("")).unwrap(), Some(Value::text("")));
        assert_eq!(ty.coerce_attribute("amount", Value::text("")).unwrap(), None);

        let err = ty.coerce_attribute("payed", Value::text("yes")).unwrap_err();
        assert!(matches!(err, AttributeError::TypeMismatch { expected: FieldType::Boolean, .. }));

        let err = ty.coerce_attribute("missing", Value::Int(1)).unwrap_err();
        assert!(matches!(err, AttributeError::UnknownAttribute { .. }));
    }

    #[test]
    fn test_coerce_row_drops_undeclared() {
        let ty = entry();
        let mut row = IndexMap::new();
        row.insert("id".to_string(), Value::Int(1));
        row.insert("amount".to_string(), Value::Int(3));
        row.insert("legacy".to_string(), Value::text("x"));

        let coerced = ty.coerce_row(row).unwrap();
        assert_eq!(coerced.get("amount"), Some(&Value::Float(3.0)));
        assert!(!coerced.contains_key("legacy"));
    }

    #[test]
    fn test_validation() {
        let parse = |yaml: &str| {
            let def: EntityDef = serde_yaml::from_str(yaml).unwrap();
            EntityType::from_def("", def)
        };

        let err = parse("name: A\nfields:\n  - name: x\n  - name: x\n").unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { .. }));

        let err = parse(
            "name: A\nfields:\n  - name: x\n    primary_key: true\n  - name: y\n    primary_key: true\n",
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::MultiplePrimaryKeys { .. }));

        let err = parse("name: A\nfields:\n  - name: x\n    generated: true\n").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidGenerated { .. }));

        let err = parse(
            "name: A\nfields:\n  - name: p\n    references:\n      entity: A\n      via: missing\n",
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidReference { .. }));
    }
}
