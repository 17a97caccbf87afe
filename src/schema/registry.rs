//! Type namespaces: resolving header type names to entity descriptors.

use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;

use super::error::{SchemaError, TypeResolutionError};
use super::loader::{load_schemas, parse_schema};
use super::types::{qualify, EntityType, SchemaFile};

/// Source of entity type descriptors for the block parser.
///
/// `name` is either qualified (`namespace.Type`, split on the last dot) or
/// bare, in which case it is looked up in `default_namespace`.
pub trait TypeNamespace {
    fn resolve_type(
        &self,
        name: &str,
        default_namespace: Option<&str>,
    ) -> Result<Arc<EntityType>, TypeResolutionError>;
}

/// Entity types grouped by namespace, loaded from schema files.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    namespaces: IndexMap<String, IndexMap<String, Arc<EntityType>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a schema file or directory and validate references.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let mut registry = Self::new();
        for schema in load_schemas(path)? {
            registry.add_schema(schema)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, SchemaError> {
        let mut registry = Self::new();
        registry.add_schema(parse_schema(yaml, "<inline>")?)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Add every entity of a schema file. Call [`validate`](Self::validate)
    /// once all files are in.
    pub fn add_schema(&mut self, schema: SchemaFile) -> Result<(), SchemaError> {
        let namespace = schema.namespace;
        for def in schema.entities {
            let ty = EntityType::from_def(&namespace, def)?;
            let types = self.namespaces.entry(namespace.clone()).or_default();
            if types.contains_key(ty.name()) {
                return Err(SchemaError::DuplicateEntity(ty.qualified_name()));
            }
            types.insert(ty.name().to_string(), Arc::new(ty));
        }
        Ok(())
    }

    /// Check that every reference names a known entity type.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for ty in self.types() {
            for field in ty.fields() {
                if let Some(reference) = &field.references {
                    self.resolve_type(&reference.entity, Some(ty.namespace()))
                        .map_err(|e| SchemaError::InvalidReference {
                            entity: ty.qualified_name(),
                            field: field.name.clone(),
                            reason: e.to_string(),
                        })?;
                }
            }
        }
        Ok(())
    }

    /// Look up a type by exact namespace and name.
    pub fn get(&self, namespace: &str, name: &str) -> Option<Arc<EntityType>> {
        self.namespaces.get(namespace)?.get(name).cloned()
    }

    /// Look up a type by its qualified name.
    pub fn get_qualified(&self, qualified: &str) -> Option<Arc<EntityType>> {
        let (namespace, name) = split_qualified(qualified);
        self.get(namespace, name)
    }

    pub fn types(&self) -> impl Iterator<Item = &Arc<EntityType>> {
        self.namespaces.values().flat_map(|types| types.values())
    }
}

impl TypeNamespace for SchemaRegistry {
    fn resolve_type(
        &self,
        name: &str,
        default_namespace: Option<&str>,
    ) -> Result<Arc<EntityType>, TypeResolutionError> {
        if name.contains('.') {
            let (namespace, bare) = split_qualified(name);
            let types = self.namespaces.get(namespace).ok_or_else(|| {
                TypeResolutionError::UnknownNamespace {
                    namespace: namespace.to_string(),
                    name: bare.to_string(),
                }
            })?;
            return types.get(bare).cloned().ok_or_else(|| TypeResolutionError::UnknownType {
                namespace: Some(namespace.to_string()),
                name: bare.to_string(),
            });
        }

        if let Some(namespace) = default_namespace {
            return self.get(namespace, name).ok_or_else(|| TypeResolutionError::UnknownType {
                namespace: Some(namespace.to_string()),
                name: name.to_string(),
            });
        }

        let mut matches: Vec<&Arc<EntityType>> =
            self.namespaces.values().filter_map(|types| types.get(name)).collect();
        match matches.len() {
            0 => Err(TypeResolutionError::UnknownType {
                namespace: None,
                name: name.to_string(),
            }),
            1 => Ok(matches.remove(0).clone()),
            _ => Err(TypeResolutionError::Ambiguous {
                name: name.to_string(),
                namespaces: matches.iter().map(|ty| qualify(ty.namespace(), ty.name())).collect(),
            }),
        }
    }
}

fn split_qualified(name: &str) -> (&str, &str) {
    name.rsplit_once('.').unwrap_or(("", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
namespace: model
entities:
  - name: Category
    fields:
      - name: name
        primary_key: true
      - name: parent_name
      - name: parent
        references:
          entity: Category
          via: parent_name
  - name: BankAccount
    fields:
      - name: account
        primary_key: true
"#;

    #[test]
    fn test_qualified_and_default_resolution() {
        let registry = SchemaRegistry::from_yaml_str(SCHEMA).unwrap();

        let ty = registry.resolve_type("model.Category", None).unwrap();
        assert_eq!(ty.name(), "Category");

        let ty = registry.resolve_type("BankAccount", Some("model")).unwrap();
        assert_eq!(ty.qualified_name(), "model.BankAccount");

        // bare name without default: unique match
        let ty = registry.resolve_type("Category", None).unwrap();
        assert_eq!(ty.namespace(), "model");
    }

    #[test]
    fn test_resolution_errors() {
        let registry = SchemaRegistry::from_yaml_str(SCHEMA).unwrap();

        assert!(matches!(
            registry.resolve_type("other.Category", None),
            Err(TypeResolutionError::UnknownNamespace { .. })
        ));
        assert!(matches!(
            registry.resolve_type("model.Budget", None),
            Err(TypeResolutionError::UnknownType { .. })
        ));
        assert!(matches!(
            registry.resolve_type("Category", Some("ledger")),
            Err(TypeResolutionError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_ambiguous_bare_name() {
        let mut registry = SchemaRegistry::from_yaml_str(SCHEMA).unwrap();
        registry
            .add_schema(
                parse_schema(
                    "namespace: ledger\nentities:\n  - name: Category\n    fields:\n      - name: code\n",
                    "ledger",
                )
                .unwrap(),
            )
            .unwrap();

        let err = registry.resolve_type("Category", None).unwrap_err();
        assert!(matches!(err, TypeResolutionError::Ambiguous { ref namespaces, .. } if namespaces.len() == 2));
        assert!(registry.resolve_type("ledger.Category", None).is_ok());
    }

    #[test]
    fn test_nested_namespace() {
        let registry = SchemaRegistry::from_yaml_str(
            "namespace: app.model\nentities:\n  - name: Tag\n    fields:\n      - name: label\n",
        )
        .unwrap();
        assert!(registry.resolve_type("app.model.Tag", None).is_ok());
        assert!(registry.get_qualified("app.model.Tag").is_some());
    }

    #[test]
    fn test_dangling_reference() {
        let err = SchemaRegistry::from_yaml_str(
            "namespace: m\nentities:\n  - name: A\n    fields:\n      - name: b_code\n      - name: b\n        references:\n          entity: B\n          via: b_code\n",
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidReference { .. }));
    }

    #[test]
    fn test_duplicate_entity() {
        let mut registry = SchemaRegistry::from_yaml_str(SCHEMA).unwrap();
        let err = registry.add_schema(parse_schema(SCHEMA, "again").unwrap()).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateEntity(_)));
    }
}
