//! Entity type schema.
//!
//! Entity types are declared in YAML, one namespace per file:
//!
//! ```yaml
//! namespace: model
//! entities:
//!   - name: Category
//!     fields:
//!       - name: name
//!         primary_key: true
//!       - name: parent_name
//!       - name: parent
//!         references:
//!           entity: Category
//!           via: parent_name
//! ```
//!
//! [`SchemaRegistry`] resolves header type names through the
//! [`TypeNamespace`] trait; [`EntityType`] exposes the attribute capability
//! interface the execution engine works through.

pub mod error;
pub mod loader;
pub mod registry;
pub mod types;

pub use error::{AttributeError, SchemaError, TypeResolutionError};
pub use loader::{load_schema_file, load_schemas, parse_schema};
pub use registry::{SchemaRegistry, TypeNamespace};
pub use types::{EntityDef, EntityType, FieldDef, FieldType, ReferenceDef, SchemaFile};
