//! # csvdml: CSV statements against an entity store
//!
//! csvdml reads comma-separated documents made of header blocks and action
//! rows, and turns them into inserts, updates and deletes on a repository of
//! typed entities described in YAML.
//!
//! ## Example schema
//!
//! ```yaml
//! namespace: budget
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
//! ## Example document
//!
//! ```text
//! Category, Name, Parent
//! +, Expenses,
//! +, Internet, Expenses
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use csvdml::{Executor, MemoryRepository, ParseOptions, SchemaRegistry};
//!
//! let registry = SchemaRegistry::load("schema/budget.yaml").unwrap();
//! let mut repository = MemoryRepository::new();
//! let report = Executor::new(&mut repository)
//!     .run("Category,Name\n+,Expenses\n", &registry, &ParseOptions::default())
//!     .unwrap();
//! assert_eq!(report.counts(), (1, 0, 0, 1));
//! ```

pub mod config;
pub mod document;
pub mod engine;
pub mod entity;
pub mod literal;
pub mod naming;
pub mod repository;
pub mod schema;
pub mod serialization;
pub mod value;

pub use config::{ConfigFile, Overrides, ParserKind, Settings};
pub use document::{Action, Document, DocumentError, ParseOptions, Statement, StatementGroup};
pub use engine::{
    ExecuteOptions, ExecutionReport, Executor, FanOutPolicy, ResolutionError, StatementError,
    StatementOutcome,
};
pub use entity::{Entity, RowId};
pub use literal::{LiteralError, LiteralParser, LiteralParserBuilder, LiteralRule};
pub use naming::NameResolution;
pub use repository::{
    JsonFileRepository, MemoryRepository, PersistenceError, Predicate, Repository,
};
pub use schema::{
    AttributeError, EntityType, FieldType, SchemaError, SchemaRegistry, TypeNamespace,
    TypeResolutionError,
};
pub use serialization::{JsonArrayWriter, NdjsonWriter, SerializationError};
pub use value::Value;
