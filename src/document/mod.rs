//! CSV statement documents.
//!
//! A document is a sequence of blocks. Each block starts with a header row
//! naming an entity type and its columns, followed by data rows whose first
//! field is an action marker:
//!
//! ```text
//! Category, Name, Parent
//! +, Expenses,
//! +, Internet, Expenses
//! ```
//!
//! - `+` insert
//! - `-` delete
//! - `~` update
//!
//! A header column wrapped in braces (`{name}`) is a key column used to find
//! the entities an update or delete applies to.

pub mod group;
pub mod parser;
pub mod reader;
pub mod statement;

pub use group::{read_header_column, HeaderColumn, StatementGroup};
pub use parser::{Document, DocumentError, ParseOptions};
pub use reader::split_record;
pub use statement::{Action, SourceLocation, Statement, DELETE, INSERT, UPDATE};
