//! JSON output for execution outcomes and stored rows.

use serde::Serialize;
use std::io::Write;

use crate::engine::ExecutionReport;
use crate::entity::Entity;

/// Error type for serialization operations
#[derive(Debug)]
pub enum SerializationError {
    JsonError(serde_json::Error),
    IoError(std::io::Error),
}

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        SerializationError::JsonError(err)
    }
}

impl From<std::io::Error> for SerializationError {
    fn from(err: std::io::Error) -> Self {
        SerializationError::IoError(err)
    }
}

impl std::fmt::Display for SerializationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerializationError::JsonError(e) => write!(f, "JSON error: {}", e),
            SerializationError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for SerializationError {}

/// NDJSON (Newline Delimited JSON) writer, one JSON object per line.
pub struct NdjsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> NdjsonWriter<W> {
    /// Create a new NDJSON writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write<T: Serialize>(&mut self, item: &T) -> Result<(), SerializationError> {
        let json = serde_json::to_string(item)?;
        writeln!(self.writer, "{}", json)?;
        Ok(())
    }

    pub fn write_all<T: Serialize>(&mut self, items: &[T]) -> Result<(), SerializationError> {
        for item in items {
            self.write(item)?;
        }
        Ok(())
    }

    /// Flush the underlying writer
    pub fn flush(&mut self) -> Result<(), SerializationError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Streams items into a single JSON array.
pub struct JsonArrayWriter<W: Write> {
    writer: W,
    first: bool,
}

impl<W: Write> JsonArrayWriter<W> {
    /// Create a new JSON array writer and write the opening bracket
    pub fn new(mut writer: W) -> Result<Self, SerializationError> {
        write!(writer, "[")?;
        Ok(Self {
            writer,
            first: true,
        })
    }

    pub fn write<T: Serialize>(&mut self, item: &T) -> Result<(), SerializationError> {
        if !self.first {
            write!(self.writer, ",")?;
        }
        self.first = false;

        let json = serde_json::to_string(item)?;
        write!(self.writer, "{}", json)?;
        Ok(())
    }

    /// Finish writing the array and close the bracket
    pub fn finish(mut self) -> Result<(), SerializationError> {
        write!(self.writer, "]")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Write one NDJSON line per statement outcome.
pub fn write_outcomes<W: Write>(writer: W, report: &ExecutionReport) -> Result<(), SerializationError> {
    let mut ndjson = NdjsonWriter::new(writer);
    ndjson.write_all(&report.outcomes)?;
    ndjson.flush()
}

/// Write rows as a JSON array of field objects.
pub fn write_entities<'a, W, I>(writer: W, entities: I) -> Result<(), SerializationError>
where
    W: Write,
    I: IntoIterator<Item = &'a Entity>,
{
    let mut array = JsonArrayWriter::new(writer)?;
    for entity in entities {
        array.write(entity)?;
    }
    array.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Action;
    use crate::engine::{ResolutionError, StatementError, StatementOutcome};
    use crate::value::Value;

    fn outcome(line_number: usize, error: Option<StatementError>) -> StatementOutcome {
        StatementOutcome {
            line_number,
            content: format!("+,row {}", line_number),
            action: Action::Insert,
            applied: if error.is_some() { 0 } else { 1 },
            error,
        }
    }

    #[test]
    fn test_write_outcomes() {
        let report = ExecutionReport {
            inserted: 1,
            total: 1,
            outcomes: vec![
                outcome(2, None),
                outcome(3, Some(StatementError::Resolution(ResolutionError::NoMatch))),
            ],
            ..Default::default()
        };

        let mut buf = Vec::new();
        write_outcomes(&mut buf, &report).unwrap();

        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["line_number"], 2);
        assert!(lines[0]["error"].is_null());
        assert_eq!(lines[1]["applied"], 0);
        assert!(lines[1]["error"].as_str().unwrap().contains("No stored entity"));
    }

    #[test]
    fn test_write_entities() {
        let mut first = Entity::new("budget.Category");
        first.set_field("name", Value::text("Expenses"));
        let mut second = Entity::new("budget.Category");
        second.set_field("name", Value::text("Internet"));
        second.set_field("parent_name", Value::text("Expenses"));

        let mut buf = Vec::new();
        write_entities(&mut buf, [&first, &second]).unwrap();

        let output = String::from_utf8(buf).unwrap();
        assert_eq!(
            output,
            r#"[{"name":"Expenses"},{"name":"Internet","parent_name":"Expenses"}]"#
        );
    }

    #[test]
    fn test_empty_array() {
        let mut buf = Vec::new();
        write_entities(&mut buf, std::iter::empty()).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "[]");
    }
}
