//! YAML schema loader.
//!
//! A schema path is either a single YAML file or a directory whose `.yaml`
//! and `.yml` files are loaded in file-name order.

use std::fs;
use std::path::{Path, PathBuf};

use super::error::SchemaError;
use super::types::SchemaFile;

/// Load every schema file under `path` (file or directory)
pub fn load_schemas<P: AsRef<Path>>(path: P) -> Result<Vec<SchemaFile>, SchemaError> {
    let path = path.as_ref();

    if path.is_dir() {
        let read_dir = fs::read_dir(path).map_err(|e| io_error(path, e))?;

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| io_error(path, e))?;
            let file = entry.path();
            if let Some(ext) = file.extension() {
                if ext == "yaml" || ext == "yml" {
                    files.push(file);
                }
            }
        }
        files.sort();

        files.iter().map(load_schema_file).collect()
    } else {
        Ok(vec![load_schema_file(path)?])
    }
}

/// Load a single schema file
pub fn load_schema_file<P: AsRef<Path>>(path: P) -> Result<SchemaFile, SchemaError> {
    let path = path.as_ref();

    let contents = fs::read_to_string(path).map_err(|e| io_error(path, e))?;

    parse_schema(&contents, &path.display().to_string())
}

/// Parse schema YAML; `origin` names the source in error messages
pub fn parse_schema(contents: &str, origin: &str) -> Result<SchemaFile, SchemaError> {
    serde_yaml::from_str(contents).map_err(|e| SchemaError::Parse {
        path: origin.to_string(),
        reason: e.to_string(),
    })
}

fn io_error(path: &Path, err: std::io::Error) -> SchemaError {
    SchemaError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CATEGORY: &str = r#"
namespace: model
entities:
  - name: Category
    fields:
      - name: name
        primary_key: true
"#;

    #[test]
    fn test_parse_schema() {
        let schema = parse_schema(CATEGORY, "inline").unwrap();
        assert_eq!(schema.namespace, "model");
        assert_eq!(schema.entities.len(), 1);
        assert_eq!(schema.entities[0].fields[0].name, "name");
    }

    #[test]
    fn test_parse_error_names_origin() {
        let err = parse_schema("entities: 3", "broken.yaml").unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.yaml"), CATEGORY).unwrap();
        fs::write(
            dir.path().join("a.yml"),
            "namespace: ledger\nentities:\n  - name: Account\n    fields:\n      - name: code\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let schemas = load_schemas(dir.path()).unwrap();
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0].namespace, "ledger");
        assert_eq!(schemas[1].namespace, "model");
    }

    #[test]
    fn test_missing_file() {
        let err = load_schemas("/nonexistent/schema.yaml").unwrap_err();
        assert!(matches!(err, SchemaError::Io { .. }));
    }
}
