//! Run configuration from csvdml.yaml, the environment and CLI flags.
//!
//! Every setting is taken from the first source that provides it:
//!
//! 1. CLI flag
//! 2. environment variable (`CSVDML_SCHEMA`, `CSVDML_STORE`,
//!    `CSVDML_NAMESPACE`, `CSVDML_FAN_OUT`)
//! 3. config file
//! 4. built-in default
//!
//! ```yaml
//! schema: schema/budget.yaml
//! store: data/budget.json
//! namespace: budget
//! naming: simple
//! parser: typed
//! fan_out: reject
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::document::ParseOptions;
use crate::engine::{ExecuteOptions, FanOutPolicy};
use crate::literal::LiteralParser;
use crate::naming::NameResolution;

pub const DEFAULT_CONFIG_FILE: &str = "csvdml.yaml";
pub const DEFAULT_SCHEMA_PATH: &str = "schema";

pub const ENV_SCHEMA: &str = "CSVDML_SCHEMA";
pub const ENV_STORE: &str = "CSVDML_STORE";
pub const ENV_NAMESPACE: &str = "CSVDML_NAMESPACE";
pub const ENV_FAN_OUT: &str = "CSVDML_FAN_OUT";

/// Which literal rule set to parse values with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserKind {
    /// Numbers, booleans, quoted text
    #[default]
    Basic,
    /// Adds day-month-year dates and text normalization
    Typed,
}

impl ParserKind {
    pub fn build(&self) -> LiteralParser {
        match self {
            ParserKind::Basic => LiteralParser::basic(),
            ParserKind::Typed => LiteralParser::typed(),
        }
    }
}

impl std::str::FromStr for ParserKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(ParserKind::Basic),
            "typed" => Ok(ParserKind::Typed),
            other => Err(format!("Unknown parser '{}' (expected basic or typed)", other)),
        }
    }
}

/// Contents of csvdml.yaml. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub schema: Option<PathBuf>,
    #[serde(default)]
    pub store: Option<PathBuf>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub naming: Option<NameResolution>,
    #[serde(default)]
    pub parser: Option<ParserKind>,
    #[serde(default)]
    pub fan_out: Option<FanOutPolicy>,
}

impl ConfigFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
    }

    /// Load `path` if given (it must exist), otherwise `csvdml.yaml` in the
    /// working directory when present.
    pub fn discover(path: Option<&Path>) -> Result<Option<Self>, String> {
        match path {
            Some(path) => Self::from_file(path).map(Some),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default).map(Some)
                } else {
                    Ok(None)
                }
            }
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub schema: Option<PathBuf>,
    pub store: Option<PathBuf>,
    pub namespace: Option<String>,
    pub naming: Option<NameResolution>,
    pub parser: Option<ParserKind>,
    pub fan_out: Option<FanOutPolicy>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub schema: PathBuf,
    /// No store means an in-memory repository
    pub store: Option<PathBuf>,
    pub namespace: Option<String>,
    pub naming: NameResolution,
    pub parser: ParserKind,
    pub fan_out: FanOutPolicy,
}

impl Settings {
    /// Resolve against the process environment.
    pub fn resolve(overrides: Overrides, file: Option<ConfigFile>) -> Result<Self, String> {
        Self::resolve_with(overrides, file, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with<F>(overrides: Overrides, file: Option<ConfigFile>, env: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = file.unwrap_or_default();
        let env_value = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let schema = overrides
            .schema
            .or_else(|| env_value(ENV_SCHEMA).map(PathBuf::from))
            .or(file.schema)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMA_PATH));

        let store = overrides
            .store
            .or_else(|| env_value(ENV_STORE).map(PathBuf::from))
            .or(file.store);

        let namespace = overrides
            .namespace
            .or_else(|| env_value(ENV_NAMESPACE))
            .or(file.namespace);

        let fan_out = match overrides.fan_out {
            Some(policy) => policy,
            None => match env_value(ENV_FAN_OUT) {
                Some(raw) => raw
                    .parse()
                    .map_err(|e| format!("Invalid {}: {}", ENV_FAN_OUT, e))?,
                None => file.fan_out.unwrap_or_default(),
            },
        };

        Ok(Self {
            schema,
            store,
            namespace,
            naming: overrides.naming.or(file.naming).unwrap_or_default(),
            parser: overrides.parser.or(file.parser).unwrap_or_default(),
            fan_out,
        })
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            literal_parser: self.parser.build(),
            naming: self.naming,
            default_namespace: self.namespace.clone(),
        }
    }

    pub fn execute_options(&self) -> ExecuteOptions {
        ExecuteOptions { fan_out: self.fan_out }
    }
}
