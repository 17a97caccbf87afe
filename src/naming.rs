//! Column name resolution for header rows.
//!
//! Header cells are written for humans (`Bank Account`); entity attributes
//! are identifiers (`bank_account`). A [`NameResolution`] maps one to the
//! other before a column is matched against the entity type.

use convert_case::{Case, Casing};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// How header column names become attribute names.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameResolution {
    /// `Bank Account` -> `bank_account`
    #[default]
    Simple,
    /// `Bank Account` -> `bankAccount`
    CamelCase,
    /// Trimmed, otherwise unchanged
    Verbatim,
    #[serde(skip)]
    Custom(fn(&str) -> String),
}

impl NameResolution {
    pub fn resolve(&self, column: &str) -> String {
        match self {
            NameResolution::Simple => simple(column),
            NameResolution::CamelCase => camel_case(column),
            NameResolution::Verbatim => column.trim().to_string(),
            NameResolution::Custom(f) => f(column),
        }
    }
}

impl FromStr for NameResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "simple" => Ok(NameResolution::Simple),
            "camel_case" | "camel" => Ok(NameResolution::CamelCase),
            "verbatim" => Ok(NameResolution::Verbatim),
            other => Err(format!(
                "Unknown naming '{}' (expected simple, camel_case or verbatim)",
                other
            )),
        }
    }
}

/// Lower-case, whitespace runs replaced by a single underscore.
pub fn simple(column: &str) -> String {
    let lowered = column.trim().to_lowercase();
    WHITESPACE.replace_all(&lowered, "_").into_owned()
}

/// Lower camel case over whitespace-separated words.
pub fn camel_case(column: &str) -> String {
    column.trim().to_lowercase().to_case(Case::Camel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert!(matches!("camel-case".parse::<NameResolution>(), Ok(NameResolution::CamelCase)));
        assert!(matches!("Simple".parse::<NameResolution>(), Ok(NameResolution::Simple)));
        assert!("snake".parse::<NameResolution>().is_err());
    }

    #[test]
    fn test_simple() {
        assert_eq!(simple("Category"), "category");
        assert_eq!(simple("Bank Account"), "bank_account");
        assert_eq!(simple("  Ledger \t Balance  Amount "), "ledger_balance_amount");
        assert_eq!(simple("parent_name"), "parent_name");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("Category"), "category");
        assert_eq!(camel_case("Bank Account"), "bankAccount");
        assert_eq!(camel_case("BANK ACCOUNT NUMBER"), "bankAccountNumber");
    }

    #[test]
    fn test_resolution_variants() {
        assert_eq!(NameResolution::Simple.resolve("Name"), "name");
        assert_eq!(NameResolution::Verbatim.resolve(" Name "), "Name");

        fn upper(s: &str) -> String {
            s.trim().to_uppercase()
        }
        assert_eq!(NameResolution::Custom(upper).resolve("name"), "NAME");
    }

    #[test]
    fn test_deserialize() {
        let n: NameResolution = serde_yaml::from_str("camel_case").unwrap();
        assert!(matches!(n, NameResolution::CamelCase));
        assert!(matches!(NameResolution::default(), NameResolution::Simple));
    }
}
