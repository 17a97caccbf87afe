//! Literal parser for the column fields of data rows.
//!
//! A [`LiteralParser`] holds an ordered table of pattern/handler rules and a
//! fallback. Rules are tried in table order, the first pattern that matches
//! decides the value, and the fallback handles everything else, so parsing
//! never fails.
//!
//! The table is assembled explicitly with [`LiteralParserBuilder`]. Extra
//! rules go in with [`LiteralParserBuilder::rule`] (appended) or
//! [`LiteralParserBuilder::insert_before`] (placed ahead of a named rule).

use chrono::NaiveDate;
use regex::{Captures, Regex};
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::value::Value;

pub const NUMBER_RULE: &str = "number";
pub const BOOLEAN_RULE: &str = "boolean";
pub const QUOTED_RULE: &str = "quoted";
pub const DATE_RULE: &str = "date";

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\s*\d+([.,]\d+)?$").expect("valid number pattern"));
static BOOLEAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:true|false)$").expect("valid boolean pattern"));
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^'").expect("valid quoted pattern"));
static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d?\d)[/.-](\d\d)[/.-](\d{4})$").expect("valid date pattern")
});

/// Error type for literal parser construction
#[derive(Debug, Clone)]
pub enum LiteralError {
    InvalidPattern { rule: String, reason: String },
    DuplicateRule(String),
    UnknownAnchor(String),
}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralError::InvalidPattern { rule, reason } => {
                write!(f, "Invalid pattern for literal rule '{}': {}", rule, reason)
            }
            LiteralError::DuplicateRule(name) => write!(f, "Literal rule already defined: {}", name),
            LiteralError::UnknownAnchor(name) => write!(f, "No literal rule named '{}'", name),
        }
    }
}

impl std::error::Error for LiteralError {}

/// Conversion applied to text matched by a rule's pattern.
///
/// Returning `None` rejects the match (for example `31/02/2008` matches the
/// date shape but is no calendar date) and hands the text to the fallback.
pub trait LiteralHandler: Send + Sync {
    fn convert(&self, text: &str, captures: &Captures<'_>) -> Option<Value>;
}

impl<F> LiteralHandler for F
where
    F: Fn(&str, &Captures<'_>) -> Option<Value> + Send + Sync,
{
    fn convert(&self, text: &str, captures: &Captures<'_>) -> Option<Value> {
        self(text, captures)
    }
}

/// Conversion for text no rule claimed.
pub type Fallback = Arc<dyn Fn(&str) -> Value + Send + Sync>;

/// One entry of the rule table.
#[derive(Clone)]
pub struct LiteralRule {
    name: String,
    pattern: Regex,
    handler: Arc<dyn LiteralHandler>,
}

impl LiteralRule {
    pub fn new(name: impl Into<String>, pattern: Regex, handler: impl LiteralHandler + 'static) -> Self {
        Self {
            name: name.into(),
            pattern,
            handler: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for LiteralRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiteralRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

/// Ordered rule table plus fallback. Immutable once built.
#[derive(Clone)]
pub struct LiteralParser {
    rules: Vec<LiteralRule>,
    fallback: Fallback,
}

impl LiteralParser {
    pub fn builder() -> LiteralParserBuilder {
        LiteralParserBuilder::new()
    }

    /// Numbers, booleans and `'`-quoted text; anything else stays raw text.
    pub fn basic() -> Self {
        LiteralParserBuilder::basic().build()
    }

    /// The basic rules plus day-first dates, with text normalization applied
    /// to quoted and fallback text.
    pub fn typed() -> Self {
        LiteralParserBuilder::typed().build()
    }

    /// Parse one column field.
    pub fn parse(&self, text: &str) -> Value {
        for rule in &self.rules {
            if let Some(captures) = rule.pattern.captures(text) {
                if let Some(value) = rule.handler.convert(text, &captures) {
                    return value;
                }
                break;
            }
        }
        (self.fallback)(text)
    }

    /// Rule names in the order they are tried.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}

impl Default for LiteralParser {
    fn default() -> Self {
        Self::basic()
    }
}

impl fmt::Debug for LiteralParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiteralParser")
            .field("rules", &self.rule_names())
            .finish()
    }
}

/// Builder that assembles a [`LiteralParser`] rule table in explicit order.
pub struct LiteralParserBuilder {
    rules: Vec<LiteralRule>,
    fallback: Fallback,
}

impl LiteralParserBuilder {
    /// Empty table with the raw-text fallback.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            fallback: Arc::new(|text: &str| Value::text(text)),
        }
    }

    pub fn basic() -> Self {
        let mut builder = Self::new();
        builder.rules.push(LiteralRule::new(NUMBER_RULE, NUMBER.clone(), parse_number));
        builder.rules.push(LiteralRule::new(BOOLEAN_RULE, BOOLEAN.clone(), parse_boolean));
        builder.rules.push(LiteralRule::new(QUOTED_RULE, QUOTED.clone(), parse_quoted));
        builder
    }

    pub fn typed() -> Self {
        let mut builder = Self::basic();
        for rule in builder.rules.iter_mut() {
            if rule.name == QUOTED_RULE {
                *rule = LiteralRule::new(QUOTED_RULE, QUOTED.clone(), parse_quoted_normalized);
            }
        }
        builder.rules.insert(0, LiteralRule::new(DATE_RULE, DATE.clone(), parse_date));
        builder.fallback = Arc::new(|text: &str| Value::Text(normalize_text(text)));
        builder
    }

    /// Append a rule after the ones already in the table.
    pub fn rule(mut self, rule: LiteralRule) -> Result<Self, LiteralError> {
        self.check_unique(rule.name())?;
        self.rules.push(rule);
        Ok(self)
    }

    /// Compile `pattern` and append it as a rule.
    pub fn pattern(
        self,
        name: &str,
        pattern: &str,
        handler: impl LiteralHandler + 'static,
    ) -> Result<Self, LiteralError> {
        let regex = Regex::new(pattern).map_err(|e| LiteralError::InvalidPattern {
            rule: name.to_string(),
            reason: e.to_string(),
        })?;
        self.rule(LiteralRule::new(name, regex, handler))
    }

    /// Place a rule directly ahead of the rule named `anchor`.
    pub fn insert_before(mut self, anchor: &str, rule: LiteralRule) -> Result<Self, LiteralError> {
        self.check_unique(rule.name())?;
        let index = self
            .rules
            .iter()
            .position(|r| r.name == anchor)
            .ok_or_else(|| LiteralError::UnknownAnchor(anchor.to_string()))?;
        self.rules.insert(index, rule);
        Ok(self)
    }

    /// Replace the fallback applied to text no rule claimed.
    pub fn fallback(mut self, fallback: impl Fn(&str) -> Value + Send + Sync + 'static) -> Self {
        self.fallback = Arc::new(fallback);
        self
    }

    pub fn build(self) -> LiteralParser {
        LiteralParser {
            rules: self.rules,
            fallback: self.fallback,
        }
    }

    fn check_unique(&self, name: &str) -> Result<(), LiteralError> {
        if self.rules.iter().any(|r| r.name == name) {
            return Err(LiteralError::DuplicateRule(name.to_string()));
        }
        Ok(())
    }
}

impl Default for LiteralParserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_number(text: &str, _captures: &Captures<'_>) -> Option<Value> {
    let literal: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if let Ok(i) = literal.parse::<i64>() {
        return Some(Value::Int(i));
    }
    // fractional or wider than i64; digit runs past f64 range stay text
    literal
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Value::Float)
}

fn parse_boolean(text: &str, _captures: &Captures<'_>) -> Option<Value> {
    Some(Value::Bool(text.eq_ignore_ascii_case("true")))
}

fn parse_quoted(text: &str, _captures: &Captures<'_>) -> Option<Value> {
    Some(Value::text(&text[1..]))
}

fn parse_quoted_normalized(text: &str, _captures: &Captures<'_>) -> Option<Value> {
    Some(Value::Text(normalize_text(&text[1..])))
}

fn parse_date(_text: &str, captures: &Captures<'_>) -> Option<Value> {
    let day: u32 = captures.get(1)?.as_str().parse().ok()?;
    let month: u32 = captures.get(2)?.as_str().parse().ok()?;
    let year: i32 = captures.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(Value::Date)
}

/// Drop byte-order marks and turn non-breaking spaces into plain spaces.
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '\u{feff}')
        .map(|c| match c {
            '\u{a0}' | '\u{202f}' => ' ',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_basic_parser() {
        let parser = LiteralParser::basic();

        assert_eq!(parser.parse("123"), Value::Int(123));
        assert_eq!(parser.parse("-3"), Value::Int(-3));
        assert_eq!(parser.parse("1.1"), Value::Float(1.1));
        assert_eq!(parser.parse("TRUE"), Value::Bool(true));
        assert_eq!(parser.parse("FALSE"), Value::Bool(false));
        assert_eq!(parser.parse("'123"), Value::text("123"));
        assert_eq!(parser.parse("wilson"), Value::text("wilson"));
        assert_eq!(parser.parse("01/01/2008"), Value::text("01/01/2008"));
    }

    #[test]
    fn test_typed_parser() {
        let parser = LiteralParser::typed();

        assert_eq!(parser.parse("123"), Value::Int(123));
        assert_eq!(parser.parse("01/01/2008"), date(2008, 1, 1));
        assert_eq!(parser.parse("2.11.2008"), date(2008, 11, 2));
        assert_eq!(parser.parse("04-11-2008"), date(2008, 11, 4));
        assert_eq!(parser.parse("'123"), Value::text("123"));
        assert_eq!(parser.parse("1.1"), Value::Float(1.1));
        assert_eq!(parser.parse("TRUE"), Value::Bool(true));
        assert_eq!(parser.parse("wilson"), Value::text("wilson"));
    }

    #[test]
    fn test_number_forms() {
        let parser = LiteralParser::basic();

        assert_eq!(parser.parse("6,49"), Value::Float(6.49));
        assert_eq!(parser.parse("- 5"), Value::Int(-5));
        assert_eq!(parser.parse("-0.5"), Value::Float(-0.5));
        assert_eq!(
            parser.parse("99999999999999999999"),
            Value::Float(99999999999999999999.0)
        );
        // no general expressions
        assert_eq!(parser.parse("1+1"), Value::text("1+1"));
        assert_eq!(parser.parse("1.2.3"), Value::text("1.2.3"));

        let too_wide = "9".repeat(400);
        assert_eq!(parser.parse(&too_wide), Value::text(too_wide.clone()));
        let too_wide_fraction = format!("{}.5", too_wide);
        assert_eq!(parser.parse(&too_wide_fraction), Value::text(too_wide_fraction.clone()));
    }

    #[test]
    fn test_boolean_is_whole_string() {
        let parser = LiteralParser::basic();

        assert_eq!(parser.parse("tRuE"), Value::Bool(true));
        assert_eq!(parser.parse("falsehood"), Value::text("falsehood"));
        assert_eq!(parser.parse("untrue"), Value::text("untrue"));
    }

    #[test]
    fn test_invalid_date_falls_back_to_text() {
        let parser = LiteralParser::typed();
        assert_eq!(parser.parse("31/02/2008"), Value::text("31/02/2008"));
    }

    #[test]
    fn test_quote_escapes_other_rules() {
        let parser = LiteralParser::typed();
        assert_eq!(parser.parse("'true"), Value::text("true"));
        assert_eq!(parser.parse("'01/01/2008"), Value::text("01/01/2008"));
        assert_eq!(parser.parse("'"), Value::text(""));
    }

    #[test]
    fn test_typed_fallback_normalizes() {
        let parser = LiteralParser::typed();
        assert_eq!(parser.parse("\u{feff}Casa\u{a0}Nova"), Value::text("Casa Nova"));
        assert_eq!(LiteralParser::basic().parse("a\u{a0}b"), Value::text("a\u{a0}b"));
    }

    #[test]
    fn test_typed_quoted_normalizes() {
        assert_eq!(LiteralParser::typed().parse("'a\u{a0}b"), Value::text("a b"));
        assert_eq!(LiteralParser::typed().parse("'\u{a0}42"), Value::text(" 42"));
        assert_eq!(LiteralParser::basic().parse("'a\u{a0}b"), Value::text("a\u{a0}b"));
    }

    #[test]
    fn test_rule_order() {
        assert_eq!(
            LiteralParser::basic().rule_names(),
            vec![NUMBER_RULE, BOOLEAN_RULE, QUOTED_RULE]
        );
        assert_eq!(
            LiteralParser::typed().rule_names(),
            vec![DATE_RULE, NUMBER_RULE, BOOLEAN_RULE, QUOTED_RULE]
        );
    }

    #[test]
    fn test_insert_before_takes_priority() {
        let parser = LiteralParserBuilder::basic()
            .insert_before(
                NUMBER_RULE,
                LiteralRule::new(
                    "zip",
                    Regex::new(r"^\d{5}$").unwrap(),
                    |text: &str, _c: &Captures<'_>| Some(Value::text(text)),
                ),
            )
            .unwrap()
            .build();

        assert_eq!(parser.rule_names()[0], "zip");
        assert_eq!(parser.parse("01234"), Value::text("01234"));
        assert_eq!(parser.parse("123"), Value::Int(123));
    }

    #[test]
    fn test_custom_rule_and_fallback() {
        let parser = LiteralParserBuilder::new()
            .pattern("yes", r"(?i)^(yes|no)$", |text: &str, _c: &Captures<'_>| {
                Some(Value::Bool(text.eq_ignore_ascii_case("yes")))
            })
            .unwrap()
            .fallback(|text: &str| Value::text(text.to_uppercase()))
            .build();

        assert_eq!(parser.parse("Yes"), Value::Bool(true));
        assert_eq!(parser.parse("12"), Value::text("12"));
        assert_eq!(parser.parse("abc"), Value::text("ABC"));
    }

    #[test]
    fn test_builder_errors() {
        let err = LiteralParserBuilder::basic()
            .pattern(NUMBER_RULE, r"^x$", |_t: &str, _c: &Captures<'_>| None::<Value>)
            .err()
            .unwrap();
        assert!(matches!(err, LiteralError::DuplicateRule(_)));

        let err = LiteralParserBuilder::new()
            .pattern("bad", r"(", |_t: &str, _c: &Captures<'_>| None::<Value>)
            .err()
            .unwrap();
        assert!(matches!(err, LiteralError::InvalidPattern { .. }));

        let rule = LiteralRule::new("x", Regex::new("x").unwrap(), |_t: &str, _c: &Captures<'_>| None::<Value>);
        let err = LiteralParserBuilder::new().insert_before("missing", rule).err().unwrap();
        assert!(matches!(err, LiteralError::UnknownAnchor(_)));
    }
}
