//! Comma-separated record splitting.
//!
//! Fields may be wrapped in double quotes to carry commas; a doubled quote
//! inside a quoted field is a literal quote. Every field is trimmed.

/// Split one line into trimmed fields. An empty line yields no fields.
pub fn split_record(line: &str) -> Vec<String> {
    if line.trim().is_empty() {
        return Vec::new();
    }

    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            // a quote opens a quoted section only at the start of a field
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => {
                fields.push(field.trim().to_string());
                field.clear();
            }
            other => field.push(other),
        }
    }
    fields.push(field.trim().to_string());

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_fields() {
        assert_eq!(split_record("+, Expenses,"), vec!["+", "Expenses", ""]);
        assert_eq!(
            split_record("Category,Name, Parent"),
            vec!["Category", "Name", "Parent"]
        );
    }

    #[test]
    fn test_empty_line() {
        assert!(split_record("").is_empty());
        assert!(split_record("   ").is_empty());
        assert_eq!(split_record(","), vec!["", ""]);
    }

    #[test]
    fn test_quoted_fields() {
        assert_eq!(
            split_record(r#"+,"Canto, dos sonhos",200.0"#),
            vec!["+", "Canto, dos sonhos", "200.0"]
        );
        assert_eq!(
            split_record(r#"+, "say ""hi""" ,x"#),
            vec!["+", r#"say "hi""#, "x"]
        );
    }

    #[test]
    fn test_quote_inside_unquoted_field() {
        assert_eq!(split_record(r#"+,6" pipe,x"#), vec!["+", r#"6" pipe"#, "x"]);
    }
}
