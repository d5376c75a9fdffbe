//! SQL utility functions

use serde_json::Value;

/// Escape SQL LIKE metacharacters (%, _, \) in user input
///
/// Patterns built from the escaped text must be paired with `ESCAPE '\'`.
///
/// # Example
///
/// ```
/// use reportable::utils::sql::escape_like_pattern;
///
/// let pattern = format!("%{}%", escape_like_pattern("100% match_test"));
/// assert_eq!(pattern, "%100\\% match\\_test%");
/// ```
pub fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Quote an identifier with double quotes, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a JSON scalar as an inline SQL literal
///
/// Only used for the human-readable rendering of compiled queries; execution
/// always goes through bound parameters.
pub fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

/// Substitute `?` placeholders with literal values
///
/// Placeholders inside single-quoted string literals are left alone. Extra
/// placeholders without a matching binding are kept verbatim.
pub fn interpolate(sql: &str, bindings: &[Value]) -> String {
    let mut out = String::with_capacity(sql.len() + bindings.len() * 8);
    let mut values = bindings.iter();
    let mut in_literal = false;

    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_literal = !in_literal;
                out.push(ch);
            }
            '?' if !in_literal => match values.next() {
                Some(value) => out.push_str(&sql_literal(value)),
                None => out.push(ch),
            },
            _ => out.push(ch),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_like_pattern_no_special_chars() {
        assert_eq!(escape_like_pattern("hello"), "hello");
    }

    #[test]
    fn test_escape_like_pattern_multiple() {
        assert_eq!(escape_like_pattern("100%_\\test"), "100\\%\\_\\\\test");
    }

    #[test]
    fn test_escape_like_pattern_empty() {
        assert_eq!(escape_like_pattern(""), "");
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("status"), "\"status\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_sql_literal() {
        assert_eq!(sql_literal(&json!(null)), "NULL");
        assert_eq!(sql_literal(&json!(true)), "1");
        assert_eq!(sql_literal(&json!(42)), "42");
        assert_eq!(sql_literal(&json!(1.5)), "1.5");
        assert_eq!(sql_literal(&json!("O'Brien")), "'O''Brien'");
    }

    #[test]
    fn test_interpolate_replaces_in_order() {
        let sql = "SELECT * FROM users WHERE status = ? AND age > ?";
        assert_eq!(
            interpolate(sql, &[json!("active"), json!(30)]),
            "SELECT * FROM users WHERE status = 'active' AND age > 30"
        );
    }

    #[test]
    fn test_interpolate_skips_quoted_placeholders() {
        let sql = "SELECT '?' AS q FROM t WHERE a = ?";
        assert_eq!(
            interpolate(sql, &[json!(1)]),
            "SELECT '?' AS q FROM t WHERE a = 1"
        );
    }

    #[test]
    fn test_interpolate_missing_binding_kept() {
        assert_eq!(interpolate("a = ? AND b = ?", &[json!(1)]), "a = 1 AND b = ?");
    }
}
