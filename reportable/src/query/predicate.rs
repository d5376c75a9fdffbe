//! Backend-neutral predicates
//!
//! A `Predicate` is what a `Filter` compiles to. Sources either render it to
//! SQL (`to_sql`) or evaluate it against in-process rows (`matches`).

use std::cmp::Ordering;

use serde_json::Value;

use super::source::Row;
use crate::utils::sql::{escape_like_pattern, quote_identifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::NotEq => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Gte => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
        }
    }
}

/// Where the wildcard goes in a LIKE pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAnchor {
    /// `%needle%`
    Contains,
    /// `needle%`
    StartsWith,
    /// `%needle`
    EndsWith,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    Like {
        column: String,
        needle: String,
        anchor: LikeAnchor,
        negated: bool,
    },
    In {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    Between {
        column: String,
        min: Value,
        max: Value,
    },
    Null {
        column: String,
        negated: bool,
    },
}

impl Predicate {
    pub fn column(&self) -> &str {
        match self {
            Self::Compare { column, .. } => column,
            Self::Like { column, .. } => column,
            Self::In { column, .. } => column,
            Self::Between { column, .. } => column,
            Self::Null { column, .. } => column,
        }
    }

    /// Render as a WHERE fragment with `?` placeholders, pushing bindings in order
    pub fn to_sql(&self, params: &mut Vec<Value>) -> String {
        let col = quote_identifier(self.column());
        match self {
            Self::Compare { op, value, .. } => {
                params.push(value.clone());
                format!("{} {} ?", col, op.as_sql())
            }
            Self::Like {
                needle,
                anchor,
                negated,
                ..
            } => {
                let escaped = escape_like_pattern(needle);
                let pattern = match anchor {
                    LikeAnchor::Contains => format!("%{}%", escaped),
                    LikeAnchor::StartsWith => format!("{}%", escaped),
                    LikeAnchor::EndsWith => format!("%{}", escaped),
                };
                params.push(Value::String(pattern));
                let keyword = if *negated { "NOT LIKE" } else { "LIKE" };
                format!("{} {} ? ESCAPE '\\'", col, keyword)
            }
            Self::In {
                values, negated, ..
            } => {
                if values.is_empty() {
                    // Nothing is a member of the empty set
                    return if *negated { "1 = 1" } else { "1 = 0" }.to_string();
                }
                let placeholders: Vec<&str> = values.iter().map(|_| "?").collect();
                params.extend(values.iter().cloned());
                let keyword = if *negated { "NOT IN" } else { "IN" };
                format!("{} {} ({})", col, keyword, placeholders.join(", "))
            }
            Self::Between { min, max, .. } => {
                params.push(min.clone());
                params.push(max.clone());
                format!("{} BETWEEN ? AND ?", col)
            }
            Self::Null { negated, .. } => {
                if *negated {
                    format!("{} IS NOT NULL", col)
                } else {
                    format!("{} IS NULL", col)
                }
            }
        }
    }

    /// Evaluate against an in-process row
    ///
    /// Follows SQL semantics: a NULL cell never satisfies a comparison,
    /// pattern, membership or range test. LIKE is ASCII case-insensitive.
    pub fn matches(&self, row: &Row) -> bool {
        let cell = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Self::Null { negated, .. } => cell.is_null() != *negated,
            Self::In {
                values, negated, ..
            } if values.is_empty() => *negated,
            _ if cell.is_null() => false,
            Self::Compare { op, value, .. } => {
                compare_values(cell, value).is_some_and(|ord| op.accepts(ord))
            }
            Self::Like {
                needle,
                anchor,
                negated,
                ..
            } => {
                let Some(text) = text_of(cell) else {
                    return false;
                };
                let haystack = text.to_ascii_lowercase();
                let needle = needle.to_ascii_lowercase();
                let found = match anchor {
                    LikeAnchor::Contains => haystack.contains(&needle),
                    LikeAnchor::StartsWith => haystack.starts_with(&needle),
                    LikeAnchor::EndsWith => haystack.ends_with(&needle),
                };
                found != *negated
            }
            Self::In {
                values, negated, ..
            } => {
                let member = values
                    .iter()
                    .any(|v| compare_values(cell, v) == Some(Ordering::Equal));
                member != *negated
            }
            Self::Between { min, max, .. } => {
                let above = compare_values(cell, min).is_some_and(|o| o != Ordering::Less);
                let below = compare_values(cell, max).is_some_and(|o| o != Ordering::Greater);
                above && below
            }
        }
    }
}

/// Order two scalars the way a loosely typed column would
///
/// Numeric text is compared numerically against numbers. Returns `None` for
/// NULLs and incomparable values.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => {
            let a = numeric(left)?;
            let b = numeric(right)?;
            a.partial_cmp(&b)
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_compare_to_sql() {
        let mut params = Vec::new();
        let predicate = Predicate::Compare {
            column: "age".to_string(),
            op: CompareOp::Gte,
            value: json!(18),
        };
        assert_eq!(predicate.to_sql(&mut params), "\"age\" >= ?");
        assert_eq!(params, vec![json!(18)]);
    }

    #[test]
    fn test_like_to_sql_escapes_needle() {
        let mut params = Vec::new();
        let predicate = Predicate::Like {
            column: "name".to_string(),
            needle: "50%_off".to_string(),
            anchor: LikeAnchor::Contains,
            negated: true,
        };
        assert_eq!(
            predicate.to_sql(&mut params),
            "\"name\" NOT LIKE ? ESCAPE '\\'"
        );
        assert_eq!(params, vec![json!("%50\\%\\_off%")]);

        let mut params = Vec::new();
        let predicate = Predicate::Like {
            column: "email".to_string(),
            needle: "admin".to_string(),
            anchor: LikeAnchor::StartsWith,
            negated: false,
        };
        predicate.to_sql(&mut params);
        assert_eq!(params, vec![json!("admin%")]);
    }

    #[test]
    fn test_in_to_sql() {
        let mut params = Vec::new();
        let predicate = Predicate::In {
            column: "role".to_string(),
            values: vec![json!("admin"), json!("editor")],
            negated: false,
        };
        assert_eq!(predicate.to_sql(&mut params), "\"role\" IN (?, ?)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_empty_in_to_sql() {
        let mut params = Vec::new();
        let in_empty = Predicate::In {
            column: "role".to_string(),
            values: vec![],
            negated: false,
        };
        let not_in_empty = Predicate::In {
            column: "role".to_string(),
            values: vec![],
            negated: true,
        };
        assert_eq!(in_empty.to_sql(&mut params), "1 = 0");
        assert_eq!(not_in_empty.to_sql(&mut params), "1 = 1");
        assert!(params.is_empty());
    }

    #[test]
    fn test_between_and_null_to_sql() {
        let mut params = Vec::new();
        let between = Predicate::Between {
            column: "age".to_string(),
            min: json!(18),
            max: json!(65),
        };
        assert_eq!(between.to_sql(&mut params), "\"age\" BETWEEN ? AND ?");
        assert_eq!(params, vec![json!(18), json!(65)]);

        let null = Predicate::Null {
            column: "deleted_at".to_string(),
            negated: true,
        };
        assert_eq!(null.to_sql(&mut params), "\"deleted_at\" IS NOT NULL");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_matches_compare() {
        let r = row(json!({"age": 30, "name": "Ann", "score": null}));
        let gte = |value: Value| Predicate::Compare {
            column: "age".to_string(),
            op: CompareOp::Gte,
            value,
        };
        assert!(gte(json!(30)).matches(&r));
        assert!(!gte(json!(31)).matches(&r));
        // Numeric text compares numerically
        assert!(gte(json!("18")).matches(&r));

        let not_eq_null = Predicate::Compare {
            column: "score".to_string(),
            op: CompareOp::NotEq,
            value: json!(1),
        };
        assert!(!not_eq_null.matches(&r));
    }

    #[test]
    fn test_matches_like_case_insensitive() {
        let r = row(json!({"email": "Ann@Example.com"}));
        let ends = Predicate::Like {
            column: "email".to_string(),
            needle: "@example.COM".to_string(),
            anchor: LikeAnchor::EndsWith,
            negated: false,
        };
        assert!(ends.matches(&r));

        let not_contains = Predicate::Like {
            column: "email".to_string(),
            needle: "ann".to_string(),
            anchor: LikeAnchor::Contains,
            negated: true,
        };
        assert!(!not_contains.matches(&r));
    }

    #[test]
    fn test_matches_in_between_null() {
        let r = row(json!({"role": "admin", "age": 40, "deleted_at": null}));
        let in_roles = Predicate::In {
            column: "role".to_string(),
            values: vec![json!("admin"), json!("editor")],
            negated: false,
        };
        assert!(in_roles.matches(&r));

        let between = Predicate::Between {
            column: "age".to_string(),
            min: json!(40),
            max: json!(65),
        };
        assert!(between.matches(&r));

        let is_null = Predicate::Null {
            column: "deleted_at".to_string(),
            negated: false,
        };
        assert!(is_null.matches(&r));

        // Absent columns read as NULL
        let missing = Predicate::Null {
            column: "nope".to_string(),
            negated: true,
        };
        assert!(!missing.matches(&r));
    }
}
