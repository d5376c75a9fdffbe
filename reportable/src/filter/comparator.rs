//! Comparator enumeration and its wire tokens

use std::fmt;
use std::str::FromStr;

use super::error::DecodeError;

/// Closed set of filter comparators
///
/// `as_str` yields the canonical wire token. Decoding also accepts the
/// symbolic aliases (`=`, `!=`, `>`, `>=`, `<`, `<=`) and `does_not_contain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Equals,
    NotEquals,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    Between,
    IsNull,
    IsNotNull,
}

impl Comparator {
    pub const ALL: [Comparator; 15] = [
        Comparator::Equals,
        Comparator::NotEquals,
        Comparator::Gt,
        Comparator::Gte,
        Comparator::Lt,
        Comparator::Lte,
        Comparator::Contains,
        Comparator::NotContains,
        Comparator::StartsWith,
        Comparator::EndsWith,
        Comparator::In,
        Comparator::NotIn,
        Comparator::Between,
        Comparator::IsNull,
        Comparator::IsNotNull,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Between => "between",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
        }
    }

    /// Whether the comparator carries an operand
    pub fn requires_value(&self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }

    /// Whether the operand is a list (`in`, `not_in`)
    pub fn is_list(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    /// Whether the comparator compiles to a LIKE pattern
    pub fn is_pattern(&self) -> bool {
        matches!(
            self,
            Self::Contains | Self::NotContains | Self::StartsWith | Self::EndsWith
        )
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparator {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" | "=" => Ok(Self::Equals),
            "not_equals" | "!=" => Ok(Self::NotEquals),
            "gt" | ">" => Ok(Self::Gt),
            "gte" | ">=" => Ok(Self::Gte),
            "lt" | "<" => Ok(Self::Lt),
            "lte" | "<=" => Ok(Self::Lte),
            "contains" => Ok(Self::Contains),
            "not_contains" | "does_not_contain" => Ok(Self::NotContains),
            "starts_with" => Ok(Self::StartsWith),
            "ends_with" => Ok(Self::EndsWith),
            "in" => Ok(Self::In),
            "not_in" => Ok(Self::NotIn),
            "between" => Ok(Self::Between),
            "is_null" => Ok(Self::IsNull),
            "is_not_null" => Ok(Self::IsNotNull),
            other => Err(DecodeError::UnknownOperator(other.to_string())),
        }
    }
}
