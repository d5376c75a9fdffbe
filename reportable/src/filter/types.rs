//! Filter value type
//!
//! A `Filter` is one predicate: a column, a comparator and its operand. It is
//! immutable once built and serializes to the flat wire form
//! `{column, operator, value}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::comparator::Comparator;
use super::error::DecodeError;

/// A single filter predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "FilterMap", try_from = "FilterMap")]
pub struct Filter {
    column: String,
    comparator: Comparator,
    value: Option<Value>,
}

/// Wire form of a filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterMap {
    pub column: String,
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

impl Filter {
    /// Build a filter, validating the operand shape for the comparator
    ///
    /// Null comparators drop any supplied operand.
    pub fn make(
        column: impl Into<String>,
        comparator: Comparator,
        value: Option<Value>,
    ) -> Result<Self, DecodeError> {
        let column = column.into();
        if column.is_empty() {
            return Err(DecodeError::EmptyColumn);
        }

        if !comparator.requires_value() {
            return Ok(Self {
                column,
                comparator,
                value: None,
            });
        }

        let value = match value {
            None | Some(Value::Null) => {
                return Err(DecodeError::MissingValue {
                    column,
                    operator: comparator.as_str().to_string(),
                });
            }
            Some(v) => v,
        };

        let invalid = |reason: &str| DecodeError::InvalidOperand {
            column: column.clone(),
            operator: comparator.as_str().to_string(),
            reason: reason.to_string(),
        };

        match comparator {
            Comparator::In | Comparator::NotIn => {
                let Value::Array(items) = &value else {
                    return Err(invalid("expected a list"));
                };
                if !items.iter().all(is_scalar) {
                    return Err(invalid("list items must be scalars"));
                }
            }
            Comparator::Between => {
                let Value::Array(items) = &value else {
                    return Err(invalid("expected [min, max]"));
                };
                if items.len() != 2 {
                    return Err(invalid("expected exactly two bounds"));
                }
                if !items.iter().all(|v| is_scalar(v) && !v.is_null()) {
                    return Err(invalid("bounds must be non-null scalars"));
                }
            }
            _ => {
                if !is_scalar(&value) {
                    return Err(invalid("expected a scalar"));
                }
            }
        }

        Ok(Self {
            column,
            comparator,
            value: Some(value),
        })
    }

    pub fn equals(column: impl Into<String>, value: impl Into<Value>) -> Result<Self, DecodeError> {
        Self::make(column, Comparator::Equals, Some(value.into()))
    }

    pub fn not_equals(
        column: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Self, DecodeError> {
        Self::make(column, Comparator::NotEquals, Some(value.into()))
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Result<Self, DecodeError> {
        Self::make(column, Comparator::Gt, Some(value.into()))
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Result<Self, DecodeError> {
        Self::make(column, Comparator::Gte, Some(value.into()))
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Result<Self, DecodeError> {
        Self::make(column, Comparator::Lt, Some(value.into()))
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Result<Self, DecodeError> {
        Self::make(column, Comparator::Lte, Some(value.into()))
    }

    pub fn contains(
        column: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Self, DecodeError> {
        Self::make(column, Comparator::Contains, Some(value.into()))
    }

    pub fn not_contains(
        column: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Self, DecodeError> {
        Self::make(column, Comparator::NotContains, Some(value.into()))
    }

    pub fn starts_with(
        column: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Self, DecodeError> {
        Self::make(column, Comparator::StartsWith, Some(value.into()))
    }

    pub fn ends_with(
        column: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Self, DecodeError> {
        Self::make(column, Comparator::EndsWith, Some(value.into()))
    }

    pub fn in_list<I, V>(column: impl Into<String>, values: I) -> Result<Self, DecodeError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = values.into_iter().map(Into::into).collect();
        Self::make(column, Comparator::In, Some(Value::Array(list)))
    }

    pub fn not_in<I, V>(column: impl Into<String>, values: I) -> Result<Self, DecodeError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list = values.into_iter().map(Into::into).collect();
        Self::make(column, Comparator::NotIn, Some(Value::Array(list)))
    }

    /// Inclusive range filter
    pub fn between(
        column: impl Into<String>,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Result<Self, DecodeError> {
        Self::make(
            column,
            Comparator::Between,
            Some(Value::Array(vec![min.into(), max.into()])),
        )
    }

    pub fn is_null(column: impl Into<String>) -> Result<Self, DecodeError> {
        Self::make(column, Comparator::IsNull, None)
    }

    pub fn is_not_null(column: impl Into<String>) -> Result<Self, DecodeError> {
        Self::make(column, Comparator::IsNotNull, None)
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Operand list for `in` / `not_in`
    pub fn list(&self) -> Option<&[Value]> {
        match &self.value {
            Some(Value::Array(items)) if self.comparator.is_list() => Some(items),
            _ => None,
        }
    }

    /// `(min, max)` bounds for `between`
    pub fn range(&self) -> Option<(&Value, &Value)> {
        match &self.value {
            Some(Value::Array(items)) if self.comparator == Comparator::Between => {
                match items.as_slice() {
                    [min, max] => Some((min, max)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Decode from raw wire parts
    ///
    /// A missing list operand decodes as the empty list, since the query
    /// string form drops empty arrays.
    pub fn from_parts(column: &str, operator: &str, value: Value) -> Result<Self, DecodeError> {
        let comparator: Comparator = operator.parse()?;
        let value = match (comparator, value) {
            (Comparator::In | Comparator::NotIn, Value::Null) => Value::Array(Vec::new()),
            (_, value) => value,
        };
        Self::make(column, comparator, Some(value))
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("column".to_string(), Value::String(self.column.clone()));
        map.insert(
            "operator".to_string(),
            Value::String(self.comparator.as_str().to_string()),
        );
        map.insert(
            "value".to_string(),
            self.value.clone().unwrap_or(Value::Null),
        );
        map
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

impl From<Filter> for FilterMap {
    fn from(filter: Filter) -> Self {
        Self {
            column: filter.column,
            operator: filter.comparator.as_str().to_string(),
            value: filter.value.unwrap_or(Value::Null),
        }
    }
}

impl TryFrom<FilterMap> for Filter {
    type Error = DecodeError;

    fn try_from(map: FilterMap) -> Result<Self, Self::Error> {
        Filter::from_parts(&map.column, &map.operator, map.value)
    }
}
