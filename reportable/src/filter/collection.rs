//! Ordered filter collections and their serialized forms

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::DecodeError;
use super::query_string::{build_query, parse_query};
use super::types::Filter;
use crate::core::constants::DEFAULT_FILTER_GROUP;

/// Filter settings shared by every collection constructor
///
/// `default_group` names the query parameter collections serialize under when
/// they carry no group of their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub default_group: String,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            default_group: DEFAULT_FILTER_GROUP.to_string(),
        }
    }
}

/// Ordered sequence of filters, optionally namespaced under a group label
///
/// Order is preserved through every serialized form and is the order the
/// compiler applies predicates in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCollection {
    filters: Vec<Filter>,
    group: Option<String>,
}

impl FilterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn add(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn add_many(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn push(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Group key used for query serialization
    pub fn query_parameter<'a>(&'a self, settings: &'a FilterSettings) -> &'a str {
        self.group.as_deref().unwrap_or(&settings.default_group)
    }

    pub fn all(&self) -> &[Filter] {
        &self.filters
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn is_not_empty(&self) -> bool {
        !self.filters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Filter> {
        self.filters.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Filter> {
        self.filters.iter()
    }

    /// Filters on `column`, in insertion order
    pub fn for_column(&self, column: &str) -> Vec<&Filter> {
        self.filters
            .iter()
            .filter(|f| f.column() == column)
            .collect()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.filters.iter().any(|f| f.column() == column)
    }

    /// Concatenate two collections
    ///
    /// The result keeps `self`'s group label; `other`'s is discarded.
    pub fn merge(&self, other: &FilterCollection) -> FilterCollection {
        let mut filters = self.filters.clone();
        filters.extend(other.filters.iter().cloned());
        FilterCollection {
            filters,
            group: self.group.clone(),
        }
    }

    pub fn to_array(&self) -> Vec<Value> {
        self.filters
            .iter()
            .map(|f| Value::Object(f.to_map()))
            .collect()
    }

    pub fn to_json(&self) -> String {
        Value::Array(self.to_array()).to_string()
    }

    /// `{group: [...]}`, or an empty map when there are no filters
    pub fn to_query_array(&self, settings: &FilterSettings) -> Map<String, Value> {
        let mut map = Map::new();
        if self.is_not_empty() {
            map.insert(
                self.query_parameter(settings).to_string(),
                Value::Array(self.to_array()),
            );
        }
        map
    }

    pub fn to_query_string(&self, settings: &FilterSettings) -> String {
        if self.is_empty() {
            return String::new();
        }
        build_query(
            self.query_parameter(settings),
            &Value::Array(self.to_array()),
        )
    }

    /// Append the serialized filters to `url`
    pub fn append_to_url(&self, url: &str, settings: &FilterSettings) -> String {
        let query = self.to_query_string(settings);
        if query.is_empty() {
            return url.to_string();
        }
        let separator = if url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", url, separator, query)
    }

    /// Decode from an array of `{column, operator, value}` objects
    ///
    /// Entries without a usable `column` or `operator` are skipped. Entries
    /// that name both but fail to decode are errors.
    pub fn from_array(entries: &[Value], group: Option<&str>) -> Result<Self, DecodeError> {
        let mut filters = Vec::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            let Some(object) = entry.as_object() else {
                tracing::debug!(index, "Skipping non-object filter entry");
                continue;
            };
            let column = object.get("column").and_then(Value::as_str);
            let operator = object.get("operator").and_then(Value::as_str);
            let (Some(column), Some(operator)) = (column, operator) else {
                tracing::debug!(index, "Skipping filter entry without column or operator");
                continue;
            };
            if column.is_empty() || operator.is_empty() {
                tracing::debug!(index, "Skipping filter entry with empty column or operator");
                continue;
            }

            let value = object.get("value").cloned().unwrap_or(Value::Null);
            filters.push(Filter::from_parts(column, operator, value)?);
        }

        Ok(Self {
            filters,
            group: group.map(str::to_string),
        })
    }

    /// Decode from a JSON array
    ///
    /// Input that is not a JSON array yields an empty collection.
    pub fn from_json(json: &str, group: Option<&str>) -> Result<Self, DecodeError> {
        match serde_json::from_str::<Value>(json) {
            Ok(Value::Array(entries)) => Self::from_array(&entries, group),
            _ => Ok(Self {
                filters: Vec::new(),
                group: group.map(str::to_string),
            }),
        }
    }

    /// Decode from already-parsed request parameters
    ///
    /// Reads the `group` key, or the configured default group when `group` is
    /// `None`. A missing or non-list parameter yields an empty collection.
    pub fn from_params(
        params: &Map<String, Value>,
        group: Option<&str>,
        settings: &FilterSettings,
    ) -> Result<Self, DecodeError> {
        let key = group.unwrap_or(&settings.default_group);
        match params.get(key) {
            Some(Value::Array(entries)) => Self::from_array(entries, group),
            _ => Ok(Self {
                filters: Vec::new(),
                group: group.map(str::to_string),
            }),
        }
    }

    pub fn from_query_string(
        query: &str,
        group: Option<&str>,
        settings: &FilterSettings,
    ) -> Result<Self, DecodeError> {
        Self::from_params(&parse_query(query), group, settings)
    }
}

impl FromIterator<Filter> for FilterCollection {
    fn from_iter<T: IntoIterator<Item = Filter>>(iter: T) -> Self {
        Self {
            filters: iter.into_iter().collect(),
            group: None,
        }
    }
}

impl IntoIterator for FilterCollection {
    type Item = Filter;
    type IntoIter = std::vec::IntoIter<Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.into_iter()
    }
}

impl<'a> IntoIterator for &'a FilterCollection {
    type Item = &'a Filter;
    type IntoIter = std::slice::Iter<'a, Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.iter()
    }
}
