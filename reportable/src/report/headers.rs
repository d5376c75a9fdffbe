//! Column to display-label mapping for the CSV header row

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered column → label mapping
///
/// Serializes as a JSON object, keeping insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Map<String, Value>", try_from = "Map<String, Value>")]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, label: impl Into<String>) -> Self {
        self.insert(column, label);
        self
    }

    /// Set the label for `column`, replacing any previous label in place
    pub fn insert(&mut self, column: impl Into<String>, label: impl Into<String>) {
        let column = column.into();
        let label = label.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = label,
            None => self.entries.push((column, label)),
        }
    }

    /// Display label for `column`, falling back to the column name
    pub fn label_for<'a>(&'a self, column: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, label)| label.as_str())
            .unwrap_or(column)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, l)| (c.as_str(), l.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = HeaderMap::new();
        for (column, label) in iter {
            map.insert(column, label);
        }
        map
    }
}

impl From<HeaderMap> for Map<String, Value> {
    fn from(headers: HeaderMap) -> Self {
        headers
            .entries
            .into_iter()
            .map(|(c, l)| (c, Value::String(l)))
            .collect()
    }
}

impl TryFrom<Map<String, Value>> for HeaderMap {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut headers = HeaderMap::new();
        for (column, label) in map {
            match label {
                Value::String(label) => headers.insert(column, label),
                other => return Err(format!("header label for '{}' must be a string, got {}", column, other)),
            }
        }
        Ok(headers)
    }
}
