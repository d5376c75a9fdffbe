//! Serializable report snapshot
//!
//! Captured at dispatch time and stored on the export record. A worker turns
//! it back into a live `ReportDefinition` through the `ReportRegistry`, so
//! later changes to the caller's definition never reach an in-flight export.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::{Filter, FilterCollection};

/// How rows are pulled from the query source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamMode {
    /// Fixed-size batches, progress persisted after each batch
    #[default]
    Chunked,
    /// One fetch of the whole result set
    Bulk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDescriptor {
    /// Registry key of the report type
    pub kind: String,
    /// Constructor arguments understood by the registered factory
    pub arguments: Value,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_group: Option<String>,
    pub disk: String,
    pub directory: String,
    pub filename: String,
    #[serde(default)]
    pub mode: StreamMode,
    pub chunk_size: usize,
}

impl ReportDescriptor {
    pub fn filter_collection(&self) -> FilterCollection {
        let collection = FilterCollection::new().add_many(self.filters.iter().cloned());
        match &self.filter_group {
            Some(group) => collection.with_group(group.clone()),
            None => collection,
        }
    }

    pub fn output_path(&self) -> String {
        join_path(&self.directory, &self.filename)
    }
}

/// Join a directory and filename with a single `/`
pub fn join_path(directory: &str, filename: &str) -> String {
    let directory = directory.trim_matches('/');
    if directory.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", directory, filename)
    }
}
