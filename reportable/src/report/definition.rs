//! Report definitions
//!
//! A `Report` supplies the base query, header labels and filename. A
//! `ReportDefinition` wraps one with caller state: filters, output target,
//! streaming mode and chunk size.

use std::sync::Arc;

use serde_json::Value;

use super::descriptor::{ReportDescriptor, StreamMode, join_path};
use super::error::ReportError;
use super::headers::HeaderMap;
use crate::core::config::ExportSettings;
use crate::filter::{Filter, FilterCollection};
use crate::query::{QueryError, QuerySource, compile};

/// A report type
///
/// `kind` and `arguments` must be enough for the registered factory to build
/// an equivalent report on a worker.
pub trait Report: Send + Sync {
    fn kind(&self) -> &str;

    /// Constructor arguments, stored in the descriptor
    fn arguments(&self) -> Value {
        Value::Null
    }

    /// Fresh, unfiltered query source
    fn query(&self) -> Result<Box<dyn QuerySource>, QueryError>;

    fn filename(&self) -> String;

    fn headers(&self) -> HeaderMap {
        HeaderMap::default()
    }

    /// Report-level chunk size, overriding the configured default
    fn chunk_size(&self) -> Option<usize> {
        None
    }
}

#[derive(Clone)]
pub struct ReportDefinition {
    report: Arc<dyn Report>,
    filters: FilterCollection,
    disk: Option<String>,
    directory: Option<String>,
    filename: Option<String>,
    mode: StreamMode,
    chunk_size: Option<usize>,
}

impl ReportDefinition {
    pub fn new(report: impl Report + 'static) -> Self {
        Self::from_arc(Arc::new(report))
    }

    pub fn from_arc(report: Arc<dyn Report>) -> Self {
        Self {
            report,
            filters: FilterCollection::new(),
            disk: None,
            directory: None,
            filename: None,
            mode: StreamMode::default(),
            chunk_size: None,
        }
    }

    pub fn with_filters(mut self, filters: FilterCollection) -> Self {
        self.filters = filters;
        self
    }

    pub fn add_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn to_disk(mut self, disk: impl Into<String>) -> Self {
        self.disk = Some(disk.into());
        self
    }

    pub fn to_path(mut self, directory: impl Into<String>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Fetch the whole result set in one query
    pub fn all_at_once(mut self) -> Self {
        self.mode = StreamMode::Bulk;
        self
    }

    pub fn chunked(mut self) -> Self {
        self.mode = StreamMode::Chunked;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size);
        self
    }

    pub fn report(&self) -> &dyn Report {
        self.report.as_ref()
    }

    pub fn filters(&self) -> &FilterCollection {
        &self.filters
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    pub fn headers(&self) -> HeaderMap {
        self.report.headers()
    }

    pub fn filename(&self) -> String {
        self.filename
            .clone()
            .unwrap_or_else(|| self.report.filename())
    }

    pub fn disk<'a>(&'a self, settings: &'a ExportSettings) -> &'a str {
        self.disk.as_deref().unwrap_or(&settings.disk)
    }

    pub fn directory<'a>(&'a self, settings: &'a ExportSettings) -> &'a str {
        self.directory.as_deref().unwrap_or(&settings.directory)
    }

    /// Batch size: explicit, then report-level, then configured; never zero
    pub fn chunk_size(&self, settings: &ExportSettings) -> usize {
        self.chunk_size
            .or_else(|| self.report.chunk_size())
            .unwrap_or(settings.chunk_size)
            .max(1)
    }

    /// Path of the artifact on its disk
    pub fn output_path(&self, settings: &ExportSettings) -> String {
        join_path(self.directory(settings), &self.filename())
    }

    /// Base query with every filter applied
    pub fn build_query(&self) -> Result<Box<dyn QuerySource>, ReportError> {
        let mut source = self.report.query()?;
        compile(source.as_mut(), &self.filters)?;
        Ok(source)
    }

    /// Freeze into a descriptor, resolving defaults from `settings`
    pub fn descriptor(&self, settings: &ExportSettings) -> ReportDescriptor {
        ReportDescriptor {
            kind: self.report.kind().to_string(),
            arguments: self.report.arguments(),
            filters: self.filters.all().to_vec(),
            filter_group: self.filters.group().map(str::to_string),
            disk: self.disk(settings).to_string(),
            directory: self.directory(settings).to_string(),
            filename: self.filename(),
            mode: self.mode,
            chunk_size: self.chunk_size(settings),
        }
    }

    /// Rebuild from a descriptor around an already constructed report
    pub fn restore(report: Arc<dyn Report>, descriptor: &ReportDescriptor) -> Self {
        Self {
            report,
            filters: descriptor.filter_collection(),
            disk: Some(descriptor.disk.clone()),
            directory: Some(descriptor.directory.clone()),
            filename: Some(descriptor.filename.clone()),
            mode: descriptor.mode,
            chunk_size: Some(descriptor.chunk_size),
        }
    }
}

impl std::fmt::Debug for ReportDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportDefinition")
            .field("kind", &self.report.kind())
            .field("filters", &self.filters)
            .field("disk", &self.disk)
            .field("directory", &self.directory)
            .field("mode", &self.mode)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}
