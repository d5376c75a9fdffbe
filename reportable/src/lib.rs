//! Declarative report filters and queue-driven CSV exports
//!
//! ## Architecture
//!
//! - `filter` - Filter DSL, collections and their wire forms
//! - `query` - Compiles filters onto a query source
//! - `report` - Report definitions, descriptors and the kind registry
//! - `export` - Export records, dispatch, execution and the queue worker
//! - `data` - SQLite record store, job queue and storage disks
//! - `core` - Configuration, CLI and shutdown
//!
//! ## Flow
//!
//! ```text
//! ReportDefinition -> ExportService::dispatch -> export record (dispatched) + queued job
//! ExportWorker -> ExportExecutor::run -> processing -> CSV on disk -> completed | failed
//! ```

pub mod app;
pub mod core;
pub mod data;
pub mod export;
pub mod filter;
pub mod query;
pub mod report;
pub mod utils;

pub use app::CoreApp;
pub use export::{ExportError, ExportRecord, ExportService, ExportStatus};
pub use filter::{Comparator, Filter, FilterCollection};
pub use report::{Report, ReportDefinition, ReportRegistry};
