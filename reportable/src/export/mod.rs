//! Report exports
//!
//! ## Architecture
//!
//! - `service` - Dispatch, retry and lookup of export records
//! - `executor` - Runs one record: query, CSV, disk
//! - `worker` - Queue consumer driving the executor
//! - `sink` - Staged CSV writer
//! - `record` / `status` - Persisted record and its state machine

pub mod error;
pub mod executor;
pub mod job;
pub mod record;
pub mod service;
pub mod sink;
pub mod status;
#[cfg(test)]
pub(crate) mod testing;
pub mod worker;

pub use error::ExportError;
pub use executor::ExportExecutor;
pub use job::ExportJob;
pub use record::{ExportRecord, NewExport};
pub use service::ExportService;
pub use sink::CsvSink;
pub use status::{ExportStatus, UnknownStatus};
pub use worker::{ExportWorker, JobOutcome};
