//! Report definitions
//!
//! ## Architecture
//!
//! - `definition` - `Report` trait and the caller-facing `ReportDefinition`
//! - `descriptor` - Frozen, serializable snapshot stored with each export
//! - `registry` - Rebuilds definitions from descriptors by kind
//! - `headers` - Header label mapping
//! - `table` - Built-in SQL table report

pub mod definition;
pub mod descriptor;
pub mod error;
pub mod headers;
pub mod registry;
pub mod table;

pub use definition::{Report, ReportDefinition};
pub use descriptor::{ReportDescriptor, StreamMode};
pub use error::ReportError;
pub use headers::HeaderMap;
pub use registry::{ReportFactory, ReportRegistry};
pub use table::{TableReport, TableReportArgs};
