//! Job queue
//!
//! Export records are handed to workers through a `JobQueue`. The payload
//! only references the record id; everything else is read back from SQLite.

mod backend;
mod error;
mod memory;

pub use backend::{FailureDisposition, JobQueue, QueuedJob};
pub use error::QueueError;
pub use memory::MemoryQueue;
