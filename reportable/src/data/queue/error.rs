//! Queue error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    /// Dispatch named a connection this backend does not serve
    #[error("Unknown queue connection: {0}")]
    UnknownConnection(String),

    /// Ack or fail for a job that is not reserved
    #[error("Job {0} is not reserved")]
    NotReserved(String),

    #[error("Invalid job payload: {0}")]
    Payload(#[from] serde_json::Error),
}
