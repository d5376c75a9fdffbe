//! Queue payload for an export run

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::QueueError;

/// Job that runs one export record
///
/// The record id is all a worker needs; the report itself is rebuilt from
/// the descriptor stored on the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportJob {
    pub export_id: i64,
}

impl ExportJob {
    pub fn new(export_id: i64) -> Self {
        Self { export_id }
    }

    pub fn to_payload(&self) -> Value {
        serde_json::json!({ "export_id": self.export_id })
    }

    pub fn from_payload(payload: &Value) -> Result<Self, QueueError> {
        Ok(Self::deserialize(payload)?)
    }
}
