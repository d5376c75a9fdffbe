//! Export status state machine
//!
//! ```text
//! Pending -> Dispatched -> Processing -> Completed
//!    |           |             |
//!    +-----------+-------------+--------> Failed
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Pending,
    Dispatched,
    Processing,
    Completed,
    Failed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown export status: {0}")]
pub struct UnknownStatus(pub String);

impl ExportStatus {
    pub const ALL: [ExportStatus; 5] = [
        Self::Pending,
        Self::Dispatched,
        Self::Processing,
        Self::Completed,
        Self::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Dispatched => "dispatched",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Dispatched => "Dispatched",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Dispatched | Self::Processing)
    }

    /// Statuses a record may move to `self` from
    pub fn predecessors(&self) -> &'static [ExportStatus] {
        match self {
            Self::Pending => &[],
            Self::Dispatched => &[Self::Pending],
            Self::Processing => &[Self::Dispatched],
            Self::Completed => &[Self::Processing],
            Self::Failed => &[Self::Pending, Self::Dispatched, Self::Processing],
        }
    }

    pub fn can_transition_to(&self, next: ExportStatus) -> bool {
        next.predecessors().contains(self)
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
