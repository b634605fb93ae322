//! Published job status model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::{ExecutionStatus, JobState};

/// Last-known status of a job, as published for dashboards.
///
/// Overwritten on every invocation; not authoritative and may be lost on
/// restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    /// Job name.
    pub name: String,
    /// Current state.
    pub status: JobState,
    /// Outcome of the last finished invocation.
    pub last_execution_status: ExecutionStatus,
    /// When the last invocation finished.
    pub last_execution_timestamp: Option<DateTime<Utc>>,
}

impl JobStatus {
    /// Status of a job that has never run.
    pub fn never_run(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: JobState::Idle,
            last_execution_status: ExecutionStatus::Unknown,
            last_execution_timestamp: None,
        }
    }

    /// Copy of this status flagged as running, keeping the last outcome.
    pub fn running(&self) -> Self {
        Self {
            status: JobState::Running,
            ..self.clone()
        }
    }

    /// Idle status recording a finished invocation.
    pub fn finished(
        name: impl Into<String>,
        outcome: ExecutionStatus,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            status: JobState::Idle,
            last_execution_status: outcome,
            last_execution_timestamp: Some(at),
        }
    }
}
