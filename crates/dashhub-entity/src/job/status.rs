//! Job state and execution outcome enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a job callback is currently executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Not executing.
    #[default]
    Idle,
    /// A callback invocation is in flight.
    Running,
}

impl JobState {
    /// Return the state as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of the most recent finished invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// The callback returned successfully.
    Success,
    /// The callback failed or panicked.
    Error,
    /// No invocation has finished yet.
    #[default]
    Unknown,
}

impl ExecutionStatus {
    /// Return the outcome as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
