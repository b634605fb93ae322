//! Scheduled job domain entities.

pub mod model;
pub mod status;

pub use model::JobStatus;
pub use status::{ExecutionStatus, JobState};
