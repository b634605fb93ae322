//! Error types for job scheduling, execution, and triggering.

use dashhub_core::error::AppError;

/// Errors raised while building or driving the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Two job definitions share a name
    #[error("Duplicate job name '{0}'")]
    DuplicateJob(String),

    /// Two queue definitions share a name
    #[error("Duplicate queue name '{0}'")]
    DuplicateQueue(String),

    /// A cron expression could not be parsed
    #[error("Invalid schedule '{expression}' for job '{job}': {reason}")]
    InvalidSchedule {
        /// Job the schedule belongs to
        job: String,
        /// Expression as written in the definition
        expression: String,
        /// Parser message
        reason: String,
    },

    /// No job is registered under this name
    #[error("Unknown job '{0}'")]
    UnknownJob(String),

    /// The underlying timer backend failed
    #[error("Timer error: {0}")]
    Timer(String),

    /// Error from a collaborator
    #[error(transparent)]
    App(#[from] AppError),
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::DuplicateJob(_)
            | SchedulerError::DuplicateQueue(_)
            | SchedulerError::InvalidSchedule { .. } => AppError::configuration(err.to_string()),
            SchedulerError::UnknownJob(_) => AppError::not_found(err.to_string()),
            SchedulerError::Timer(_) => AppError::internal(err.to_string()),
            SchedulerError::App(inner) => inner,
        }
    }
}

/// Error from a job or queue callback invocation
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// The callback reported a failure
    #[error("Job failed: {0}")]
    Failed(String),

    /// The callback panicked
    #[error("Job panicked: {0}")]
    Panicked(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

impl JobExecutionError {
    /// Build a failure from any displayable message.
    pub fn failed(message: impl std::fmt::Display) -> Self {
        Self::Failed(message.to_string())
    }
}

/// Reasons a manual trigger request is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriggerRejection {
    /// No job is registered under this name
    #[error("Unknown job '{0}'")]
    UnknownJob(String),

    /// The job does not allow manual runs
    #[error("Job '{0}' cannot be triggered manually")]
    NotTriggerable(String),

    /// The trigger message could not be published
    #[error("Trigger transport failed: {0}")]
    Transport(String),
}
