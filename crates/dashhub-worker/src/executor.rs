//! Execution wrapper: runs job callbacks without letting them crash the host.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use tracing;

use dashhub_entity::job::ExecutionStatus;

use crate::definition::JobCallback;
use crate::error::JobExecutionError;
use crate::status::StatusPublisher;

/// What happened to one invocation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The callback ran and succeeded.
    Completed,
    /// The job was already running; this invocation was dropped.
    Skipped,
}

/// A job callback paired with its running guard.
///
/// Clones share the guard, so overlapping invocations of the same job are
/// detected no matter which path (tick, manual run, run on start) starts them.
#[derive(Clone)]
pub struct JobTask {
    name: Arc<str>,
    callback: Arc<dyn JobCallback>,
    running: Arc<AtomicBool>,
}

impl std::fmt::Debug for JobTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobTask")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl JobTask {
    /// Create a task for a job callback.
    pub fn new(name: &str, callback: Arc<dyn JobCallback>) -> Self {
        Self {
            name: Arc::from(name),
            callback,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Job name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether an invocation is in flight.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Clears the running flag when the invocation ends, even on panic.
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Wraps every job invocation with status publishing and failure isolation.
#[derive(Debug, Clone)]
pub struct ExecutionWrapper {
    status: StatusPublisher,
}

impl ExecutionWrapper {
    /// Create a wrapper that reports through `status`.
    pub fn new(status: StatusPublisher) -> Self {
        Self { status }
    }

    /// The status publisher used by this wrapper.
    pub fn status(&self) -> &StatusPublisher {
        &self.status
    }

    /// Run a job once.
    ///
    /// Panics are caught and reported as [`JobExecutionError::Panicked`].
    /// Errors are logged and reflected in the job status before being
    /// returned; callers must not propagate them further.
    pub async fn execute(&self, task: &JobTask) -> Result<ExecutionOutcome, JobExecutionError> {
        let Some(_guard) = RunningGuard::acquire(&task.running) else {
            tracing::debug!(job = %task.name, "Job still running, skipping invocation");
            return Ok(ExecutionOutcome::Skipped);
        };

        self.status.mark_running(&task.name).await;
        tracing::debug!(job = %task.name, "Job started");

        let result = match AssertUnwindSafe(task.callback.run()).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(JobExecutionError::Panicked(panic_message(panic.as_ref()))),
        };

        match result {
            Ok(()) => {
                self.status
                    .mark_finished(&task.name, ExecutionStatus::Success)
                    .await;
                tracing::debug!(job = %task.name, "Job completed");
                Ok(ExecutionOutcome::Completed)
            }
            Err(err) => {
                tracing::error!(job = %task.name, error = ?err, "Job execution failed");
                self.status
                    .mark_finished(&task.name, ExecutionStatus::Error)
                    .await;
                Err(err)
            }
        }
    }
}

/// Extract the message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
