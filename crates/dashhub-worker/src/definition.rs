//! Job definitions registered at process start.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::JobExecutionError;

/// Trait for job callback implementations
#[async_trait]
pub trait JobCallback: Send + Sync + 'static {
    /// Run the job once.
    async fn run(&self) -> Result<(), JobExecutionError>;
}

/// Adapts an async closure into a [`JobCallback`].
struct FnJob<F>(F);

#[async_trait]
impl<F, Fut> JobCallback for FnJob<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), JobExecutionError>> + Send + 'static,
{
    async fn run(&self) -> Result<(), JobExecutionError> {
        (self.0)().await
    }
}

/// A named job with its cron schedule and callback.
///
/// Immutable once handed to a [`JobGroup`](crate::group::JobGroup).
#[derive(Clone)]
pub struct JobDefinition {
    name: String,
    schedule: String,
    run_on_start: bool,
    triggerable: bool,
    callback: Arc<dyn JobCallback>,
}

impl std::fmt::Debug for JobDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobDefinition")
            .field("name", &self.name)
            .field("schedule", &self.schedule)
            .field("run_on_start", &self.run_on_start)
            .field("triggerable", &self.triggerable)
            .finish_non_exhaustive()
    }
}

impl JobDefinition {
    /// Define a job backed by a [`JobCallback`] implementation.
    ///
    /// The job is triggerable and does not run on start unless changed.
    pub fn new(
        name: impl Into<String>,
        schedule: impl Into<String>,
        callback: impl JobCallback,
    ) -> Self {
        Self {
            name: name.into(),
            schedule: schedule.into(),
            run_on_start: false,
            triggerable: true,
            callback: Arc::new(callback),
        }
    }

    /// Define a job backed by an async closure.
    pub fn from_fn<F, Fut>(name: impl Into<String>, schedule: impl Into<String>, callback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), JobExecutionError>> + Send + 'static,
    {
        Self::new(name, schedule, FnJob(callback))
    }

    /// Invoke the callback once when the group is built.
    pub fn run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }

    /// Allow or forbid manual and remote runs.
    pub fn triggerable(mut self, triggerable: bool) -> Self {
        self.triggerable = triggerable;
        self
    }

    /// Job name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cron expression as written.
    pub fn schedule(&self) -> &str {
        &self.schedule
    }

    /// Whether the job runs once at group construction.
    pub fn runs_on_start(&self) -> bool {
        self.run_on_start
    }

    /// Whether manual runs are permitted.
    pub fn is_triggerable(&self) -> bool {
        self.triggerable
    }

    /// The job callback.
    pub fn callback(&self) -> Arc<dyn JobCallback> {
        Arc::clone(&self.callback)
    }
}
