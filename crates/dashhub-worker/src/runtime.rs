//! The scheduler runtime: one explicit owner for jobs, queues, and triggers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing;

use dashhub_core::config::WorkerConfig;
use dashhub_core::error::AppError;
use dashhub_core::result::AppResult;
use dashhub_core::traits::cache::CacheProvider;
use dashhub_core::traits::pubsub::PubSubProvider;
use dashhub_core::types::clock::{Clock, SystemClock};
use dashhub_database::QueueStore;
use dashhub_entity::job::JobStatus;

use crate::definition::JobDefinition;
use crate::error::{SchedulerError, TriggerRejection};
use crate::executor::ExecutionWrapper;
use crate::group::{JobGroup, JobSummary, ManualRunOutcome};
use crate::jobs::{self, HeartbeatJob, QueueCleanupJob};
use crate::queue::{QueueClient, QueueDefinition, QueueRegistry};
use crate::runner::QueueWorker;
use crate::scheduler::{CronTickScheduler, TickScheduler};
use crate::status::StatusPublisher;
use crate::trigger::TriggerChannel;

/// Builder for [`SchedulerRuntime`].
pub struct SchedulerRuntimeBuilder {
    config: WorkerConfig,
    store: Arc<dyn QueueStore>,
    cache: Arc<dyn CacheProvider>,
    pubsub: Arc<dyn PubSubProvider>,
    clock: Arc<dyn Clock>,
    scheduler: Option<Arc<dyn TickScheduler>>,
    jobs: Vec<JobDefinition>,
    queues: Vec<QueueDefinition>,
}

impl SchedulerRuntimeBuilder {
    /// Use a custom clock instead of the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a custom tick scheduler instead of the cron scheduler.
    pub fn tick_scheduler(mut self, scheduler: Arc<dyn TickScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Register an application job.
    pub fn job(mut self, definition: JobDefinition) -> Self {
        self.jobs.push(definition);
        self
    }

    /// Register several application jobs.
    pub fn jobs(mut self, definitions: impl IntoIterator<Item = JobDefinition>) -> Self {
        self.jobs.extend(definitions);
        self
    }

    /// Register a queue.
    pub fn queue(mut self, definition: QueueDefinition) -> Self {
        self.queues.push(definition);
        self
    }

    /// Build the runtime.
    ///
    /// Built-in jobs are registered ahead of application jobs. Jobs with
    /// `run_on_start` begin running immediately; timers stay disarmed
    /// until [`SchedulerRuntime::start_all`].
    pub async fn build(self) -> Result<SchedulerRuntime, SchedulerError> {
        let scheduler: Arc<dyn TickScheduler> = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Arc::new(CronTickScheduler::new().await?),
        };

        let ttl = Duration::from_secs(self.config.status_ttl_seconds);
        let status = StatusPublisher::new(Arc::clone(&self.cache), Arc::clone(&self.clock), ttl)
            .with_channel(Arc::clone(&self.pubsub), self.config.status_channel.clone());
        let wrapper = ExecutionWrapper::new(status.clone());

        let (queues, client) =
            QueueRegistry::build(self.queues, Arc::clone(&self.store), Arc::clone(&self.clock))?;
        let worker = QueueWorker::new(
            Arc::clone(&queues),
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
        );

        let mut definitions = vec![
            jobs::queue_worker::definition(worker.clone(), &self.config.queue_poll_schedule),
            QueueCleanupJob::new(
                Arc::clone(&self.store),
                Arc::clone(&self.clock),
                self.config.completed_retention_days,
            )
            .definition(&self.config.queue_cleanup_schedule),
            HeartbeatJob::new(Arc::clone(&self.cache), Arc::clone(&self.clock))
                .definition(&self.config.heartbeat_schedule),
        ];
        definitions.extend(self.jobs);

        let group = Arc::new(JobGroup::build(definitions, Arc::clone(&scheduler), wrapper)?);
        let triggers = TriggerChannel::new(
            self.pubsub,
            self.config.trigger_channel.clone(),
            Arc::clone(&group),
        );

        Ok(SchedulerRuntime {
            group,
            queues,
            client,
            worker,
            status,
            scheduler,
            triggers,
        })
    }
}

/// Owns every scheduler component. Constructed once at process start and
/// passed by reference.
#[derive(Debug)]
pub struct SchedulerRuntime {
    group: Arc<JobGroup>,
    queues: Arc<QueueRegistry>,
    client: QueueClient,
    worker: QueueWorker,
    status: StatusPublisher,
    scheduler: Arc<dyn TickScheduler>,
    triggers: TriggerChannel,
}

impl SchedulerRuntime {
    /// Start building a runtime from its collaborators.
    pub fn builder(
        config: WorkerConfig,
        store: Arc<dyn QueueStore>,
        cache: Arc<dyn CacheProvider>,
        pubsub: Arc<dyn PubSubProvider>,
    ) -> SchedulerRuntimeBuilder {
        SchedulerRuntimeBuilder {
            config,
            store,
            cache,
            pubsub,
            clock: Arc::new(SystemClock),
            scheduler: None,
            jobs: Vec::new(),
            queues: Vec::new(),
        }
    }

    /// The job group.
    pub fn group(&self) -> &Arc<JobGroup> {
        &self.group
    }

    /// The queue registry.
    pub fn queues(&self) -> &Arc<QueueRegistry> {
        &self.queues
    }

    /// Client for enqueuing onto registered queues.
    pub fn queue_client(&self) -> &QueueClient {
        &self.client
    }

    /// The queue worker behind the `queue-worker` job.
    pub fn queue_worker(&self) -> &QueueWorker {
        &self.worker
    }

    /// The trigger channel.
    pub fn triggers(&self) -> &TriggerChannel {
        &self.triggers
    }

    /// Arm every job and start the timer backend.
    ///
    /// Call only once the host's readiness gate (migrations) has passed.
    pub async fn start_all(&self) -> Result<(), SchedulerError> {
        self.group.start_all().await?;
        self.scheduler.start().await?;
        tracing::info!(jobs = self.group.names().len(), "Scheduler started");
        Ok(())
    }

    /// Disarm every job. Running invocations finish on their own.
    pub async fn stop_all(&self) -> Result<(), SchedulerError> {
        self.group.stop_all().await
    }

    /// Stop every job and shut the timer backend down.
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        self.group.stop_all().await?;
        self.scheduler.shutdown().await?;
        tracing::info!("Scheduler shut down");
        Ok(())
    }

    /// Start the remote trigger listener.
    pub async fn listen_for_triggers(&self, shutdown: watch::Receiver<bool>) -> AppResult<JoinHandle<()>> {
        self.triggers.listen(shutdown).await
    }

    /// Request a run of a job through the trigger channel.
    pub async fn trigger_job(&self, name: &str) -> Result<(), TriggerRejection> {
        self.triggers.publish(name).await
    }

    /// Run a job in this process right away.
    pub async fn run_manually(&self, name: &str) -> ManualRunOutcome {
        self.group.run_manually(name).await
    }

    /// Registered jobs with their active flags.
    pub async fn jobs(&self) -> Vec<JobSummary> {
        self.group.jobs().await
    }

    /// Last-known status of one job.
    pub async fn job_status(&self, name: &str) -> AppResult<JobStatus> {
        if !self.group.contains(name) {
            return Err(AppError::not_found(format!("Unknown job '{name}'")));
        }
        self.status.current(name).await
    }

    /// Last-known status of every job in registration order.
    pub async fn job_statuses(&self) -> AppResult<Vec<JobStatus>> {
        let mut statuses = Vec::with_capacity(self.group.names().len());
        for name in self.group.names() {
            statuses.push(self.status.current(name).await?);
        }
        Ok(statuses)
    }
}
