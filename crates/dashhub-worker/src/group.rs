//! Job group: the registry of named jobs and their timers.

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing;

use crate::definition::JobDefinition;
use crate::error::{SchedulerError, TriggerRejection};
use crate::executor::{ExecutionOutcome, ExecutionWrapper, JobTask};
use crate::schedule::CronSchedule;
use crate::scheduler::{TickFn, TickScheduler, TimerHandle};

/// Mutable timer state of one job.
///
/// `active` is true exactly when `timer_handle` is armed.
#[derive(Debug)]
pub struct JobRuntimeState {
    /// Job name
    pub name: String,
    /// Parsed schedule
    pub schedule: CronSchedule,
    /// Whether the timer is armed
    pub active: bool,
    /// The armed timer, if any
    pub timer_handle: Option<TimerHandle>,
}

#[derive(Debug)]
struct RegisteredJob {
    task: JobTask,
    triggerable: bool,
    run_on_start: bool,
    state: Mutex<JobRuntimeState>,
}

/// Listing entry for one registered job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    /// Job name
    pub name: String,
    /// Cron expression as written
    pub schedule: String,
    /// Whether the timer is armed
    pub active: bool,
    /// Whether manual runs are allowed
    pub triggerable: bool,
    /// Whether the job ran once at startup
    pub run_on_start: bool,
}

/// Result of a manual run request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualRunOutcome {
    /// The callback ran and succeeded.
    Completed,
    /// The callback ran and failed; the failure is in the job status.
    Failed,
    /// The job was already running.
    Skipped,
    /// The job does not allow manual runs.
    Rejected,
    /// No job has this name.
    UnknownJob,
}

/// Named jobs with their timers, built once at process start.
pub struct JobGroup {
    jobs: HashMap<String, RegisteredJob>,
    /// Registration order
    order: Vec<String>,
    scheduler: Arc<dyn TickScheduler>,
    wrapper: ExecutionWrapper,
    startup_runs: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for JobGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobGroup")
            .field("jobs", &self.order)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl JobGroup {
    /// Build the group from job definitions.
    ///
    /// Every job starts inactive. Fails on duplicate names or unparsable
    /// schedules. Jobs marked `run_on_start` are spawned once immediately,
    /// so this must be called inside a Tokio runtime.
    pub fn build(
        definitions: Vec<JobDefinition>,
        scheduler: Arc<dyn TickScheduler>,
        wrapper: ExecutionWrapper,
    ) -> Result<Self, SchedulerError> {
        let mut jobs = HashMap::with_capacity(definitions.len());
        let mut order = Vec::with_capacity(definitions.len());

        for definition in definitions {
            let name = definition.name().to_string();
            if jobs.contains_key(&name) {
                return Err(SchedulerError::DuplicateJob(name));
            }

            let schedule = CronSchedule::parse(definition.schedule()).map_err(|e| {
                SchedulerError::InvalidSchedule {
                    job: name.clone(),
                    expression: definition.schedule().to_string(),
                    reason: e.to_string(),
                }
            })?;

            let job = RegisteredJob {
                task: JobTask::new(&name, definition.callback()),
                triggerable: definition.is_triggerable(),
                run_on_start: definition.runs_on_start(),
                state: Mutex::new(JobRuntimeState {
                    name: name.clone(),
                    schedule,
                    active: false,
                    timer_handle: None,
                }),
            };

            order.push(name.clone());
            jobs.insert(name, job);
        }

        let mut startup_runs = Vec::new();
        for name in &order {
            let Some(job) = jobs.get(name).filter(|job| job.run_on_start) else {
                continue;
            };

            tracing::info!(job = %name, "Running job on start");
            let wrapper = wrapper.clone();
            let task = job.task.clone();
            startup_runs.push(tokio::spawn(async move {
                if let Err(err) = wrapper.execute(&task).await {
                    tracing::error!(job = %task.name(), error = %err, "Startup run failed");
                }
            }));
        }

        tracing::info!(jobs = order.len(), "Job group built");
        Ok(Self {
            jobs,
            order,
            scheduler,
            wrapper,
            startup_runs: Mutex::new(startup_runs),
        })
    }

    /// Arm a job's timer. Starting an active job is a no-op.
    pub async fn start(&self, name: &str) -> Result<(), SchedulerError> {
        let job = self.job(name)?;
        let mut state = job.state.lock().await;
        if state.active {
            return Ok(());
        }

        let handle = self
            .scheduler
            .arm(name, &state.schedule, self.tick_fn(&job.task))
            .await?;
        state.timer_handle = Some(handle);
        state.active = true;

        tracing::info!(job = %name, schedule = %state.schedule.expression(), "Job started");
        Ok(())
    }

    /// Disarm a job's timer. Stopping an inactive job is a no-op.
    ///
    /// An invocation already in flight is not cancelled.
    pub async fn stop(&self, name: &str) -> Result<(), SchedulerError> {
        let job = self.job(name)?;
        let mut state = job.state.lock().await;
        if !state.active {
            return Ok(());
        }

        if let Some(handle) = state.timer_handle {
            self.scheduler.disarm(handle).await?;
        }
        state.timer_handle = None;
        state.active = false;

        tracing::info!(job = %name, "Job stopped");
        Ok(())
    }

    /// Start every job in registration order.
    pub async fn start_all(&self) -> Result<(), SchedulerError> {
        for name in &self.order {
            self.start(name).await?;
        }
        Ok(())
    }

    /// Stop every job in registration order.
    pub async fn stop_all(&self) -> Result<(), SchedulerError> {
        for name in &self.order {
            self.stop(name).await?;
        }
        Ok(())
    }

    /// Run a job now, independent of its schedule and active flag.
    ///
    /// Unknown names are ignored. Jobs that are not triggerable are
    /// rejected without invoking the callback.
    pub async fn run_manually(&self, name: &str) -> ManualRunOutcome {
        let Some(job) = self.jobs.get(name) else {
            tracing::debug!(job = %name, "Ignoring manual run of unknown job");
            return ManualRunOutcome::UnknownJob;
        };

        if !job.triggerable {
            tracing::warn!(job = %name, "Rejected manual run of non-triggerable job");
            return ManualRunOutcome::Rejected;
        }

        tracing::info!(job = %name, "Running job manually");
        match self.wrapper.execute(&job.task).await {
            Ok(ExecutionOutcome::Completed) => ManualRunOutcome::Completed,
            Ok(ExecutionOutcome::Skipped) => ManualRunOutcome::Skipped,
            Err(err) => {
                tracing::error!(job = %name, error = %err, "Manual run failed");
                ManualRunOutcome::Failed
            }
        }
    }

    /// Check whether a job may be triggered manually.
    pub fn check_triggerable(&self, name: &str) -> Result<(), TriggerRejection> {
        match self.jobs.get(name) {
            None => Err(TriggerRejection::UnknownJob(name.to_string())),
            Some(job) if !job.triggerable => Err(TriggerRejection::NotTriggerable(name.to_string())),
            Some(_) => Ok(()),
        }
    }

    /// Whether a job with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    /// Job names in registration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Whether a job's timer is armed. Unknown jobs are inactive.
    pub async fn is_active(&self, name: &str) -> bool {
        match self.jobs.get(name) {
            Some(job) => job.state.lock().await.active,
            None => false,
        }
    }

    /// Summaries of every job in registration order.
    pub async fn jobs(&self) -> Vec<JobSummary> {
        let mut summaries = Vec::with_capacity(self.order.len());
        for name in &self.order {
            let Some(job) = self.jobs.get(name) else {
                continue;
            };
            let state = job.state.lock().await;
            summaries.push(JobSummary {
                name: name.clone(),
                schedule: state.schedule.expression().to_string(),
                active: state.active,
                triggerable: job.triggerable,
                run_on_start: job.run_on_start,
            });
        }
        summaries
    }

    /// Wait for the invocations spawned by `run_on_start` to finish.
    pub async fn join_startup_runs(&self) {
        let handles: Vec<JoinHandle<()>> = self.startup_runs.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Startup run task aborted");
            }
        }
    }

    fn job(&self, name: &str) -> Result<&RegisteredJob, SchedulerError> {
        self.jobs
            .get(name)
            .ok_or_else(|| SchedulerError::UnknownJob(name.to_string()))
    }

    /// Build the timer callback for a job. Errors end at this call site.
    fn tick_fn(&self, task: &JobTask) -> TickFn {
        let wrapper = self.wrapper.clone();
        let task = task.clone();
        Arc::new(move || {
            let wrapper = wrapper.clone();
            let task = task.clone();
            async move {
                if let Err(err) = wrapper.execute(&task).await {
                    tracing::error!(job = %task.name(), error = %err, "Scheduled run failed");
                }
            }
            .boxed()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use dashhub_cache::memory::MemoryCacheProvider;
    use dashhub_core::config::cache::MemoryCacheConfig;
    use dashhub_core::types::clock::ManualClock;

    use crate::error::JobExecutionError;
    use crate::scheduler::ManualTickScheduler;
    use crate::status::StatusPublisher;

    struct Harness {
        scheduler: ManualTickScheduler,
        wrapper: ExecutionWrapper,
    }

    fn harness() -> Harness {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap());
        let cache = MemoryCacheProvider::new(&MemoryCacheConfig::default(), 60);
        let status = StatusPublisher::new(
            Arc::new(cache),
            Arc::new(clock.clone()),
            Duration::from_secs(60),
        );
        Harness {
            scheduler: ManualTickScheduler::new(clock),
            wrapper: ExecutionWrapper::new(status),
        }
    }

    fn counting_job(name: &str, counter: &Arc<AtomicUsize>) -> JobDefinition {
        let counter = Arc::clone(counter);
        JobDefinition::from_fn(name, "* * * * *", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), JobExecutionError>(())
            }
        })
    }

    fn build(harness: &Harness, definitions: Vec<JobDefinition>) -> Result<JobGroup, SchedulerError> {
        JobGroup::build(
            definitions,
            Arc::new(harness.scheduler.clone()),
            harness.wrapper.clone(),
        )
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected() {
        let h = harness();
        let counter = Arc::new(AtomicUsize::new(0));

        let err = build(&h, vec![counting_job("a", &counter), counting_job("a", &counter)])
            .unwrap_err();

        assert!(matches!(err, SchedulerError::DuplicateJob(name) if name == "a"));
    }

    #[tokio::test]
    async fn test_invalid_schedule_rejected() {
        let h = harness();
        let job = JobDefinition::from_fn("bad", "not a cron", || async { Ok(()) });

        let err = build(&h, vec![job]).unwrap_err();

        assert!(matches!(err, SchedulerError::InvalidSchedule { job, .. } if job == "bad"));
    }

    #[tokio::test]
    async fn test_jobs_start_inactive() {
        let h = harness();
        let counter = Arc::new(AtomicUsize::new(0));
        let group = build(&h, vec![counting_job("a", &counter)]).unwrap();

        assert!(!group.is_active("a").await);
        h.scheduler.advance(chrono::Duration::minutes(2)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let h = harness();
        let counter = Arc::new(AtomicUsize::new(0));
        let group = build(&h, vec![counting_job("a", &counter)]).unwrap();

        group.start("a").await.unwrap();
        group.start("a").await.unwrap();
        assert_eq!(h.scheduler.armed_jobs(), vec!["a".to_string()]);

        h.scheduler.advance(chrono::Duration::minutes(1)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        group.stop("a").await.unwrap();
        group.stop("a").await.unwrap();
        assert!(!group.is_active("a").await);

        h.scheduler.advance(chrono::Duration::minutes(3)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_job_start_fails() {
        let h = harness();
        let group = build(&h, vec![]).unwrap();

        let err = group.start("missing").await.unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownJob(_)));
    }

    #[tokio::test]
    async fn test_manual_run_policies() {
        let h = harness();
        let counter = Arc::new(AtomicUsize::new(0));
        let locked = counting_job("locked", &counter).triggerable(false);
        let open = counting_job("open", &counter);
        let group = build(&h, vec![locked, open]).unwrap();

        assert_eq!(group.run_manually("locked").await, ManualRunOutcome::Rejected);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        assert_eq!(group.run_manually("nope").await, ManualRunOutcome::UnknownJob);

        assert_eq!(group.run_manually("open").await, ManualRunOutcome::Completed);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!group.is_active("open").await);

        assert_eq!(
            group.check_triggerable("locked"),
            Err(TriggerRejection::NotTriggerable("locked".to_string()))
        );
        assert_eq!(group.check_triggerable("open"), Ok(()));
    }

    #[tokio::test]
    async fn test_run_on_start_runs_once() {
        let h = harness();
        let counter = Arc::new(AtomicUsize::new(0));
        let group = build(&h, vec![counting_job("boot", &counter).run_on_start(true)]).unwrap();

        group.join_startup_runs().await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!group.is_active("boot").await);
    }

    #[tokio::test]
    async fn test_summaries_follow_registration_order() {
        let h = harness();
        let counter = Arc::new(AtomicUsize::new(0));
        let group = build(
            &h,
            vec![counting_job("zeta", &counter), counting_job("alpha", &counter).triggerable(false)],
        )
        .unwrap();
        group.start("alpha").await.unwrap();

        let jobs = group.jobs().await;

        assert_eq!(jobs[0].name, "zeta");
        assert!(!jobs[0].active);
        assert_eq!(jobs[1].name, "alpha");
        assert!(jobs[1].active);
        assert!(!jobs[1].triggerable);
    }
}
