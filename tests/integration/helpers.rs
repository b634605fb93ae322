//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};

use dashhub_cache::memory::MemoryCacheProvider;
use dashhub_core::config::WorkerConfig;
use dashhub_core::config::cache::MemoryCacheConfig;
use dashhub_core::types::clock::ManualClock;
use dashhub_database::MemoryQueueStore;
use dashhub_entity::job::JobStatus;
use dashhub_realtime::MemoryPubSub;
use dashhub_worker::{
    JobDefinition, JobExecutionError, ManualTickScheduler, QueueDefinition, SchedulerRuntime,
};

/// Monday 2026-03-02 08:00:00 UTC.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
}

/// In-memory collaborators sharing one virtual clock.
pub struct TestEnv {
    pub clock: ManualClock,
    pub ticks: ManualTickScheduler,
    pub store: Arc<MemoryQueueStore>,
    pub cache: Arc<MemoryCacheProvider>,
    pub pubsub: Arc<MemoryPubSub>,
    pub config: WorkerConfig,
}

impl TestEnv {
    pub fn new() -> Self {
        let clock = ManualClock::new(start_time());
        Self {
            ticks: ManualTickScheduler::new(clock.clone()),
            clock,
            store: Arc::new(MemoryQueueStore::new()),
            cache: Arc::new(MemoryCacheProvider::new(&MemoryCacheConfig::default(), 3600)),
            pubsub: Arc::new(MemoryPubSub::new(64)),
            config: WorkerConfig::default(),
        }
    }

    /// Build a runtime over this environment.
    pub async fn runtime(
        &self,
        jobs: Vec<JobDefinition>,
        queues: Vec<QueueDefinition>,
    ) -> SchedulerRuntime {
        let mut builder = SchedulerRuntime::builder(
            self.config.clone(),
            self.store.clone(),
            self.cache.clone(),
            self.pubsub.clone(),
        )
        .clock(Arc::new(self.clock.clone()))
        .tick_scheduler(Arc::new(self.ticks.clone()))
        .jobs(jobs);

        for queue in queues {
            builder = builder.queue(queue);
        }

        let runtime = builder.build().await.expect("runtime should build");
        runtime.group().join_startup_runs().await;
        runtime
    }

    /// Move virtual time forward, firing due ticks.
    pub async fn advance(&self, by: Duration) -> usize {
        self.ticks.advance(by).await
    }
}

/// A job that counts its invocations.
pub fn counting_job(name: &str, schedule: &str, counter: &Arc<AtomicUsize>) -> JobDefinition {
    let counter = Arc::clone(counter);
    JobDefinition::from_fn(name, schedule, move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })
}

/// A job that counts its invocations and always fails.
pub fn failing_job(name: &str, schedule: &str, counter: &Arc<AtomicUsize>) -> JobDefinition {
    let counter = Arc::clone(counter);
    JobDefinition::from_fn(name, schedule, move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(JobExecutionError::failed("upstream returned 503"))
        }
    })
}

pub fn count(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

/// Last-known status of a job.
pub async fn status(runtime: &SchedulerRuntime, name: &str) -> JobStatus {
    runtime.job_status(name).await.expect("job should exist")
}
