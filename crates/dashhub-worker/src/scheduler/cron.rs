//! Wall-clock tick scheduler backed by tokio-cron-scheduler.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Local;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use super::{TickFn, TickScheduler, TimerHandle};
use crate::error::SchedulerError;
use crate::schedule::CronSchedule;

/// Cron-based tick scheduler evaluated in the local timezone.
#[derive(Clone)]
pub struct CronTickScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    started: Arc<AtomicBool>,
}

impl std::fmt::Debug for CronTickScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronTickScheduler")
            .field("started", &self.started.load(Ordering::Relaxed))
            .finish()
    }
}

impl CronTickScheduler {
    /// Create a new cron scheduler
    pub async fn new() -> Result<Self, SchedulerError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::Timer(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            started: Arc::new(AtomicBool::new(false)),
        })
    }
}

#[async_trait]
impl TickScheduler for CronTickScheduler {
    async fn arm(
        &self,
        job_name: &str,
        schedule: &CronSchedule,
        tick: TickFn,
    ) -> Result<TimerHandle, SchedulerError> {
        let job = CronJob::new_async_tz(schedule.normalized(), Local, move |_uuid, _lock| {
            let tick = Arc::clone(&tick);
            Box::pin(async move {
                tick().await;
            })
        })
        .map_err(|e| SchedulerError::InvalidSchedule {
            job: job_name.to_string(),
            expression: schedule.expression().to_string(),
            reason: e.to_string(),
        })?;

        let id = self.scheduler.add(job).await.map_err(|e| {
            SchedulerError::Timer(format!("Failed to add timer for '{job_name}': {e}"))
        })?;

        tracing::debug!(job = %job_name, timer = %id, "Timer armed");
        Ok(TimerHandle::new(id))
    }

    async fn disarm(&self, handle: TimerHandle) -> Result<(), SchedulerError> {
        self.scheduler
            .remove(&handle.id())
            .await
            .map_err(|e| SchedulerError::Timer(format!("Failed to remove timer: {e}")))?;

        tracing::debug!(timer = %handle.id(), "Timer disarmed");
        Ok(())
    }

    async fn start(&self) -> Result<(), SchedulerError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.scheduler.start().await.map_err(|e| {
            self.started.store(false, Ordering::Release);
            SchedulerError::Timer(format!("Failed to start scheduler: {e}"))
        })?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), SchedulerError> {
        // JobScheduler clones share state; shutdown needs a mutable handle.
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| SchedulerError::Timer(format!("Failed to shutdown scheduler: {e}")))?;

        self.started.store(false, Ordering::Release);
        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}
