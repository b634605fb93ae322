//! Virtual-time tick scheduler for deterministic tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashhub_core::types::clock::{Clock, ManualClock};
use uuid::Uuid;

use super::{TickFn, TickScheduler, TimerHandle};
use crate::error::SchedulerError;
use crate::schedule::CronSchedule;

struct ArmedTimer {
    job_name: String,
    schedule: CronSchedule,
    next: Option<DateTime<Utc>>,
    tick: TickFn,
}

/// Tick scheduler driven by a [`ManualClock`].
///
/// Ticks fire only from [`ManualTickScheduler::advance`], in time order,
/// with the clock set to each tick's instant while it runs. `start` and
/// `shutdown` are accepted but ticks never fire on their own.
#[derive(Clone)]
pub struct ManualTickScheduler {
    clock: ManualClock,
    timers: Arc<Mutex<HashMap<Uuid, ArmedTimer>>>,
}

impl std::fmt::Debug for ManualTickScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualTickScheduler")
            .field("now", &self.clock.now())
            .field("armed", &self.armed_jobs())
            .finish()
    }
}

impl ManualTickScheduler {
    /// Create a scheduler that reads and moves `clock`.
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The clock this scheduler drives.
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Names of jobs with an armed timer, sorted.
    pub fn armed_jobs(&self) -> Vec<String> {
        let timers = self.timers.lock().unwrap_or_else(|p| p.into_inner());
        let mut names: Vec<String> = timers.values().map(|t| t.job_name.clone()).collect();
        names.sort();
        names
    }

    /// Whether `job_name` has an armed timer.
    pub fn is_armed(&self, job_name: &str) -> bool {
        let timers = self.timers.lock().unwrap_or_else(|p| p.into_inner());
        timers.values().any(|t| t.job_name == job_name)
    }

    /// Move virtual time forward, firing every tick that falls due.
    ///
    /// Each tick is awaited before the next is fired. Returns the number
    /// of ticks fired.
    pub async fn advance(&self, by: Duration) -> usize {
        let target = self.clock.now() + by;
        let mut fired = 0;

        while let Some((at, tick)) = self.take_next_due(target) {
            self.clock.set(at);
            tick().await;
            fired += 1;
        }

        self.clock.set(target);
        fired
    }

    /// Pop the earliest tick at or before `target` and reschedule its timer.
    fn take_next_due(&self, target: DateTime<Utc>) -> Option<(DateTime<Utc>, TickFn)> {
        let mut timers = self.timers.lock().unwrap_or_else(|p| p.into_inner());

        let timer = timers
            .values_mut()
            .filter(|t| t.next.is_some_and(|next| next <= target))
            .min_by(|a, b| (a.next, &a.job_name).cmp(&(b.next, &b.job_name)))?;

        let at = timer.next?;
        timer.next = timer.schedule.next_after(at);
        Some((at, Arc::clone(&timer.tick)))
    }
}

#[async_trait]
impl TickScheduler for ManualTickScheduler {
    async fn arm(
        &self,
        job_name: &str,
        schedule: &CronSchedule,
        tick: TickFn,
    ) -> Result<TimerHandle, SchedulerError> {
        let id = Uuid::new_v4();
        let timer = ArmedTimer {
            job_name: job_name.to_string(),
            schedule: schedule.clone(),
            next: schedule.next_after(self.clock.now()),
            tick,
        };

        let mut timers = self.timers.lock().unwrap_or_else(|p| p.into_inner());
        timers.insert(id, timer);
        Ok(TimerHandle::new(id))
    }

    async fn disarm(&self, handle: TimerHandle) -> Result<(), SchedulerError> {
        let mut timers = self.timers.lock().unwrap_or_else(|p| p.into_inner());
        timers.remove(&handle.id());
        Ok(())
    }

    async fn start(&self) -> Result<(), SchedulerError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), SchedulerError> {
        let mut timers = self.timers.lock().unwrap_or_else(|p| p.into_inner());
        timers.clear();
        Ok(())
    }
}
