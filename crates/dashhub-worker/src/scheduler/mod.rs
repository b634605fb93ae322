//! Timer backends that fire job ticks on a cron schedule.
//!
//! [`CronTickScheduler`] drives production ticks from the wall clock;
//! [`ManualTickScheduler`] fires ticks only when virtual time is advanced.

pub mod cron;
pub mod manual;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::error::SchedulerError;
use crate::schedule::CronSchedule;

pub use self::cron::CronTickScheduler;
pub use self::manual::ManualTickScheduler;

/// Work to run on every tick of an armed timer.
pub type TickFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Opaque handle to an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(Uuid);

impl TimerHandle {
    /// Wrap a backend timer ID.
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// The backend timer ID.
    pub fn id(&self) -> Uuid {
        self.0
    }
}

/// Arms and disarms cron timers.
#[async_trait]
pub trait TickScheduler: Send + Sync + std::fmt::Debug + 'static {
    /// Arm a timer that calls `tick` on every occurrence of `schedule`.
    async fn arm(
        &self,
        job_name: &str,
        schedule: &CronSchedule,
        tick: TickFn,
    ) -> Result<TimerHandle, SchedulerError>;

    /// Disarm a timer. No further ticks fire after this returns.
    async fn disarm(&self, handle: TimerHandle) -> Result<(), SchedulerError>;

    /// Begin firing armed timers.
    async fn start(&self) -> Result<(), SchedulerError>;

    /// Stop firing all timers.
    async fn shutdown(&self) -> Result<(), SchedulerError>;
}
