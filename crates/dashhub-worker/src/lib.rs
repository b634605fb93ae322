//! Background job scheduling and deferred queue processing for DashHub.
//!
//! This crate provides:
//! - A job group that turns named cron definitions into armed timers
//! - An execution wrapper that isolates job failures and publishes status
//! - A remote trigger channel for on-demand runs
//! - Typed queues with a client for enqueuing and a worker that drains them
//! - Built-in jobs for queue processing, cleanup, and scheduler liveness
//! - A [`SchedulerRuntime`] that owns all of the above

pub mod definition;
pub mod error;
pub mod executor;
pub mod group;
pub mod jobs;
pub mod queue;
pub mod runner;
pub mod runtime;
pub mod schedule;
pub mod scheduler;
pub mod status;
pub mod trigger;

pub use definition::{JobCallback, JobDefinition};
pub use error::{JobExecutionError, SchedulerError, TriggerRejection};
pub use executor::{ExecutionOutcome, ExecutionWrapper, JobTask};
pub use group::{JobGroup, JobSummary, ManualRunOutcome};
pub use queue::{EnqueueOptions, Queue, QueueClient, QueueDefinition, QueueRegistry};
pub use runner::{BatchReport, QueueWorker};
pub use runtime::{SchedulerRuntime, SchedulerRuntimeBuilder};
pub use schedule::CronSchedule;
pub use scheduler::{CronTickScheduler, ManualTickScheduler, TickScheduler};
pub use status::StatusPublisher;
pub use trigger::TriggerChannel;
