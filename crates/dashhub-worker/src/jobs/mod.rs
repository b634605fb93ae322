//! Built-in jobs registered by every scheduler runtime.

pub mod heartbeat;
pub mod queue_cleanup;
pub mod queue_worker;

pub use heartbeat::HeartbeatJob;
pub use queue_cleanup::QueueCleanupJob;

/// Name of the job that drains due queue entries.
pub const QUEUE_WORKER: &str = "queue-worker";
/// Name of the job that purges old completed queue entries.
pub const QUEUE_CLEANUP: &str = "queue-cleanup";
/// Name of the job that records scheduler liveness.
pub const SCHEDULER_HEARTBEAT: &str = "scheduler-heartbeat";
