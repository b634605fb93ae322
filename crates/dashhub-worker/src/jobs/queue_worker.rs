//! Job definition for the queue worker.

use crate::definition::JobDefinition;
use crate::runner::QueueWorker;

use super::QUEUE_WORKER;

/// Register `worker` as the `queue-worker` job.
///
/// Entries enqueued before boot wait for the first tick.
pub fn definition(worker: QueueWorker, schedule: &str) -> JobDefinition {
    JobDefinition::new(QUEUE_WORKER, schedule, worker).run_on_start(false)
}
