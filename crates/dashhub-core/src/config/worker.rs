//! Background scheduler configuration.

use serde::{Deserialize, Serialize};

/// Scheduler, queue worker, and built-in job configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the scheduler is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cron expression for the queue worker job.
    #[serde(default = "default_queue_poll_schedule")]
    pub queue_poll_schedule: String,
    /// Cron expression for the completed-entry cleanup job.
    #[serde(default = "default_queue_cleanup_schedule")]
    pub queue_cleanup_schedule: String,
    /// Days to keep completed queue entries before purging them.
    #[serde(default = "default_completed_retention_days")]
    pub completed_retention_days: i64,
    /// Cron expression for the scheduler heartbeat job.
    #[serde(default = "default_heartbeat_schedule")]
    pub heartbeat_schedule: String,
    /// How long a published job status is kept, in seconds.
    #[serde(default = "default_status_ttl")]
    pub status_ttl_seconds: u64,
    /// Pub/sub channel carrying manual trigger requests.
    #[serde(default = "default_trigger_channel")]
    pub trigger_channel: String,
    /// Pub/sub channel carrying job status changes.
    #[serde(default = "default_status_channel")]
    pub status_channel: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            queue_poll_schedule: default_queue_poll_schedule(),
            queue_cleanup_schedule: default_queue_cleanup_schedule(),
            completed_retention_days: default_completed_retention_days(),
            heartbeat_schedule: default_heartbeat_schedule(),
            status_ttl_seconds: default_status_ttl(),
            trigger_channel: default_trigger_channel(),
            status_channel: default_status_channel(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_queue_poll_schedule() -> String {
    "0 * * * * *".to_string()
}

fn default_queue_cleanup_schedule() -> String {
    "0 30 3 * * *".to_string()
}

fn default_completed_retention_days() -> i64 {
    7
}

fn default_heartbeat_schedule() -> String {
    "*/30 * * * * *".to_string()
}

fn default_status_ttl() -> u64 {
    604_800
}

fn default_trigger_channel() -> String {
    "jobs:trigger".to_string()
}

fn default_status_channel() -> String {
    "jobs:status".to_string()
}
