//! Cache key builders for all scheduler cache entries.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the scheduler uses.

/// Prefix applied to all scheduler cache keys.
const PREFIX: &str = "jobs";

/// Cache key for the last-known status of a job.
pub fn job_status(job_name: &str) -> String {
    format!("{PREFIX}:status:{job_name}")
}

/// Cache key for the scheduler liveness timestamp.
pub fn scheduler_heartbeat() -> String {
    format!("{PREFIX}:heartbeat")
}
