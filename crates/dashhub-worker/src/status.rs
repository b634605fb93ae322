//! Publishes job status to the cache and the status channel.

use std::sync::Arc;
use std::time::Duration;

use tracing;

use dashhub_cache::keys;
use dashhub_core::result::AppResult;
use dashhub_core::traits::cache::{CacheProvider, CacheProviderExt};
use dashhub_core::traits::pubsub::PubSubProvider;
use dashhub_core::types::clock::Clock;
use dashhub_entity::job::{ExecutionStatus, JobStatus};

/// Writes last-known job status for dashboards.
///
/// Publishing is best effort: failures are logged and never surface to
/// the job.
#[derive(Debug, Clone)]
pub struct StatusPublisher {
    cache: Arc<dyn CacheProvider>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    /// Optional pub/sub channel receiving every status change as JSON
    channel: Option<(Arc<dyn PubSubProvider>, String)>,
}

impl StatusPublisher {
    /// Create a publisher that writes to the cache only.
    pub fn new(cache: Arc<dyn CacheProvider>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            cache,
            clock,
            ttl,
            channel: None,
        }
    }

    /// Also publish every status change on `channel`.
    pub fn with_channel(mut self, pubsub: Arc<dyn PubSubProvider>, channel: impl Into<String>) -> Self {
        self.channel = Some((pubsub, channel.into()));
        self
    }

    /// The clock used for status timestamps.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Last-known status of a job, or a never-run status if none is stored.
    pub async fn current(&self, job_name: &str) -> AppResult<JobStatus> {
        let stored = self.cache.get_json(&keys::job_status(job_name)).await?;
        Ok(stored.unwrap_or_else(|| JobStatus::never_run(job_name)))
    }

    /// Flag a job as running, keeping its previous outcome.
    pub async fn mark_running(&self, job_name: &str) {
        let previous = match self.current(job_name).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(job = %job_name, error = %e, "Failed to read previous job status");
                JobStatus::never_run(job_name)
            }
        };

        self.publish(&previous.running()).await;
    }

    /// Flag a job as idle with the outcome of the run that just finished.
    pub async fn mark_finished(&self, job_name: &str, outcome: ExecutionStatus) {
        let status = JobStatus::finished(job_name, outcome, self.clock.now());
        self.publish(&status).await;
    }

    async fn publish(&self, status: &JobStatus) {
        if let Err(e) = self
            .cache
            .set_json(&keys::job_status(&status.name), status, self.ttl)
            .await
        {
            tracing::warn!(job = %status.name, error = %e, "Failed to store job status");
        }

        let Some((pubsub, channel)) = &self.channel else {
            return;
        };

        let json = match serde_json::to_string(status) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(job = %status.name, error = %e, "Failed to serialize job status");
                return;
            }
        };

        if let Err(e) = pubsub.publish(channel, &json).await {
            tracing::warn!(
                job = %status.name,
                channel = %channel,
                error = %e,
                "Failed to publish job status"
            );
        }
    }
}
