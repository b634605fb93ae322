//! Scheduler liveness heartbeat.

use std::sync::Arc;
use async_trait::async_trait;
use tracing;

use dashhub_cache::keys;
use dashhub_core::traits::cache::CacheProvider;
use dashhub_core::types::clock::Clock;

use crate::definition::{JobCallback, JobDefinition};
use crate::error::JobExecutionError;

use super::SCHEDULER_HEARTBEAT;

/// Writes the current time to the cache so dashboards can tell whether
/// the scheduler is alive. The value expires after the cache's default TTL.
#[derive(Debug, Clone)]
pub struct HeartbeatJob {
    cache: Arc<dyn CacheProvider>,
    clock: Arc<dyn Clock>,
}

impl HeartbeatJob {
    /// Create a heartbeat writing to `cache`.
    pub fn new(cache: Arc<dyn CacheProvider>, clock: Arc<dyn Clock>) -> Self {
        Self { cache, clock }
    }

    /// Register this job as `scheduler-heartbeat`, beating once at startup.
    pub fn definition(self, schedule: &str) -> JobDefinition {
        JobDefinition::new(SCHEDULER_HEARTBEAT, schedule, self).run_on_start(true)
    }
}

#[async_trait]
impl JobCallback for HeartbeatJob {
    async fn run(&self) -> Result<(), JobExecutionError> {
        let now = self.clock.now().to_rfc3339();
        self.cache
            .set_default(&keys::scheduler_heartbeat(), &now)
            .await?;

        tracing::trace!(at = %now, "Scheduler heartbeat");
        Ok(())
    }
}
