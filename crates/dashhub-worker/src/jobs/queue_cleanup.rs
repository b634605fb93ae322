//! Purge of completed queue entries.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tracing;

use dashhub_core::result::AppResult;
use dashhub_core::types::clock::Clock;
use dashhub_database::QueueStore;

use crate::definition::{JobCallback, JobDefinition};
use crate::error::JobExecutionError;

use super::QUEUE_CLEANUP;

/// Deletes queue entries completed longer ago than the retention period.
///
/// Failed and pending entries are never purged.
#[derive(Debug, Clone)]
pub struct QueueCleanupJob {
    store: Arc<dyn QueueStore>,
    clock: Arc<dyn Clock>,
    retention: Duration,
}

impl QueueCleanupJob {
    /// Create a cleanup job keeping completed entries for `retention_days`.
    pub fn new(store: Arc<dyn QueueStore>, clock: Arc<dyn Clock>, retention_days: i64) -> Self {
        Self {
            store,
            clock,
            retention: Duration::days(retention_days.max(0)),
        }
    }

    /// Purge expired entries. Returns how many were deleted.
    pub async fn purge(&self) -> AppResult<u64> {
        let cutoff = self.clock.now() - self.retention;
        let purged = self.store.purge_completed(cutoff).await?;

        if purged > 0 {
            tracing::info!(purged, cutoff = %cutoff, "Purged completed queue entries");
        } else {
            tracing::debug!(cutoff = %cutoff, "No completed queue entries to purge");
        }
        Ok(purged)
    }

    /// Register this job as `queue-cleanup`.
    pub fn definition(self, schedule: &str) -> JobDefinition {
        JobDefinition::new(QUEUE_CLEANUP, schedule, self)
    }
}

#[async_trait]
impl JobCallback for QueueCleanupJob {
    async fn run(&self) -> Result<(), JobExecutionError> {
        self.purge().await?;
        Ok(())
    }
}
