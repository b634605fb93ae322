//! Queue worker: drains due queue entries through their queue handlers.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use tracing;

use dashhub_core::types::clock::Clock;
use dashhub_database::QueueStore;
use dashhub_entity::queue::QueueEntry;

use crate::definition::JobCallback;
use crate::error::JobExecutionError;
use crate::executor::panic_message;
use crate::queue::{QueueDispatchError, QueueRegistry};

/// Counts from one pass over the due entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Entries handled and marked done
    pub processed: usize,
    /// Entries whose callback failed; retried on the next pass
    pub failed: usize,
    /// Entries with an undecodable or invalid payload; never retried
    pub rejected: usize,
    /// Entries for queues that are not registered; left untouched
    pub orphaned: usize,
}

/// Processes due queue entries.
///
/// Delivery is at-least-once: an entry whose callback succeeded but whose
/// completion could not be recorded is delivered again.
#[derive(Debug, Clone)]
pub struct QueueWorker {
    registry: Arc<QueueRegistry>,
    store: Arc<dyn QueueStore>,
    clock: Arc<dyn Clock>,
}

impl QueueWorker {
    /// Create a new queue worker
    pub fn new(registry: Arc<QueueRegistry>, store: Arc<dyn QueueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry,
            store,
            clock,
        }
    }

    /// Handle every entry that is due now, in store order.
    ///
    /// One entry failing never stops the rest of the batch. Returns an
    /// error if any callback failed so the job status shows the failure.
    pub async fn process_due_entries(&self) -> Result<BatchReport, JobExecutionError> {
        let entries = self.store.find_due(self.clock.now()).await?;
        let mut report = BatchReport::default();

        for entry in &entries {
            self.process_entry(entry, &mut report).await;
        }

        if entries.is_empty() {
            tracing::trace!("No due queue entries");
        } else {
            tracing::info!(
                processed = report.processed,
                failed = report.failed,
                rejected = report.rejected,
                orphaned = report.orphaned,
                "Queue batch finished"
            );
        }

        if report.failed > 0 {
            return Err(JobExecutionError::Failed(format!(
                "{} of {} queue entries failed",
                report.failed,
                entries.len()
            )));
        }
        Ok(report)
    }

    async fn process_entry(&self, entry: &QueueEntry, report: &mut BatchReport) {
        let Some(handler) = self.registry.handler(&entry.queue_name) else {
            tracing::debug!(
                queue = %entry.queue_name,
                entry_id = %entry.id,
                "Skipping entry for unregistered queue"
            );
            report.orphaned += 1;
            return;
        };

        let result = AssertUnwindSafe(handler.handle(entry.payload.clone()))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(QueueDispatchError::Callback(JobExecutionError::Panicked(
                    panic_message(panic.as_ref()),
                )))
            });

        match result {
            Ok(()) => match self.store.mark_done(entry.id, self.clock.now()).await {
                Ok(true) => {
                    tracing::debug!(queue = %entry.queue_name, entry_id = %entry.id, "Queue entry done");
                    report.processed += 1;
                }
                Ok(false) => {
                    tracing::debug!(entry_id = %entry.id, "Queue entry already completed elsewhere");
                    report.processed += 1;
                }
                Err(e) => {
                    tracing::error!(
                        entry_id = %entry.id,
                        error = %e,
                        "Failed to mark queue entry done; it will be delivered again"
                    );
                    report.failed += 1;
                }
            },
            Err(err) if err.is_permanent() => {
                tracing::warn!(
                    queue = %entry.queue_name,
                    entry_id = %entry.id,
                    error = %err,
                    "Rejecting queue entry with unusable payload"
                );
                if let Err(e) = self.store.mark_failed(entry.id, &err.to_string()).await {
                    tracing::error!(entry_id = %entry.id, error = %e, "Failed to mark queue entry failed");
                }
                report.rejected += 1;
            }
            Err(err) => {
                tracing::error!(
                    queue = %entry.queue_name,
                    entry_id = %entry.id,
                    error = ?err,
                    "Queue callback failed; entry will be retried"
                );
                report.failed += 1;
            }
        }
    }
}

#[async_trait]
impl JobCallback for QueueWorker {
    async fn run(&self) -> Result<(), JobExecutionError> {
        self.process_due_entries().await.map(|_| ())
    }
}
