//! In-memory queue store for single-process deployments and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use dashhub_core::error::AppError;
use dashhub_core::result::AppResult;
use dashhub_entity::queue::QueueEntry;

use crate::store::QueueStore;

/// Queue store that keeps entries in insertion order in process memory.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    entries: RwLock<Vec<QueueEntry>>,
}

impl MemoryQueueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored entry.
    pub async fn all(&self) -> Vec<QueueEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn insert(&self, entry: &QueueEntry) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.id == entry.id) {
            return Err(AppError::conflict(format!(
                "Queue entry {} already exists",
                entry.id
            )));
        }
        entries.push(entry.clone());
        Ok(())
    }

    async fn find_due(&self, now: DateTime<Utc>) -> AppResult<Vec<QueueEntry>> {
        let entries = self.entries.read().await;
        let mut due: Vec<QueueEntry> = entries.iter().filter(|e| e.is_due(now)).cloned().collect();
        // Stable sort keeps insertion order for equal keys.
        due.sort_by_key(|e| (e.execution_date, e.created_at));
        Ok(due)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<QueueEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.iter().find(|e| e.id == id).cloned())
    }

    async fn mark_done(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|e| e.id == id && !e.done) {
            Some(entry) => {
                entry.done = true;
                entry.completed_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_failed(&self, id: Uuid, reason: &str) -> AppResult<bool> {
        let mut entries = self.entries.write().await;
        match entries
            .iter_mut()
            .find(|e| e.id == id && !e.done && e.failed_reason.is_none())
        {
            Some(entry) => {
                entry.failed_reason = Some(reason.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn purge_completed(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut entries = self.entries.write().await;
        let len = entries.len();
        entries.retain(|e| !(e.done && e.completed_at.is_some_and(|at| at < before)));
        Ok((len - entries.len()) as u64)
    }
}
