//! Queue entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One enqueued unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct QueueEntry {
    /// Unique entry identifier.
    pub id: Uuid,
    /// Name of the queue that processes this entry.
    pub queue_name: String,
    /// Serialized payload (JSON).
    pub payload: serde_json::Value,
    /// The entry becomes eligible once this instant has passed.
    pub execution_date: DateTime<Utc>,
    /// Set once the queue callback has succeeded.
    pub done: bool,
    /// Set when the payload can no longer be decoded; never retried.
    pub failed_reason: Option<String>,
    /// When the entry was enqueued.
    pub created_at: DateTime<Utc>,
    /// When the entry was marked done.
    pub completed_at: Option<DateTime<Utc>>,
}

impl QueueEntry {
    /// Build a fresh, undone entry.
    pub fn new(
        queue_name: impl Into<String>,
        payload: serde_json::Value,
        execution_date: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            queue_name: queue_name.into(),
            payload,
            execution_date,
            done: false,
            failed_reason: None,
            created_at,
            completed_at: None,
        }
    }

    /// Whether the worker should pick this entry up at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.done && self.failed_reason.is_none() && self.execution_date <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_is_due_boundaries() {
        let now = Utc::now();
        let entry = QueueEntry::new("welcome-email", serde_json::json!({}), now, now);

        assert!(entry.is_due(now));
        assert!(!entry.is_due(now - Duration::seconds(1)));
    }

    #[test]
    fn test_done_or_failed_entries_are_never_due() {
        let now = Utc::now();
        let mut done = QueueEntry::new("q", serde_json::json!({}), now, now);
        done.done = true;
        let mut failed = QueueEntry::new("q", serde_json::json!({}), now, now);
        failed.failed_reason = Some("missing field `userId`".to_string());

        assert!(!done.is_due(now));
        assert!(!failed.is_due(now));
    }
}
