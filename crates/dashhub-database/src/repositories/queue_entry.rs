//! Queue entry repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use dashhub_core::error::{AppError, ErrorKind};
use dashhub_core::result::AppResult;
use dashhub_entity::queue::QueueEntry;

use crate::store::QueueStore;

/// PostgreSQL-backed queue entry store.
#[derive(Debug, Clone)]
pub struct PgQueueStore {
    pool: PgPool,
}

impl PgQueueStore {
    /// Create a new queue entry repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueStore for PgQueueStore {
    async fn insert(&self, entry: &QueueEntry) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO queue_entries \
             (id, queue_name, payload, execution_date, done, failed_reason, created_at, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(entry.id)
        .bind(&entry.queue_name)
        .bind(&entry.payload)
        .bind(entry.execution_date)
        .bind(entry.done)
        .bind(&entry.failed_reason)
        .bind(entry.created_at)
        .bind(entry.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert queue entry", e))?;
        Ok(())
    }

    async fn find_due(&self, now: DateTime<Utc>) -> AppResult<Vec<QueueEntry>> {
        sqlx::query_as::<_, QueueEntry>(
            "SELECT * FROM queue_entries \
             WHERE execution_date <= $1 AND done = FALSE AND failed_reason IS NULL \
             ORDER BY execution_date ASC, created_at ASC",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list due entries", e))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<QueueEntry>> {
        sqlx::query_as::<_, QueueEntry>("SELECT * FROM queue_entries WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find queue entry", e)
            })
    }

    async fn mark_done(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE queue_entries SET done = TRUE, completed_at = $2 \
             WHERE id = $1 AND done = FALSE",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark queue entry done", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(&self, id: Uuid, reason: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE queue_entries SET failed_reason = $2 \
             WHERE id = $1 AND done = FALSE AND failed_reason IS NULL",
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark queue entry failed", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_completed(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result =
            sqlx::query("DELETE FROM queue_entries WHERE done = TRUE AND completed_at < $1")
                .bind(before)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Database,
                        "Failed to purge completed queue entries",
                        e,
                    )
                })?;
        Ok(result.rows_affected())
    }
}
