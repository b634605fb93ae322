//! Queue entry store trait and provider selection.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use dashhub_core::config::DatabaseConfig;
use dashhub_core::error::AppError;
use dashhub_core::result::AppResult;
use dashhub_entity::queue::QueueEntry;

use crate::connection::DatabasePool;
use crate::memory::MemoryQueueStore;
use crate::migration::run_migrations;
use crate::repositories::queue_entry::PgQueueStore;

/// Shared store of queue entries.
///
/// Every mutation touches exactly one entry; no operation needs a
/// multi-entry transaction.
#[async_trait]
pub trait QueueStore: Send + Sync + std::fmt::Debug + 'static {
    /// Durably record a new entry.
    async fn insert(&self, entry: &QueueEntry) -> AppResult<()>;

    /// Entries with `execution_date <= now` that are neither done nor
    /// permanently failed, oldest first.
    async fn find_due(&self, now: DateTime<Utc>) -> AppResult<Vec<QueueEntry>>;

    /// Find an entry by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<QueueEntry>>;

    /// Mark an entry done. Returns `false` if it was already done or missing.
    async fn mark_done(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool>;

    /// Record a permanent failure so the entry is never picked up again.
    async fn mark_failed(&self, id: Uuid, reason: &str) -> AppResult<bool>;

    /// Delete done entries completed before `before`. Returns the count.
    async fn purge_completed(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

/// Build the configured queue store.
///
/// For PostgreSQL this connects and runs pending migrations, so a returned
/// store is ready for use.
pub async fn connect_queue_store(config: &DatabaseConfig) -> AppResult<Arc<dyn QueueStore>> {
    match config.provider.as_str() {
        "postgres" => {
            info!("Initializing PostgreSQL queue store");
            let db = DatabasePool::connect(config).await?;
            run_migrations(db.pool()).await?;
            Ok(Arc::new(PgQueueStore::new(db.into_pool())))
        }
        "memory" => {
            info!("Initializing in-memory queue store");
            Ok(Arc::new(MemoryQueueStore::new()))
        }
        other => Err(AppError::configuration(format!(
            "Unknown queue store provider: '{other}'. Supported: memory, postgres"
        ))),
    }
}
