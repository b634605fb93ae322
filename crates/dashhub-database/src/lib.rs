//! # dashhub-database
//!
//! Queue entry persistence for DashHub: the [`QueueStore`] trait, a
//! PostgreSQL repository, and an in-memory store for single-process
//! deployments and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryQueueStore;
pub use repositories::queue_entry::PgQueueStore;
pub use store::{QueueStore, connect_queue_store};
