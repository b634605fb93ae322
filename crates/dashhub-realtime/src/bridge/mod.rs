//! Bridges between the scheduler and the configured pub/sub transport.

pub mod manager;
pub mod memory_pubsub;
pub mod redis_pubsub;

pub use manager::PubSubManager;
