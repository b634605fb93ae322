//! # dashhub-realtime
//!
//! Pub/sub transports used by the DashHub scheduler for the remote trigger
//! channel and for job status change events.
//!
//! - **memory**: single-process delivery over Tokio broadcast channels
//! - **redis**: cross-process delivery over Redis `PUBLISH`/`SUBSCRIBE`

pub mod bridge;

pub use bridge::PubSubManager;
pub use bridge::memory_pubsub::MemoryPubSub;
