//! Pub/sub provider trait for cross-process signalling.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::result::AppResult;

/// Stream of message payloads received on one channel.
///
/// The stream ends when the underlying transport closes.
pub type Subscription = BoxStream<'static, String>;

/// Trait for publish/subscribe transports (Redis or in-process).
///
/// Delivery is fire-and-forget: a message published while nobody is
/// subscribed is dropped.
#[async_trait]
pub trait PubSubProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Publish a message to a channel.
    async fn publish(&self, channel: &str, message: &str) -> AppResult<()>;

    /// Subscribe to a channel.
    async fn subscribe(&self, channel: &str) -> AppResult<Subscription>;
}
