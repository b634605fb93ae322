//! Pub/sub manager that dispatches to the configured transport.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use dashhub_core::config::pubsub::PubSubConfig;
use dashhub_core::error::AppError;
use dashhub_core::result::AppResult;
use dashhub_core::traits::pubsub::{PubSubProvider, Subscription};

use super::memory_pubsub::MemoryPubSub;

/// Pub/sub manager wrapping the configured transport.
#[derive(Debug, Clone)]
pub struct PubSubManager {
    inner: Arc<dyn PubSubProvider>,
}

impl PubSubManager {
    /// Create a new pub/sub manager from configuration.
    pub async fn new(config: &PubSubConfig) -> AppResult<Self> {
        let inner: Arc<dyn PubSubProvider> = match config.provider.as_str() {
            "memory" => {
                info!(buffer_size = config.buffer_size, "Initializing in-memory pub/sub");
                Arc::new(MemoryPubSub::new(config.buffer_size))
            }
            #[cfg(feature = "redis-pubsub")]
            "redis" => {
                info!("Initializing Redis pub/sub");
                Arc::new(super::redis_pubsub::RedisPubSub::connect(&config.redis_url).await?)
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown pub/sub provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }
}

#[async_trait]
impl PubSubProvider for PubSubManager {
    async fn publish(&self, channel: &str, message: &str) -> AppResult<()> {
        self.inner.publish(channel, message).await
    }

    async fn subscribe(&self, channel: &str) -> AppResult<Subscription> {
        self.inner.subscribe(channel).await
    }
}
