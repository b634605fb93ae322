//! In-memory pub/sub for single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use dashhub_core::result::AppResult;
use dashhub_core::traits::pubsub::{PubSubProvider, Subscription};

/// In-memory pub/sub implementation.
#[derive(Debug)]
pub struct MemoryPubSub {
    /// Channel name → broadcast sender
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
    /// Buffer size for channels
    buffer_size: usize,
}

impl MemoryPubSub {
    /// Create a new in-memory pub/sub
    pub fn new(buffer_size: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Number of live subscribers on a channel.
    pub async fn subscriber_count(&self, channel: &str) -> usize {
        let channels = self.channels.read().await;
        channels.get(channel).map_or(0, |tx| tx.receiver_count())
    }
}

impl Default for MemoryPubSub {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl PubSubProvider for MemoryPubSub {
    async fn publish(&self, channel: &str, message: &str) -> AppResult<()> {
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(channel) {
            // No receivers is not an error; the message is dropped.
            let _ = tx.send(message.to_string());
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> AppResult<Subscription> {
        let rx = {
            let mut channels = self.channels.write().await;
            let tx = channels
                .entry(channel.to_string())
                .or_insert_with(|| broadcast::channel(self.buffer_size).0);
            tx.subscribe()
        };

        let channel = channel.to_string();
        let stream = futures::stream::unfold(rx, move |mut rx| {
            let channel = channel.clone();
            async move {
                loop {
                    match rx.recv().await {
                        Ok(msg) => return Some((msg, rx)),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(channel = %channel, skipped, "Pub/sub subscriber lagged");
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            }
        });

        Ok(stream.boxed())
    }
}
