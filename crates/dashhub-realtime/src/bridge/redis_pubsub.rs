//! Redis pub/sub bridge for multi-process deployments.

#[cfg(feature = "redis-pubsub")]
pub mod implementation {
    use async_trait::async_trait;
    use futures::StreamExt;
    use redis::aio::MultiplexedConnection;
    use tracing::{info, warn};

    use dashhub_core::error::{AppError, ErrorKind};
    use dashhub_core::result::AppResult;
    use dashhub_core::traits::pubsub::{PubSubProvider, Subscription};

    /// Redis pub/sub bridge for cross-process signalling.
    #[derive(Clone)]
    pub struct RedisPubSub {
        client: redis::Client,
        /// Shared connection for `PUBLISH`.
        publisher: MultiplexedConnection,
    }

    impl std::fmt::Debug for RedisPubSub {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RedisPubSub").finish_non_exhaustive()
        }
    }

    impl RedisPubSub {
        /// Connect to Redis for publishing and subscribing.
        pub async fn connect(url: &str) -> AppResult<Self> {
            info!("Connecting to Redis pub/sub");

            let client = redis::Client::open(url).map_err(|e| {
                AppError::with_source(ErrorKind::PubSub, "Failed to create Redis client", e)
            })?;

            let publisher = client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::PubSub, "Redis connection failed", e)
                })?;

            Ok(Self { client, publisher })
        }
    }

    #[async_trait]
    impl PubSubProvider for RedisPubSub {
        async fn publish(&self, channel: &str, message: &str) -> AppResult<()> {
            let mut conn = self.publisher.clone();
            redis::cmd("PUBLISH")
                .arg(channel)
                .arg(message)
                .query_async::<i64>(&mut conn)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::PubSub, "Redis PUBLISH failed", e)
                })?;

            Ok(())
        }

        async fn subscribe(&self, channel: &str) -> AppResult<Subscription> {
            let mut pubsub = self.client.get_async_pubsub().await.map_err(|e| {
                AppError::with_source(ErrorKind::PubSub, "Redis pub/sub connection failed", e)
            })?;

            pubsub.subscribe(channel).await.map_err(|e| {
                AppError::with_source(ErrorKind::PubSub, "Redis SUBSCRIBE failed", e)
            })?;

            let channel = channel.to_string();
            let stream = pubsub.into_on_message().filter_map(move |msg| {
                let payload = match msg.get_payload::<String>() {
                    Ok(payload) => Some(payload),
                    Err(e) => {
                        warn!(channel = %channel, error = %e, "Dropping non-text pub/sub payload");
                        None
                    }
                };
                futures::future::ready(payload)
            });

            Ok(stream.boxed())
        }
    }
}

#[cfg(feature = "redis-pubsub")]
pub use implementation::RedisPubSub;
