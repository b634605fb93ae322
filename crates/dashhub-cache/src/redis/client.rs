//! Redis connection management.

use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use dashhub_core::config::cache::RedisCacheConfig;
use dashhub_core::error::{AppError, ErrorKind};
use dashhub_core::result::AppResult;

/// Redis client wrapper with a reconnecting connection manager.
#[derive(Debug, Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
    /// Prepended to every key so several deployments can share one server.
    key_prefix: String,
}

impl RedisClient {
    /// Create a new Redis client from configuration.
    pub async fn connect(config: &RedisCacheConfig) -> AppResult<Self> {
        info!(url = %mask_redis_url(&config.url), "Connecting to Redis cache");

        let client = Client::open(config.url.as_str()).map_err(|e| {
            AppError::with_source(ErrorKind::Cache, "Failed to create Redis client", e)
        })?;

        let conn = ConnectionManager::new(client).await.map_err(|e| {
            AppError::with_source(ErrorKind::Cache, "Failed to connect to Redis", e)
        })?;

        info!("Redis cache connection established");
        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
        })
    }

    /// Get a clone of the connection manager for issuing commands.
    pub fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }

    /// Build a full key with the configured prefix.
    pub fn prefixed_key(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }
}

/// Mask the password in a Redis URL for safe logging.
pub(crate) fn mask_redis_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if colon_pos > scheme_end {
                return format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}
