//! Pub/sub transport configuration.

use serde::{Deserialize, Serialize};

/// Pub/sub provider configuration.
///
/// The `memory` provider only reaches subscribers inside the same process;
/// use `redis` when the trigger publisher runs in another process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubSubConfig {
    /// Provider type: `"memory"` or `"redis"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Per-channel buffer size for the in-memory provider.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            redis_url: default_redis_url(),
            buffer_size: default_buffer_size(),
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_buffer_size() -> usize {
    256
}
