//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. Every section has defaults, so an empty configuration yields a
//! fully in-memory scheduler.

pub mod cache;
pub mod database;
pub mod logging;
pub mod pubsub;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::cache::CacheConfig;
pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::pubsub::PubSubConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Queue entry store settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Job status store settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Trigger and status channel transport settings.
    #[serde(default)]
    pub pubsub: PubSubConfig,
    /// Scheduler and queue worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `DASHHUB__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("DASHHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
