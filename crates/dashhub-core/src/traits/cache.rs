//! Cache provider trait for pluggable key-value backends.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// Trait for last-value key-value backends (Redis or in-memory).
///
/// All values are serialized as strings (JSON). The cache provider
/// is responsible for key prefixing and TTL enforcement.
#[async_trait]
pub trait CacheProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key. Returns `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Set a value with the default TTL.
    async fn set_default(&self, key: &str, value: &str) -> AppResult<()>;

    /// Check that the cache backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}

/// Typed JSON access for any [`CacheProvider`], including trait objects.
#[async_trait]
pub trait CacheProviderExt: CacheProvider {
    /// Get a typed value by deserializing from JSON.
    async fn get_json<T: serde::de::DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> AppResult<Option<T>> {
        match self.get(key).await? {
            Some(value) => {
                let parsed = serde_json::from_str(&value)?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// Set a typed value by serializing to JSON.
    async fn set_json<T: serde::Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()> {
        let json = serde_json::to_string(value)?;
        self.set(key, &json, ttl).await
    }
}

impl<C: CacheProvider + ?Sized> CacheProviderExt for C {}
