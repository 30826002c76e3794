//! Best-effort cache over a [`KeyValueStore`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::store::KeyValueStore;

/// Memoization layer over a shared store.
///
/// Store failures never reach the caller: reads degrade to a miss and
/// writes report `false`. Cloning is cheap and shares the store.
#[derive(Clone)]
pub struct CacheLayer {
    store: Arc<dyn KeyValueStore>,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Get a value, or `None` on a miss or store failure.
    pub async fn get(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(Some(value)) => {
                tracing::debug!(key = %key, "cache hit");
                Some(value)
            }
            Ok(None) => {
                tracing::debug!(key = %key, "cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(key = %key, store = self.store.kind(), error = %e, "cache GET error");
                None
            }
        }
    }

    /// Store a value. Returns `false` if the store rejected the write.
    ///
    /// Cache writes are advisory: callers must not depend on them.
    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool {
        match self.store.set(key, value, ttl).await {
            Ok(()) => {
                tracing::debug!(key = %key, ttl_secs = ?ttl.map(|t| t.as_secs()), "cache set");
                true
            }
            Err(e) => {
                tracing::warn!(key = %key, store = self.store.kind(), error = %e, "cache SET error");
                false
            }
        }
    }

    /// Return the cached value for `key`, or compute, store and return it.
    ///
    /// The computed value is returned even if storing it fails. Errors from
    /// `compute` are returned as-is and nothing is stored.
    ///
    /// Concurrent misses on the same key are not de-duplicated: each caller
    /// runs `compute` independently and the last write wins.
    pub async fn remember<F, Fut, E>(&self, key: &str, ttl: Duration, compute: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        if let Some(cached) = self.get(key).await {
            return Ok(cached);
        }

        let value = compute().await?;
        self.set(key, &value, Some(ttl)).await;
        Ok(value)
    }

    /// Check if the store is reachable (for health checks).
    pub async fn is_available(&self) -> bool {
        self.store.ping().await.is_ok()
    }
}
