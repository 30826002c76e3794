//! The key-value store abstraction shared by the cache and credential layers.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

/// A shared string key-value store with optional per-key expiry.
///
/// Individual key operations are assumed to be serialized by the store;
/// no cross-key transactions are offered or required.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key doesn't exist or has expired.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// With `ttl = Some(_)` the key expires after that duration; with `None`
    /// it lives until overwritten.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Check that the store is reachable (for readiness checks).
    async fn ping(&self) -> Result<(), StoreError>;

    /// Short backend name used in logs.
    fn kind(&self) -> &'static str;
}
