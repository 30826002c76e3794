//! Store backends: Redis (shared across instances) and a local DashMap.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::KeyValueStore;

/// Redis connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Use Redis (falls back to the local store without it)
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis host name
    #[serde(default = "default_redis_host")]
    pub host: String,

    /// Redis port
    #[serde(default = "default_redis_port")]
    pub port: u16,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_enabled() -> bool {
    false
}

fn default_redis_host() -> String {
    "redis".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            host: default_redis_host(),
            port: default_redis_port(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

impl RedisConfig {
    /// Connection URL built from host and port.
    pub fn url(&self) -> String {
        format!("redis://{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Debug)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// How often [`MemoryStore`] sweeps expired entries on write.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Entry limit of a [`MemoryStore`] created with [`MemoryStore::new`].
pub const DEFAULT_MAX_ENTRIES: usize = 100_000;

/// Single-instance store backed by a `DashMap`.
///
/// Used when Redis is disabled or unreachable, and in tests. An expired entry
/// is dropped when it is read, and all expired entries are swept by the first
/// write after each sweep interval. Once `max_entries` live entries are held,
/// writes of new keys fail until something expires.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, MemoryEntry>>,
    last_sweep: Arc<Mutex<Instant>>,
    sweep_interval: Duration,
    max_entries: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            last_sweep: Arc::new(Mutex::new(Instant::now())),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Number of entries currently held, including not yet collected expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.entries.len(), "Swept expired entries");
        }
        removed
    }

    /// Sweep if the interval has passed. Concurrent writers skip instead of waiting.
    fn sweep_if_due(&self) {
        let Ok(mut last) = self.last_sweep.try_lock() else {
            return;
        };
        if last.elapsed() < self.sweep_interval {
            return;
        }
        *last = Instant::now();
        drop(last);
        self.cleanup_expired();
    }

    fn has_room_for(&self, key: &str) -> bool {
        if self.entries.len() < self.max_entries || self.entries.contains_key(key) {
            return true;
        }
        self.cleanup_expired();
        self.entries.len() < self.max_entries
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                return Ok(Some(entry.value.clone()));
            }
            drop(entry);
            // A fresh value written since the check above stays.
            self.entries.remove_if(key, |_, entry| entry.is_expired());
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.sweep_if_due();
        if !self.has_room_for(key) {
            return Err(StoreError::Full {
                max_entries: self.max_entries,
            });
        }

        let expires_at = ttl
            .filter(|ttl| !ttl.is_zero())
            .map(|ttl| Instant::now() + ttl);
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

/// Store shared across instances, backed by a deadpool Redis pool.
///
/// Redis expiry has whole-second resolution: sub-second TTLs are rounded up
/// to one second, and a zero TTL is written without expiry.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.pool.get().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        match ttl.filter(|ttl| !ttl.is_zero()) {
            Some(ttl) => {
                let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
                let _: () = conn.set_ex(key, value, secs).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "redis"
    }
}

/// Create a store based on configuration.
///
/// - **Redis disabled**: returns a [`MemoryStore`]
/// - **Redis enabled**: connects to Redis, falls back to a [`MemoryStore`]
///   if the pool cannot be created or the first connection fails
pub async fn create_store(config: &RedisConfig) -> Arc<dyn KeyValueStore> {
    if !config.enabled {
        tracing::info!("Redis disabled, using local store only");
        return Arc::new(MemoryStore::new());
    }

    let url = config.url();
    tracing::info!(url = %url, "Connecting to Redis");

    let mut redis_config = deadpool_redis::Config::from_url(url);
    let timeout = Duration::from_millis(config.timeout_ms);
    let pool_config = redis_config
        .pool
        .get_or_insert_with(|| deadpool_redis::PoolConfig::new(config.pool_size));
    pool_config.max_size = config.pool_size;
    pool_config.timeouts.wait = Some(timeout);
    pool_config.timeouts.create = Some(timeout);
    pool_config.timeouts.recycle = Some(timeout);

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local store."
            );
            return Arc::new(MemoryStore::new());
        }
    };

    let store = RedisStore::new(pool);
    match store.ping().await {
        Ok(()) => {
            tracing::info!("Connected to Redis");
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to local store."
            );
            Arc::new(MemoryStore::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_get_set() {
        let store = MemoryStore::new();
        store.set("k", "v", None).await.unwrap();

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.get("missing").await.unwrap(), None);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_overwrite() {
        let store = MemoryStore::new();
        store.set("k", "first", None).await.unwrap();
        store.set("k", "second", None).await.unwrap();

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_memory_store_expiration() {
        let store = MemoryStore::new();
        store
            .set("expiring", "v", Some(Duration::from_millis(50)))
            .await
            .unwrap();

        assert!(store.get("expiring").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(store.get("expiring").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_sweeps_expired_entries_on_write() {
        let store = MemoryStore::new().with_sweep_interval(Duration::from_millis(10));
        for i in 0..10_000 {
            store
                .set(&format!("k{i}"), "v", Some(Duration::from_millis(1)))
                .await
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        store.set("fresh", "v", None).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("fresh").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_memory_store_cleanup_expired() {
        let store = MemoryStore::new();
        store.set("short", "v", Some(Duration::from_millis(5))).await.unwrap();
        store.set("long", "v", Some(Duration::from_secs(60))).await.unwrap();
        store.set("forever", "v", None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_memory_store_max_entries() {
        let store = MemoryStore::new().with_max_entries(2);
        store.set("a", "1", None).await.unwrap();
        store.set("b", "2", Some(Duration::from_millis(5))).await.unwrap();

        // Overwriting an existing key is always allowed.
        store.set("a", "updated", None).await.unwrap();

        let err = store.set("c", "3", None).await.unwrap_err();
        assert!(matches!(err, StoreError::Full { max_entries: 2 }));

        // Room is made once an entry expires.
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.set("c", "3", None).await.unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("updated"));
    }

    #[tokio::test]
    async fn test_memory_store_expired_read_keeps_rewritten_value() {
        let store = MemoryStore::new();
        store.set("k", "old", Some(Duration::from_millis(5))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        store.set("k", "new", None).await.unwrap();

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_zero_ttl_never_expires() {
        let store = MemoryStore::new();
        store.set("k", "v", Some(Duration::ZERO)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_create_store_disabled_uses_memory() {
        let store = create_store(&RedisConfig::default()).await;
        assert_eq!(store.kind(), "memory");
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_create_store_unreachable_falls_back() {
        let config = RedisConfig {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 1,
            pool_size: 1,
            timeout_ms: 200,
        };

        let store = create_store(&config).await;
        assert_eq!(store.kind(), "memory");
    }

    #[test]
    fn test_redis_url() {
        let config = RedisConfig::default();
        assert_eq!(config.url(), "redis://redis:6379");
    }
}
