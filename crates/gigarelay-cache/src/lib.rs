//! Best-effort caching on top of a shared key-value store.
//!
//! ## Architecture
//!
//! - **[`KeyValueStore`]**: string get/set with optional TTL. Backed by Redis
//!   ([`RedisStore`]) when configured, or by an in-process map
//!   ([`MemoryStore`]) otherwise.
//! - **[`CacheLayer`]**: wraps a store and turns every store failure into a
//!   cache miss or a skipped write, so callers never fail because the cache
//!   is down.
//! - **[`CacheKey`]**: deterministic `cache:<sha256>` keys derived from any
//!   serializable set of fields.
//!
//! ## Lookup flow
//!
//! ```text
//! remember(key) → get(key) ─ hit ──────────────────────────→ value
//!                    └──── miss → compute() → set(key, ttl) → value
//! ```
//!
//! ## Graceful Degradation
//!
//! If Redis is unavailable at startup, [`create_store`] falls back to a
//! local store. Runtime Redis failures degrade to compute-and-skip-cache.

pub mod backend;
pub mod error;
pub mod key;
pub mod layer;
pub mod store;

pub use backend::{
    DEFAULT_MAX_ENTRIES, DEFAULT_SWEEP_INTERVAL, MemoryStore, RedisConfig, RedisStore, create_store,
};
pub use error::{CacheError, StoreError};
pub use key::{CACHE_KEY_PREFIX, CacheKey, ServiceId, compute_cache_key};
pub use layer::CacheLayer;
pub use store::KeyValueStore;
