//! Deterministic cache key derivation.
//!
//! A key is built from any serializable set of fields:
//!
//! 1. serialize to a JSON value,
//! 2. sort every object's entries by key (recursively),
//! 3. render compact JSON and take its SHA-256 digest,
//! 4. prefix the hex digest with [`CACHE_KEY_PREFIX`].
//!
//! Two logically equal inputs therefore map to the same key regardless of
//! field order. The digest only has to be collision-tolerant for caching;
//! keys are not a security boundary.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::CacheError;

/// Namespace prefix of every derived cache key.
pub const CACHE_KEY_PREFIX: &str = "cache:";

/// A derived cache key (`cache:<hex sha256>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the cache key for `fields`.
///
/// Fails only if `fields` cannot be represented as JSON (for example a map
/// with non-string keys).
///
/// # Example
///
/// ```
/// use gigarelay_cache::compute_cache_key;
/// use serde_json::json;
///
/// let a = compute_cache_key(&json!({"model": "GigaChat", "payload": "hi"})).unwrap();
/// let b = compute_cache_key(&json!({"payload": "hi", "model": "GigaChat"})).unwrap();
/// assert_eq!(a, b);
/// assert!(a.as_str().starts_with("cache:"));
/// ```
pub fn compute_cache_key<T: Serialize + ?Sized>(fields: &T) -> Result<CacheKey, CacheError> {
    let canonical = canonicalize(serde_json::to_value(fields)?);
    let rendered = serde_json::to_string(&canonical)?;
    let digest = Sha256::digest(rendered.as_bytes());
    Ok(CacheKey(format!("{CACHE_KEY_PREFIX}{}", hex::encode(digest))))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Stable name of a cached logical operation.
///
/// The name becomes part of every cache key the operation produces, so it is
/// assigned by hand and must not change between releases unless the cached
/// values should be abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ServiceId(&'static str);

impl ServiceId {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
