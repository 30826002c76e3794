//! Cache and store error types.

/// Errors raised by a [`KeyValueStore`](crate::KeyValueStore) backend.
///
/// [`CacheLayer`](crate::CacheLayer) never propagates these; they are logged
/// and turned into a miss or a failed write.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No connection could be checked out of the Redis pool.
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Redis rejected or failed a command.
    #[error("Redis command error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The in-memory store holds its maximum number of live entries.
    #[error("Store is full ({max_entries} entries)")]
    Full {
        /// Configured entry limit.
        max_entries: usize,
    },

    /// The backend is not reachable for another reason.
    #[error("Store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Creates a new `Unavailable` error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Errors raised while deriving cache keys.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The key fields could not be represented as JSON.
    #[error("Cache key serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
