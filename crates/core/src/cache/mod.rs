//! Provider response cache.
//!
//! The [`CacheGateway`] is a cache-aside layer in front of the provider
//! client. It stores search results, item details, platform lookups and
//! bearer tokens in a pluggable key-value [`CacheBackend`]. The cache is an
//! optimization only: every gateway method is total, and a backend outage
//! degrades to "always ask the provider".

mod gateway;
mod memory;
mod sqlite;

pub use gateway::{CacheGateway, MAX_CACHE_TTL_SECS, TOKEN_EXPIRY_BUFFER_SECS};
pub use memory::MemoryCacheBackend;
pub use sqlite::SqliteCacheBackend;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a cache backend.
///
/// These never leave the [`CacheGateway`].
#[derive(Debug, Error)]
pub enum CacheBackendError {
    /// Backend could not be reached or opened.
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    /// Backend did not answer in time.
    #[error("Cache backend timed out")]
    Timeout,

    /// Backend answered with an error.
    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// Key-value store with per-entry expiry.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get the raw value stored under `key`, if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheBackendError>;

    /// Store `value` under `key` for `ttl`.
    async fn set_with_expiry(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheBackendError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheBackendError>;
}
