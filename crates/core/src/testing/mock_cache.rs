//! Cache backends for exercising the gateway's failure handling.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{CacheBackend, CacheBackendError};

/// Backend whose every operation fails, as if the store were unreachable.
#[derive(Debug, Default)]
pub struct FailingCacheBackend;

impl FailingCacheBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheBackend for FailingCacheBackend {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheBackendError> {
        Err(CacheBackendError::Unavailable("connection refused".to_string()))
    }

    async fn set_with_expiry(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _ttl: Duration,
    ) -> Result<(), CacheBackendError> {
        Err(CacheBackendError::Timeout)
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheBackendError> {
        Err(CacheBackendError::Unavailable("connection refused".to_string()))
    }
}

/// In-memory backend that records every write with its TTL.
///
/// TTLs are recorded, not enforced.
#[derive(Debug, Default)]
pub struct RecordingCacheBackend {
    values: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    writes: Arc<Mutex<Vec<(String, Duration)>>>,
}

impl RecordingCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// All writes so far as `(key, ttl)`, oldest first.
    pub fn writes(&self) -> Vec<(String, Duration)> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Store raw bytes directly, bypassing the gateway.
    pub fn insert_raw(&self, key: &str, value: &[u8]) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_vec());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }
}

#[async_trait]
impl CacheBackend for RecordingCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheBackendError> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheBackendError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((key.to_string(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheBackendError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}
