//! Typed, namespaced, fail-open access to the cache backend.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::CacheBackend;
use crate::metrics;
use crate::provider::{CatalogItem, PlatformInfo, TokenRecord};

/// Safety margin subtracted from the provider's token lifetime.
pub const TOKEN_EXPIRY_BUFFER_SECS: u64 = 60;

/// Longest lifetime any cache entry is given (one year).
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

const SEARCH_PREFIX: &str = "search:";
const ITEM_PREFIX: &str = "item:";
const PLATFORM_PREFIX: &str = "platform:";
const TOKEN_PREFIX: &str = "token:";

/// Cache-aside gateway shared by every account and request.
#[derive(Clone)]
pub struct CacheGateway {
    backend: Arc<dyn CacheBackend>,
}

impl CacheGateway {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Normalize a search query: trim, lower-case, collapse whitespace runs.
    pub fn normalize_query(query: &str) -> String {
        query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn search_key(query: &str) -> String {
        format!("{}{}", SEARCH_PREFIX, Self::normalize_query(query))
    }

    pub fn item_key(provider_id: u64) -> String {
        format!("{}{}", ITEM_PREFIX, provider_id)
    }

    pub fn platform_key(provider_platform_id: u64) -> String {
        format!("{}{}", PLATFORM_PREFIX, provider_platform_id)
    }

    pub fn token_key(account_id: &str) -> String {
        format!("{}{}", TOKEN_PREFIX, account_id)
    }

    // =========================================================================
    // Search results
    // =========================================================================

    pub async fn get_cached_search(&self, query: &str) -> Option<Vec<CatalogItem>> {
        self.read("search", &Self::search_key(query)).await
    }

    pub async fn cache_search(&self, query: &str, items: &[CatalogItem], ttl: Duration) {
        self.write("search", &Self::search_key(query), &items, ttl)
            .await;
    }

    // =========================================================================
    // Item details
    // =========================================================================

    pub async fn get_cached_item(&self, provider_id: u64) -> Option<CatalogItem> {
        self.read("item", &Self::item_key(provider_id)).await
    }

    pub async fn cache_item(&self, provider_id: u64, item: &CatalogItem, ttl: Duration) {
        self.write("item", &Self::item_key(provider_id), item, ttl)
            .await;
    }

    // =========================================================================
    // Auxiliary lookups (platforms)
    // =========================================================================

    pub async fn get_cached_aux(&self, provider_platform_id: u64) -> Option<PlatformInfo> {
        self.read("platform", &Self::platform_key(provider_platform_id))
            .await
    }

    pub async fn cache_aux(&self, provider_platform_id: u64, record: &PlatformInfo, ttl: Duration) {
        self.write(
            "platform",
            &Self::platform_key(provider_platform_id),
            record,
            ttl,
        )
        .await;
    }

    // =========================================================================
    // Bearer tokens
    // =========================================================================

    /// Cached bearer token for `account_id`, if one is still usable.
    pub async fn get_cached_token(&self, account_id: &str) -> Option<String> {
        let record: TokenRecord = self.read("token", &Self::token_key(account_id)).await?;
        if record.expires_at <= Utc::now() {
            return None;
        }
        Some(record.token)
    }

    /// Cache a freshly minted token.
    ///
    /// The entry lives for `expires_in_secs - TOKEN_EXPIRY_BUFFER_SECS`.
    /// Tokens that would not outlive the buffer are not stored at all.
    /// Lifetimes past [`MAX_CACHE_TTL_SECS`] are capped.
    pub async fn cache_token(&self, account_id: &str, token: &str, expires_in_secs: u64) {
        let expires_in_secs = expires_in_secs.min(MAX_CACHE_TTL_SECS + TOKEN_EXPIRY_BUFFER_SECS);
        if expires_in_secs <= TOKEN_EXPIRY_BUFFER_SECS {
            debug!(
                "Not caching token for account {}: lifetime {}s within expiry buffer",
                account_id, expires_in_secs
            );
            return;
        }

        let record = TokenRecord::new(account_id, token, expires_in_secs);
        let ttl = Duration::from_secs(expires_in_secs - TOKEN_EXPIRY_BUFFER_SECS);
        self.write("token", &Self::token_key(account_id), &record, ttl)
            .await;
    }

    /// Drop the cached token so the next access mints a new one.
    pub async fn invalidate_token(&self, account_id: &str) {
        if let Err(e) = self.backend.delete(&Self::token_key(account_id)).await {
            warn!("Cache delete failed for token of {}: {}", account_id, e);
            metrics::CACHE_ERRORS.with_label_values(&["delete"]).inc();
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn read<T: DeserializeOwned>(&self, kind: &'static str, key: &str) -> Option<T> {
        let bytes = match self.backend.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("Cache miss: {}", key);
                metrics::CACHE_LOOKUPS.with_label_values(&[kind, "miss"]).inc();
                return None;
            }
            Err(e) => {
                warn!("Cache read failed for {}, treating as miss: {}", key, e);
                metrics::CACHE_ERRORS.with_label_values(&["get"]).inc();
                metrics::CACHE_LOOKUPS.with_label_values(&[kind, "miss"]).inc();
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                debug!("Cache hit: {}", key);
                metrics::CACHE_LOOKUPS.with_label_values(&[kind, "hit"]).inc();
                Some(value)
            }
            Err(e) => {
                warn!("Discarding malformed cache entry {}: {}", key, e);
                metrics::CACHE_LOOKUPS
                    .with_label_values(&[kind, "malformed"])
                    .inc();
                None
            }
        }
    }

    async fn write<T: Serialize + ?Sized>(
        &self,
        kind: &'static str,
        key: &str,
        value: &T,
        ttl: Duration,
    ) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to serialize {} cache entry {}: {}", kind, key, e);
                return;
            }
        };

        let ttl = ttl.min(Duration::from_secs(MAX_CACHE_TTL_SECS));
        if let Err(e) = self.backend.set_with_expiry(key, bytes, ttl).await {
            warn!("Cache write failed for {}: {}", key, e);
            metrics::CACHE_ERRORS.with_label_values(&["set"]).inc();
        }
    }
}
