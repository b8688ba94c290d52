//! Mock provider HTTP API for testing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::provider::{
    CatalogItem, ClientCredentials, MintedToken, PlatformInfo, ProviderApi, ProviderAuth,
    ProviderError,
};

/// A recorded provider call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedProviderCall {
    Authenticate {
        client_id: String,
    },
    Search {
        query: String,
        limit: u32,
        access_token: String,
    },
    Details {
        provider_id: u64,
        access_token: String,
    },
    Platform {
        provider_platform_id: u64,
        access_token: String,
    },
}

/// Mock implementation of the ProviderApi trait.
///
/// Provides controllable behavior for testing:
/// - Mints sequential tokens `token-1`, `token-2`, ...
/// - Returns configured search results, games and platforms
/// - Rejects chosen tokens with `Unauthorized`
/// - Records every call
/// - Simulates failures and slow token endpoints
#[derive(Debug)]
pub struct MockProviderApi {
    /// Search results by lower-cased, trimmed query.
    search_results: Arc<RwLock<HashMap<String, Vec<CatalogItem>>>>,
    items: Arc<RwLock<HashMap<u64, CatalogItem>>>,
    platforms: Arc<RwLock<HashMap<u64, PlatformInfo>>>,
    rejected_tokens: Arc<RwLock<HashSet<String>>>,
    calls: Arc<RwLock<Vec<RecordedProviderCall>>>,
    /// If set, the next non-auth call fails with this error.
    next_error: Arc<RwLock<Option<ProviderError>>>,
    /// If set, the next authenticate call fails with this error.
    auth_error: Arc<RwLock<Option<ProviderError>>>,
    minted: Arc<RwLock<u32>>,
    token_lifetime_secs: Arc<RwLock<u64>>,
    auth_delay: Arc<RwLock<Option<Duration>>>,
}

impl Default for MockProviderApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProviderApi {
    pub fn new() -> Self {
        Self {
            search_results: Arc::new(RwLock::new(HashMap::new())),
            items: Arc::new(RwLock::new(HashMap::new())),
            platforms: Arc::new(RwLock::new(HashMap::new())),
            rejected_tokens: Arc::new(RwLock::new(HashSet::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            auth_error: Arc::new(RwLock::new(None)),
            minted: Arc::new(RwLock::new(0)),
            token_lifetime_secs: Arc::new(RwLock::new(3600)),
            auth_delay: Arc::new(RwLock::new(None)),
        }
    }

    // =========================================================================
    // Data Configuration
    // =========================================================================

    /// Results for a search query (matched ignoring case and outer spaces).
    /// Items are also registered for detail lookups.
    pub async fn add_search_results(&self, query: &str, items: Vec<CatalogItem>) {
        {
            let mut by_id = self.items.write().await;
            for item in &items {
                by_id.insert(item.provider_id, item.clone());
            }
        }
        self.search_results
            .write()
            .await
            .insert(query_key(query), items);
    }

    pub async fn add_item(&self, item: CatalogItem) {
        self.items.write().await.insert(item.provider_id, item);
    }

    pub async fn add_platform(&self, platform: PlatformInfo) {
        self.platforms
            .write()
            .await
            .insert(platform.provider_platform_id, platform);
    }

    // =========================================================================
    // Token Behavior
    // =========================================================================

    /// Answer calls made with `token` with `Unauthorized`.
    pub async fn reject_token(&self, token: &str) {
        self.rejected_tokens.write().await.insert(token.to_string());
    }

    /// Lifetime reported for minted tokens (default 3600s).
    pub async fn set_token_lifetime(&self, secs: u64) {
        *self.token_lifetime_secs.write().await = secs;
    }

    /// Make the token endpoint slow.
    pub async fn set_auth_delay(&self, delay: Duration) {
        *self.auth_delay.write().await = Some(delay);
    }

    // =========================================================================
    // Call Recording
    // =========================================================================

    pub async fn recorded_calls(&self) -> Vec<RecordedProviderCall> {
        self.calls.read().await.clone()
    }

    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    /// Number of token mints requested.
    pub async fn auth_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| matches!(c, RecordedProviderCall::Authenticate { .. }))
            .count()
    }

    /// Number of search calls made.
    pub async fn search_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| matches!(c, RecordedProviderCall::Search { .. }))
            .count()
    }

    // =========================================================================
    // Error Injection
    // =========================================================================

    /// Configure the next search/details/platform call to fail.
    pub async fn set_next_error(&self, error: ProviderError) {
        *self.next_error.write().await = Some(error);
    }

    /// Configure the next authenticate call to fail.
    pub async fn set_auth_error(&self, error: ProviderError) {
        *self.auth_error.write().await = Some(error);
    }

    async fn record(&self, call: RecordedProviderCall) {
        self.calls.write().await.push(call);
    }

    /// Pending injected error, then token rejection.
    async fn check_call(&self, auth: &ProviderAuth) -> Result<(), ProviderError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        if self.rejected_tokens.read().await.contains(&auth.access_token) {
            return Err(ProviderError::Unauthorized);
        }
        Ok(())
    }
}

fn query_key(query: &str) -> String {
    query.trim().to_lowercase()
}

#[async_trait]
impl ProviderApi for MockProviderApi {
    async fn authenticate(
        &self,
        credentials: &ClientCredentials,
    ) -> Result<MintedToken, ProviderError> {
        self.record(RecordedProviderCall::Authenticate {
            client_id: credentials.client_id.clone(),
        })
        .await;

        let delay = *self.auth_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.auth_error.write().await.take() {
            return Err(error);
        }

        let n = {
            let mut minted = self.minted.write().await;
            *minted += 1;
            *minted
        };

        Ok(MintedToken {
            access_token: format!("token-{}", n),
            expires_in_secs: *self.token_lifetime_secs.read().await,
        })
    }

    async fn search_games(
        &self,
        auth: &ProviderAuth,
        query: &str,
        limit: u32,
    ) -> Result<Vec<CatalogItem>, ProviderError> {
        self.record(RecordedProviderCall::Search {
            query: query.to_string(),
            limit,
            access_token: auth.access_token.clone(),
        })
        .await;
        self.check_call(auth).await?;

        let results = self.search_results.read().await;
        Ok(results
            .get(&query_key(query))
            .map(|items| items.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn game_details(
        &self,
        auth: &ProviderAuth,
        provider_id: u64,
    ) -> Result<Option<CatalogItem>, ProviderError> {
        self.record(RecordedProviderCall::Details {
            provider_id,
            access_token: auth.access_token.clone(),
        })
        .await;
        self.check_call(auth).await?;

        Ok(self.items.read().await.get(&provider_id).cloned())
    }

    async fn platform(
        &self,
        auth: &ProviderAuth,
        provider_platform_id: u64,
    ) -> Result<Option<PlatformInfo>, ProviderError> {
        self.record(RecordedProviderCall::Platform {
            provider_platform_id,
            access_token: auth.access_token.clone(),
        })
        .await;
        self.check_call(auth).await?;

        Ok(self
            .platforms
            .read()
            .await
            .get(&provider_platform_id)
            .cloned())
    }
}
