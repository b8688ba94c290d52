//! Cache-aside provider client.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{
    CatalogItem, CredentialStore, GameCatalog, PlatformInfo, ProviderApi, ProviderAuth,
    ProviderError, TokenManager,
};
use crate::cache::CacheGateway;
use crate::config::CacheConfig;
use crate::metrics;
use crate::rate_limiter::RateLimiter;

/// Lifetimes of cached provider responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub search: Duration,
    pub item: Duration,
    pub aux: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for CacheTtls {
    fn from(config: &CacheConfig) -> Self {
        Self {
            search: Duration::from_secs(config.search_ttl_secs),
            item: Duration::from_secs(config.item_ttl_secs),
            aux: Duration::from_secs(config.aux_ttl_secs),
        }
    }
}

/// Provider client: tokens, pacing, caching and one retry on token rejection.
///
/// Every network round-trip, token mints included, goes through the shared
/// [`RateLimiter`].
pub struct CatalogClient<A: ProviderApi> {
    api: Arc<A>,
    cache: CacheGateway,
    limiter: Arc<RateLimiter>,
    tokens: Arc<TokenManager>,
    credentials: Arc<dyn CredentialStore>,
    ttls: CacheTtls,
    search_limit: u32,
}

impl<A: ProviderApi + 'static> CatalogClient<A> {
    pub fn new(
        api: Arc<A>,
        cache: CacheGateway,
        limiter: Arc<RateLimiter>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        let tokens = Arc::new(TokenManager::new(cache.clone()));
        Self {
            api,
            cache,
            limiter,
            tokens,
            credentials,
            ttls: CacheTtls::default(),
            search_limit: 10,
        }
    }

    pub fn with_ttls(mut self, ttls: CacheTtls) -> Self {
        self.ttls = ttls;
        self
    }

    pub fn with_search_limit(mut self, limit: u32) -> Self {
        self.search_limit = limit;
        self
    }

    /// Share a token manager with another client.
    pub fn with_token_manager(mut self, tokens: Arc<TokenManager>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn token_manager(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Get request credentials for `account_id`, minting a token if needed.
    pub async fn authenticate(&self, account_id: &str) -> Result<ProviderAuth, ProviderError> {
        let credentials = self.credentials.credentials(account_id).await?;
        let client_id = credentials.client_id.clone();
        let api = Arc::clone(&self.api);
        let limiter = Arc::clone(&self.limiter);

        let access_token = self
            .tokens
            .token(account_id, move || async move {
                dispatch(&limiter, "authenticate", async {
                    api.authenticate(&credentials).await
                })
                .await
            })
            .await?;

        Ok(ProviderAuth {
            client_id,
            access_token,
        })
    }

    /// Search the provider, serving repeated (normalized) queries from cache.
    pub async fn search(
        &self,
        account_id: &str,
        query: &str,
    ) -> Result<Vec<CatalogItem>, ProviderError> {
        if let Some(items) = self.cache.get_cached_search(query).await {
            return Ok(items);
        }

        let limit = self.search_limit;
        let items = self
            .call(account_id, "search", |api, auth| async move {
                api.search_games(&auth, query, limit).await
            })
            .await?;

        debug!("Provider search '{}' returned {} results", query, items.len());
        self.cache.cache_search(query, &items, self.ttls.search).await;
        Ok(items)
    }

    /// Get a game by provider id. Unknown ids are `Ok(None)` and not cached.
    pub async fn get_details(
        &self,
        account_id: &str,
        provider_id: u64,
    ) -> Result<Option<CatalogItem>, ProviderError> {
        if let Some(item) = self.cache.get_cached_item(provider_id).await {
            return Ok(Some(item));
        }

        let item = self
            .call(account_id, "details", |api, auth| async move {
                api.game_details(&auth, provider_id).await
            })
            .await?;

        match &item {
            Some(item) => self.cache.cache_item(provider_id, item, self.ttls.item).await,
            None => debug!("Provider has no game with id {}", provider_id),
        }
        Ok(item)
    }

    /// Get a platform by provider id. Unknown ids are `Ok(None)` and not cached.
    pub async fn get_platform(
        &self,
        account_id: &str,
        provider_platform_id: u64,
    ) -> Result<Option<PlatformInfo>, ProviderError> {
        if let Some(platform) = self.cache.get_cached_aux(provider_platform_id).await {
            return Ok(Some(platform));
        }

        let platform = self
            .call(account_id, "platform", |api, auth| async move {
                api.platform(&auth, provider_platform_id).await
            })
            .await?;

        if let Some(platform) = &platform {
            self.cache
                .cache_aux(provider_platform_id, platform, self.ttls.aux)
                .await;
        }
        Ok(platform)
    }

    /// Run an authenticated call. A rejected token is invalidated and the
    /// call is retried once with a fresh one.
    async fn call<T, F, Fut>(
        &self,
        account_id: &str,
        operation: &'static str,
        op: F,
    ) -> Result<T, ProviderError>
    where
        F: Fn(Arc<A>, ProviderAuth) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let auth = self.authenticate(account_id).await?;
        let sent_token = auth.access_token.clone();
        match dispatch(&self.limiter, operation, op(Arc::clone(&self.api), auth)).await {
            Err(ProviderError::Unauthorized) => {
                warn!(
                    "Provider rejected token for account {} during {}, retrying once",
                    account_id, operation
                );
                self.tokens
                    .invalidate_rejected(account_id, &sent_token)
                    .await;
                let auth = self.authenticate(account_id).await?;
                dispatch(&self.limiter, operation, op(Arc::clone(&self.api), auth)).await
            }
            result => result,
        }
    }
}

#[async_trait]
impl<A: ProviderApi + 'static> GameCatalog for CatalogClient<A> {
    async fn search(
        &self,
        account_id: &str,
        query: &str,
    ) -> Result<Vec<CatalogItem>, ProviderError> {
        CatalogClient::search(self, account_id, query).await
    }

    async fn details(
        &self,
        account_id: &str,
        provider_id: u64,
    ) -> Result<Option<CatalogItem>, ProviderError> {
        self.get_details(account_id, provider_id).await
    }
}

/// Send one request through the limiter, recording its outcome.
async fn dispatch<T, Fut>(
    limiter: &RateLimiter,
    operation: &'static str,
    request: Fut,
) -> Result<T, ProviderError>
where
    Fut: Future<Output = Result<T, ProviderError>>,
{
    limiter
        .schedule(|| async move {
            let timer = metrics::PROVIDER_DURATION
                .with_label_values(&[operation])
                .start_timer();
            let result = request.await;
            timer.observe_duration();

            let status = match &result {
                Ok(_) => "success",
                Err(e) => error_label(e),
            };
            metrics::PROVIDER_REQUESTS
                .with_label_values(&[operation, status])
                .inc();
            result
        })
        .await
}

fn error_label(error: &ProviderError) -> &'static str {
    match error {
        ProviderError::HttpError(_) => "http_error",
        ProviderError::Unauthorized => "unauthorized",
        ProviderError::RateLimitExceeded => "rate_limited",
        ProviderError::ApiError { .. } => "api_error",
        ProviderError::ParseError(_) => "parse_error",
        ProviderError::AuthFailed(_) => "auth_failed",
        ProviderError::NotConfigured(_) => "not_configured",
    }
}
