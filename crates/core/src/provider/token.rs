//! Bearer token lifecycle per account.
//!
//! `NoToken -> Fetching -> Valid -> (Expired | Invalidated) -> Fetching -> ...`
//!
//! A valid token lives in the cache gateway. On a miss, one mint per account
//! is in flight at a time; concurrent callers wait on it and get the same
//! token. A failed mint is not remembered, so the next caller retries.

use std::future::Future;

use tracing::{debug, info, warn};

use super::{MintedToken, ProviderError};
use crate::cache::CacheGateway;
use crate::metrics;
use crate::singleflight::SingleFlight;

/// Hands out cached tokens and coordinates minting new ones.
pub struct TokenManager {
    cache: CacheGateway,
    flights: SingleFlight<String, Result<String, ProviderError>>,
}

impl TokenManager {
    pub fn new(cache: CacheGateway) -> Self {
        Self {
            cache,
            flights: SingleFlight::new(),
        }
    }

    /// Get a usable token for `account_id`, calling `mint` on a cache miss.
    ///
    /// `mint` is only invoked (and its future only polled) when this caller
    /// ends up starting the fetch; joiners drop theirs.
    pub async fn token<F, Fut>(&self, account_id: &str, mint: F) -> Result<String, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<MintedToken, ProviderError>> + Send + 'static,
    {
        if let Some(token) = self.cache.get_cached_token(account_id).await {
            return Ok(token);
        }

        let cache = self.cache.clone();
        let account = account_id.to_string();
        let fetch = mint();

        self.flights
            .run(account_id.to_string(), async move {
                // A flight that finished between our cache check and joining
                // may already have stored a token.
                if let Some(token) = cache.get_cached_token(&account).await {
                    return Ok(token);
                }

                info!("Fetching provider token for account {}", account);
                match fetch.await {
                    Ok(minted) => {
                        metrics::TOKEN_FETCHES.with_label_values(&["success"]).inc();
                        cache
                            .cache_token(&account, &minted.access_token, minted.expires_in_secs)
                            .await;
                        Ok(minted.access_token)
                    }
                    Err(e) => {
                        warn!("Token fetch for account {} failed: {}", account, e);
                        metrics::TOKEN_FETCHES.with_label_values(&["error"]).inc();
                        Err(e)
                    }
                }
            })
            .await
    }

    /// Forget the account's token; the next access mints a new one.
    pub async fn invalidate(&self, account_id: &str) {
        info!("Invalidating provider token for account {}", account_id);
        self.cache.invalidate_token(account_id).await;
    }

    /// Invalidate after `rejected` was refused by the provider.
    ///
    /// A no-op when the cache already holds a different token: a concurrent
    /// caller has replaced the rejected one and that replacement stays.
    pub async fn invalidate_rejected(&self, account_id: &str, rejected: &str) {
        match self.cache.get_cached_token(account_id).await {
            Some(current) if current == rejected => self.invalidate(account_id).await,
            Some(_) => debug!(
                "Rejected token for account {} already replaced, keeping cached one",
                account_id
            ),
            None => {}
        }
    }

    /// Whether a token fetch for `account_id` is in progress.
    pub fn is_fetching(&self, account_id: &str) -> bool {
        self.flights.is_in_flight(&account_id.to_string())
    }
}
