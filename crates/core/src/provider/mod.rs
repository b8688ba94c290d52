//! Game metadata provider integration (IGDB).
//!
//! Layers, outermost first:
//! - [`GameCatalog`]: what the import reconciler consumes.
//! - [`CatalogClient`]: cache-aside client that obtains tokens, paces calls
//!   through the shared [`RateLimiter`](crate::RateLimiter) and retries once
//!   on a rejected token.
//! - [`ProviderApi`]: raw authenticated HTTP calls, implemented by
//!   [`IgdbApi`].

mod client;
mod credentials;
mod igdb;
mod token;
mod types;

pub use client::{CacheTtls, CatalogClient};
pub use credentials::{ClientCredentials, CredentialStore, StaticCredentialStore};
pub use igdb::IgdbApi;
pub use token::TokenManager;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// The bearer token was rejected.
    #[error("Provider rejected the access token")]
    Unauthorized,

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Token endpoint refused the client credentials.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Client not configured (missing credentials, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::HttpError(err.to_string())
    }
}

/// Raw provider operations, one network round-trip each.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// Exchange client credentials for a bearer token.
    async fn authenticate(
        &self,
        credentials: &ClientCredentials,
    ) -> Result<MintedToken, ProviderError>;

    /// Search games by free text, best match first.
    async fn search_games(
        &self,
        auth: &ProviderAuth,
        query: &str,
        limit: u32,
    ) -> Result<Vec<CatalogItem>, ProviderError>;

    /// Get a game by provider id. Unknown ids yield `None`.
    async fn game_details(
        &self,
        auth: &ProviderAuth,
        provider_id: u64,
    ) -> Result<Option<CatalogItem>, ProviderError>;

    /// Get a platform by provider id. Unknown ids yield `None`.
    async fn platform(
        &self,
        auth: &ProviderAuth,
        provider_platform_id: u64,
    ) -> Result<Option<PlatformInfo>, ProviderError>;
}

/// Catalog lookups on behalf of an account.
#[async_trait]
pub trait GameCatalog: Send + Sync {
    /// Search the catalog by free text.
    async fn search(
        &self,
        account_id: &str,
        query: &str,
    ) -> Result<Vec<CatalogItem>, ProviderError>;

    /// Get a game by provider id.
    async fn details(
        &self,
        account_id: &str,
        provider_id: u64,
    ) -> Result<Option<CatalogItem>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::ApiError {
            status: 500,
            message: "oops".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 500 - oops");
        assert_eq!(
            ProviderError::Unauthorized.to_string(),
            "Provider rejected the access token"
        );
    }
}
