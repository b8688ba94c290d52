//! Client credentials used to mint provider tokens.
//!
//! How credentials are stored (and encrypted) is up to the implementor of
//! [`CredentialStore`]; the provider client only asks for them in the clear.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;

use super::ProviderError;

/// Client id / secret pair for the provider's token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Source of per-account client credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn credentials(&self, account_id: &str) -> Result<ClientCredentials, ProviderError>;
}

/// Credentials fixed at startup: a shared default plus per-account overrides.
#[derive(Debug, Default)]
pub struct StaticCredentialStore {
    default: Option<ClientCredentials>,
    accounts: HashMap<String, ClientCredentials>,
}

impl StaticCredentialStore {
    /// Store that serves `default` to every account.
    pub fn new(default: ClientCredentials) -> Self {
        Self {
            default: Some(default),
            accounts: HashMap::new(),
        }
    }

    /// Store with no default; only explicitly added accounts resolve.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add credentials for one account.
    pub fn with_account(mut self, account_id: impl Into<String>, creds: ClientCredentials) -> Self {
        self.accounts.insert(account_id.into(), creds);
        self
    }
}

#[async_trait]
impl CredentialStore for StaticCredentialStore {
    async fn credentials(&self, account_id: &str) -> Result<ClientCredentials, ProviderError> {
        self.accounts
            .get(account_id)
            .or(self.default.as_ref())
            .cloned()
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "No provider credentials for account {}",
                    account_id
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secret() {
        let creds = ClientCredentials::new("id", "super-secret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("id"));
        assert!(!debug.contains("super-secret"));
    }

    #[tokio::test]
    async fn test_account_override_and_default() {
        let store = StaticCredentialStore::new(ClientCredentials::new("shared", "s"))
            .with_account("alice", ClientCredentials::new("alice-app", "a"));

        assert_eq!(store.credentials("alice").await.unwrap().client_id, "alice-app");
        assert_eq!(store.credentials("bob").await.unwrap().client_id, "shared");
    }

    #[tokio::test]
    async fn test_unknown_account_without_default() {
        let store = StaticCredentialStore::empty();
        let err = store.credentials("bob").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
