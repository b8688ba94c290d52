//! Mock game catalog for reconciler tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::provider::{CatalogItem, GameCatalog, ProviderError};

/// Mock implementation of the GameCatalog trait.
///
/// Unknown queries return no candidates. Queries are matched ignoring case
/// and outer whitespace.
#[derive(Debug, Default)]
pub struct MockGameCatalog {
    results: Arc<RwLock<HashMap<String, Vec<CatalogItem>>>>,
    failures: Arc<RwLock<HashMap<String, ProviderError>>>,
    /// Recorded `(account_id, query)` searches.
    searches: Arc<RwLock<Vec<(String, String)>>>,
}

impl MockGameCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_search_results(&self, query: &str, items: Vec<CatalogItem>) {
        self.results.write().await.insert(key(query), items);
    }

    /// Make every search for `query` fail with `error`.
    pub async fn fail_search_for(&self, query: &str, error: ProviderError) {
        self.failures.write().await.insert(key(query), error);
    }

    pub async fn searches(&self) -> Vec<(String, String)> {
        self.searches.read().await.clone()
    }

    pub async fn search_count(&self) -> usize {
        self.searches.read().await.len()
    }
}

fn key(query: &str) -> String {
    query.trim().to_lowercase()
}

#[async_trait]
impl GameCatalog for MockGameCatalog {
    async fn search(
        &self,
        account_id: &str,
        query: &str,
    ) -> Result<Vec<CatalogItem>, ProviderError> {
        self.searches
            .write()
            .await
            .push((account_id.to_string(), query.to_string()));

        if let Some(error) = self.failures.read().await.get(&key(query)) {
            return Err(error.clone());
        }

        Ok(self
            .results
            .read()
            .await
            .get(&key(query))
            .cloned()
            .unwrap_or_default())
    }

    async fn details(
        &self,
        _account_id: &str,
        provider_id: u64,
    ) -> Result<Option<CatalogItem>, ProviderError> {
        Ok(self
            .results
            .read()
            .await
            .values()
            .flatten()
            .find(|item| item.provider_id == provider_id)
            .cloned())
    }
}
