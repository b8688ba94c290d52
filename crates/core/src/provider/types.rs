//! Internal shapes for provider data.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of one provider game at fetch time.
///
/// Never mutated; a re-fetch replaces it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Provider game id.
    pub provider_id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub platforms: Vec<PlatformInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub franchise_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<NaiveDate>,
    /// Aggregate rating (0-100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub genres: Vec<GenreRef>,
    #[serde(default)]
    pub store_links: Vec<StoreLink>,
}

impl CatalogItem {
    /// Genre names in provider order.
    pub fn genre_names(&self) -> Vec<&str> {
        self.genres.iter().map(|g| g.name.as_str()).collect()
    }
}

/// A platform as described by the provider. Also the auxiliary cache record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformInfo {
    pub provider_platform_id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
}

/// A genre reference carrying the provider's genre id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenreRef {
    pub provider_genre_id: u64,
    pub name: String,
}

/// Link to a storefront page for the game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreLink {
    /// Store short name (e.g. "steam", "gog").
    pub slug: String,
    pub url: String,
}

/// Token returned by the provider's authentication endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedToken {
    pub access_token: String,
    pub expires_in_secs: u64,
}

/// A bearer token held for one account. Only ever lives in the cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenRecord {
    pub account_id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Build a record expiring `expires_in_secs` from now.
    pub fn new(account_id: &str, token: &str, expires_in_secs: u64) -> Self {
        let expires_at = i64::try_from(expires_in_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            account_id: account_id.to_string(),
            token: token.to_string(),
            expires_at,
        }
    }
}

/// Credentials presented on every provider request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAuth {
    pub client_id: String,
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_item_serializes_camel_case() {
        let item = CatalogItem {
            provider_id: 1942,
            name: "The Witcher 3: Wild Hunt".to_string(),
            slug: "the-witcher-3-wild-hunt".to_string(),
            cover_url: None,
            platforms: vec![],
            franchise_name: Some("The Witcher".to_string()),
            release_date: NaiveDate::from_ymd_opt(2015, 5, 19),
            rating: Some(93.5),
            genres: vec![GenreRef {
                provider_genre_id: 12,
                name: "Role-playing (RPG)".to_string(),
            }],
            store_links: vec![],
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["providerId"], 1942);
        assert_eq!(json["franchiseName"], "The Witcher");
        assert_eq!(json["releaseDate"], "2015-05-19");
        assert_eq!(json["genres"][0]["providerGenreId"], 12);
        assert!(json.get("coverUrl").is_none());
        assert_eq!(item.genre_names(), vec!["Role-playing (RPG)"]);
    }

    #[test]
    fn test_token_record_expiry() {
        let record = TokenRecord::new("acct", "tok", 3600);
        let remaining = record.expires_at - Utc::now();
        assert!(remaining.num_seconds() > 3590);
        assert!(remaining.num_seconds() <= 3600);
    }
}
