//! IGDB API client.
//!
//! IGDB requires:
//! - A Twitch application (client id + secret) exchanged for an app access
//!   token via the client-credentials grant
//! - `Client-ID` and `Authorization: Bearer` headers on every call
//! - Apicalypse query bodies POSTed to each endpoint
//! - Rate limiting: 4 requests per second (enforced by the caller)

use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use super::types::{CatalogItem, GenreRef, MintedToken, PlatformInfo, ProviderAuth, StoreLink};
use super::{ClientCredentials, ProviderApi, ProviderError};
use crate::config::ProviderConfig;

const DEFAULT_BASE_URL: &str = "https://api.igdb.com/v4";
const DEFAULT_AUTH_URL: &str = "https://id.twitch.tv/oauth2/token";
const COVER_URL_BASE: &str = "https://images.igdb.com/igdb/image/upload/t_cover_big";

const GAME_FIELDS: &str = "name,slug,cover.image_id,platforms.name,platforms.abbreviation,\
franchise.name,franchises.name,first_release_date,rating,genres.name,websites.category,websites.url";

const PLATFORM_FIELDS: &str = "name,abbreviation";

/// IGDB API client.
pub struct IgdbApi {
    client: Client,
    base_url: String,
    auth_url: String,
}

impl IgdbApi {
    /// Create a new IGDB client.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_secs)))
            .build()?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let auth_url = config
            .auth_url
            .clone()
            .unwrap_or_else(|| DEFAULT_AUTH_URL.to_string());

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_url,
        })
    }

    /// POST an Apicalypse query to an endpoint and decode the result list.
    async fn query<T: for<'de> Deserialize<'de>>(
        &self,
        auth: &ProviderAuth,
        endpoint: &str,
        body: String,
    ) -> Result<Vec<T>, ProviderError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        debug!("IGDB query: endpoint={}, body='{}'", endpoint, body);

        let response = self
            .client
            .post(&url)
            .header("Client-ID", &auth.client_id)
            .header("Accept", "application/json")
            .bearer_auth(&auth.access_token)
            .body(body)
            .send()
            .await?;

        let response = check_status(response).await?;

        response.json().await.map_err(|e| {
            ProviderError::ParseError(format!("Failed to parse {} response: {}", endpoint, e))
        })
    }
}

#[async_trait::async_trait]
impl ProviderApi for IgdbApi {
    async fn authenticate(
        &self,
        credentials: &ClientCredentials,
    ) -> Result<MintedToken, ProviderError> {
        debug!("IGDB authenticate: client_id={}", credentials.client_id);

        let response = self
            .client
            .post(&self.auth_url)
            .query(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == 400 || status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            warn!("Token endpoint refused credentials: {}", status);
            return Err(ProviderError::AuthFailed(body));
        }
        let response = check_status(response).await?;

        let token: TwitchTokenResponse = response.json().await.map_err(|e| {
            ProviderError::ParseError(format!("Failed to parse token response: {}", e))
        })?;

        Ok(MintedToken {
            access_token: token.access_token,
            expires_in_secs: token.expires_in,
        })
    }

    async fn search_games(
        &self,
        auth: &ProviderAuth,
        query: &str,
        limit: u32,
    ) -> Result<Vec<CatalogItem>, ProviderError> {
        let body = format!(
            "search \"{}\"; fields {}; limit {};",
            escape_query(query),
            GAME_FIELDS,
            limit.min(500) // IGDB max is 500
        );

        let games: Vec<IgdbGame> = self.query(auth, "games", body).await?;
        Ok(games.into_iter().map(CatalogItem::from).collect())
    }

    async fn game_details(
        &self,
        auth: &ProviderAuth,
        provider_id: u64,
    ) -> Result<Option<CatalogItem>, ProviderError> {
        let body = format!("fields {}; where id = {};", GAME_FIELDS, provider_id);

        let games: Vec<IgdbGame> = self.query(auth, "games", body).await?;
        Ok(games.into_iter().next().map(CatalogItem::from))
    }

    async fn platform(
        &self,
        auth: &ProviderAuth,
        provider_platform_id: u64,
    ) -> Result<Option<PlatformInfo>, ProviderError> {
        let body = format!(
            "fields {}; where id = {};",
            PLATFORM_FIELDS, provider_platform_id
        );

        let platforms: Vec<IgdbPlatform> = self.query(auth, "platforms", body).await?;
        Ok(platforms.into_iter().next().map(PlatformInfo::from))
    }
}

/// Map non-success statuses to provider errors.
async fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status == 401 || status == 403 {
        return Err(ProviderError::Unauthorized);
    }
    if status == 429 {
        warn!("IGDB rate limit exceeded");
        return Err(ProviderError::RateLimitExceeded);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::ApiError {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(response)
}

/// Escape a search term for an Apicalypse string literal.
fn escape_query(query: &str) -> String {
    query.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Cover image URL for an IGDB image id.
fn cover_url(image_id: &str) -> String {
    format!("{}/{}.jpg", COVER_URL_BASE, image_id)
}

/// Store short name for a website category, if the category is a storefront.
fn store_slug(category: u32) -> Option<&'static str> {
    match category {
        10 | 11 => Some("app-store"),
        12 => Some("google-play"),
        13 => Some("steam"),
        15 => Some("itch"),
        16 => Some("epic"),
        17 => Some("gog"),
        // 1 official, 2 wikia, 3 wikipedia, 4 facebook, 5 twitter, 6 twitch,
        // 8 instagram, 9 youtube, 14 reddit, 18 discord
        _ => None,
    }
}

/// Derive a URL slug from a game name.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn release_date(unix_secs: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(unix_secs, 0).map(|dt| dt.date_naive())
}

// ============================================================================
// IGDB API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TwitchTokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct IgdbGame {
    id: u64,
    name: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    cover: Option<IgdbCover>,
    #[serde(default)]
    platforms: Vec<IgdbPlatform>,
    #[serde(default)]
    franchise: Option<IgdbFranchise>,
    #[serde(default)]
    franchises: Vec<IgdbFranchise>,
    #[serde(default)]
    first_release_date: Option<i64>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    genres: Vec<IgdbGenre>,
    #[serde(default)]
    websites: Vec<IgdbWebsite>,
}

#[derive(Debug, Deserialize)]
struct IgdbCover {
    #[serde(default)]
    image_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IgdbPlatform {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    abbreviation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IgdbFranchise {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IgdbGenre {
    id: u64,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IgdbWebsite {
    #[serde(default)]
    category: Option<u32>,
    url: String,
}

// ============================================================================
// Conversions
// ============================================================================

impl From<IgdbGame> for CatalogItem {
    fn from(game: IgdbGame) -> Self {
        let slug = game
            .slug
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| slugify(&game.name));

        let cover_url = game
            .cover
            .and_then(|c| c.image_id)
            .map(|image_id| cover_url(&image_id));

        let franchise_name = game
            .franchise
            .and_then(|f| f.name)
            .or_else(|| game.franchises.into_iter().find_map(|f| f.name));

        let genres = game
            .genres
            .into_iter()
            .filter_map(|g| {
                g.name.map(|name| GenreRef {
                    provider_genre_id: g.id,
                    name,
                })
            })
            .collect();

        let store_links = game
            .websites
            .into_iter()
            .filter_map(|w| {
                let slug = store_slug(w.category?)?;
                Some(StoreLink {
                    slug: slug.to_string(),
                    url: w.url,
                })
            })
            .collect();

        CatalogItem {
            provider_id: game.id,
            name: game.name,
            slug,
            cover_url,
            platforms: game.platforms.into_iter().map(PlatformInfo::from).collect(),
            franchise_name,
            release_date: game.first_release_date.and_then(release_date),
            rating: game.rating,
            genres,
            store_links,
        }
    }
}

impl From<IgdbPlatform> for PlatformInfo {
    fn from(p: IgdbPlatform) -> Self {
        Self {
            provider_platform_id: p.id,
            name: p.name.unwrap_or_default(),
            abbreviation: p.abbreviation,
        }
    }
}
