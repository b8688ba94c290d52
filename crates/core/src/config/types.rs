use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub provider: ProviderConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Database configuration (local game library)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("questlog.db")
}

/// Game metadata provider (IGDB) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Twitch application client id.
    pub client_id: String,
    /// Twitch application client secret.
    pub client_secret: String,
    /// IGDB API base URL (default: https://api.igdb.com/v4).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// OAuth token endpoint (default: https://id.twitch.tv/oauth2/token).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Minimum spacing between outbound calls in milliseconds (default: 250).
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
    /// Maximum candidates requested per search (default: 10).
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
}

fn default_timeout() -> u32 {
    30
}

fn default_rate_limit_ms() -> u64 {
    250
}

fn default_search_limit() -> u32 {
    10
}

/// Which key-value store backs the provider cache.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    #[default]
    Memory,
    Sqlite,
}

/// Provider response cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackendKind,
    /// Database file (required when backend = "sqlite")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_search_ttl")]
    pub search_ttl_secs: u64,
    #[serde(default = "default_item_ttl")]
    pub item_ttl_secs: u64,
    #[serde(default = "default_aux_ttl")]
    pub aux_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::default(),
            path: None,
            search_ttl_secs: default_search_ttl(),
            item_ttl_secs: default_item_ttl(),
            aux_ttl_secs: default_aux_ttl(),
        }
    }
}

fn default_search_ttl() -> u64 {
    60 * 60
}

fn default_item_ttl() -> u64 {
    24 * 60 * 60
}

fn default_aux_ttl() -> u64 {
    7 * 24 * 60 * 60
}

/// Bulk import configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportConfig {
    /// Names reconciled at once (default: 1, sequential).
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_max_concurrency() -> usize {
    1
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub provider: SanitizedProviderConfig,
    pub cache: CacheConfig,
    pub import: ImportConfig,
}

/// Sanitized provider config (client secret hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProviderConfig {
    pub client_id: String,
    pub client_secret_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub timeout_secs: u32,
    pub rate_limit_ms: u64,
    pub search_limit: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            provider: SanitizedProviderConfig {
                client_id: config.provider.client_id.clone(),
                client_secret_configured: !config.provider.client_secret.is_empty(),
                base_url: config.provider.base_url.clone(),
                timeout_secs: config.provider.timeout_secs,
                rate_limit_ms: config.provider.rate_limit_ms,
                search_limit: config.provider.search_limit,
            },
            cache: config.cache.clone(),
            import: config.import.clone(),
        }
    }
}
