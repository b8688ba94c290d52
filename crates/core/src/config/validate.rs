use super::{
    types::{CacheBackendKind, Config},
    ConfigError,
};
use crate::cache::MAX_CACHE_TTL_SECS;

/// Validate configuration
/// Currently validates:
/// - Provider section exists (enforced by serde) and carries credentials
/// - Server port is not 0
/// - Rate limit interval, cache TTLs and import concurrency are non-zero
/// - Cache TTLs do not exceed one year
/// - SQLite cache backend has a path
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.provider.client_id.trim().is_empty() || config.provider.client_secret.is_empty() {
        return Err(ConfigError::ValidationError(
            "provider.client_id and provider.client_secret are required".to_string(),
        ));
    }

    if config.provider.rate_limit_ms == 0 {
        return Err(ConfigError::ValidationError(
            "provider.rate_limit_ms cannot be 0".to_string(),
        ));
    }

    if config.provider.search_limit == 0 {
        return Err(ConfigError::ValidationError(
            "provider.search_limit cannot be 0".to_string(),
        ));
    }

    let cache = &config.cache;
    if cache.search_ttl_secs == 0 || cache.item_ttl_secs == 0 || cache.aux_ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "cache TTLs must be greater than 0".to_string(),
        ));
    }

    let longest = cache
        .search_ttl_secs
        .max(cache.item_ttl_secs)
        .max(cache.aux_ttl_secs);
    if longest > MAX_CACHE_TTL_SECS {
        return Err(ConfigError::ValidationError(format!(
            "cache TTLs cannot exceed {} seconds",
            MAX_CACHE_TTL_SECS
        )));
    }

    if cache.backend == CacheBackendKind::Sqlite && cache.path.is_none() {
        return Err(ConfigError::ValidationError(
            "cache.path is required when cache.backend = \"sqlite\"".to_string(),
        ));
    }

    if config.import.max_concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "import.max_concurrency cannot be 0".to_string(),
        ));
    }

    Ok(())
}
