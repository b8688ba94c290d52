pub mod cache;
pub mod config;
pub mod import;
pub mod library;
pub mod metrics;
pub mod provider;
pub mod rate_limiter;
pub mod singleflight;
pub mod testing;

pub use cache::{
    CacheBackend, CacheBackendError, CacheGateway, MemoryCacheBackend, SqliteCacheBackend,
    MAX_CACHE_TTL_SECS, TOKEN_EXPIRY_BUFFER_SECS,
};
pub use config::{
    load_config, load_config_from_str, validate_config, CacheBackendKind, CacheConfig, Config,
    ConfigError, DatabaseConfig, ImportConfig, ProviderConfig, SanitizedConfig, ServerConfig,
};
pub use import::{
    select_match, ImportError, ImportOutcome, ImportReconciler, ImportReport, ImportRequest,
    ImportedGame, MatchDecision, MatchKind, ReviewItem,
};
pub use library::{
    LibraryEntry, LibraryError, LibraryStore, LocalGame, LocalGenre, ProgressRecord,
    SqliteLibrary,
};
pub use provider::{
    CacheTtls, CatalogClient, CatalogItem, ClientCredentials, CredentialStore, GameCatalog,
    GenreRef, IgdbApi, MintedToken, PlatformInfo, ProviderApi, ProviderAuth, ProviderError,
    StaticCredentialStore, StoreLink, TokenManager, TokenRecord,
};
pub use rate_limiter::RateLimiter;
pub use singleflight::SingleFlight;
