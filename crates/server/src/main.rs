use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use questlog_core::{
    load_config, validate_config, CacheBackend, CacheBackendKind, CacheGateway, CacheTtls,
    CatalogClient, ClientCredentials, GameCatalog, IgdbApi, ImportReconciler, LibraryStore,
    MemoryCacheBackend, RateLimiter, SqliteCacheBackend, SqliteLibrary, StaticCredentialStore,
};

use questlog_server::api::create_router;
use questlog_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How often expired rows are swept from the SQLite cache.
const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("QUESTLOG_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Cache backend: {:?}", config.cache.backend);

    // Provider cache
    let cache_backend: Arc<dyn CacheBackend> = match config.cache.backend {
        CacheBackendKind::Memory => Arc::new(MemoryCacheBackend::new()),
        CacheBackendKind::Sqlite => {
            let path = config
                .cache
                .path
                .as_deref()
                .context("cache.path is required for the sqlite cache backend")?;
            let backend = Arc::new(SqliteCacheBackend::new(path));
            spawn_cache_purge(Arc::clone(&backend));
            backend as Arc<dyn CacheBackend>
        }
    };
    let cache = CacheGateway::new(cache_backend);

    // Provider client
    let api = Arc::new(IgdbApi::new(&config.provider).context("Failed to create provider client")?);
    let limiter = Arc::new(RateLimiter::from_millis(config.provider.rate_limit_ms));
    let credentials = Arc::new(StaticCredentialStore::new(ClientCredentials::new(
        config.provider.client_id.clone(),
        config.provider.client_secret.clone(),
    )));
    info!(
        "Provider client ready (rate limit: one call per {:?})",
        limiter.interval()
    );
    let catalog: Arc<dyn GameCatalog> = Arc::new(
        CatalogClient::new(api, cache, limiter, credentials)
            .with_ttls(CacheTtls::from(&config.cache))
            .with_search_limit(config.provider.search_limit),
    );

    // Local library
    let library: Arc<dyn LibraryStore> = Arc::new(
        SqliteLibrary::new(&config.database.path).context("Failed to open library database")?,
    );

    let reconciler = ImportReconciler::new(catalog, library)
        .with_max_concurrency(config.import.max_concurrency);

    // Build app state
    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, reconciler));

    // Build router
    let app = create_router(state);

    // Start server
    info!("Starting questlog v{} on {}", VERSION, addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Periodically drop expired entries so the cache file does not grow
/// without bound. Expired rows are already ignored on read.
fn spawn_cache_purge(backend: Arc<SqliteCacheBackend>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(CACHE_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            match backend.purge_expired().await {
                Ok(0) => {}
                Ok(n) => info!(removed = n, "Purged expired cache entries"),
                Err(e) => warn!(error = %e, "Cache purge failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
