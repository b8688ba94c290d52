//! Common test utilities for API testing with mocks.
//!
//! Builds an in-process router over a mock game catalog and a real SQLite
//! library in a temporary directory.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use questlog_core::{
    testing::MockGameCatalog, CacheConfig, Config, DatabaseConfig, GameCatalog, ImportConfig,
    ImportReconciler, LibraryStore, ProviderConfig, ServerConfig, SqliteLibrary,
};
use questlog_server::api::create_router;
use questlog_server::state::AppState;

/// Re-export fixtures for test convenience
pub use questlog_core::testing::fixtures;

/// Test fixture with a controllable catalog.
pub struct TestFixture {
    pub router: Router,
    /// Mock catalog - configure search results per query
    pub catalog: Arc<MockGameCatalog>,
    /// The library behind the router, for asserting on stored rows
    pub library: Arc<SqliteLibrary>,
    /// Keeps the database directory alive
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("library.db");

        let config = Config {
            provider: ProviderConfig {
                client_id: "test-client".to_string(),
                client_secret: "super-secret".to_string(),
                base_url: None,
                auth_url: None,
                timeout_secs: 5,
                rate_limit_ms: 10,
                search_limit: 10,
            },
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            cache: CacheConfig::default(),
            import: ImportConfig::default(),
        };

        let catalog = Arc::new(MockGameCatalog::new());
        let library = Arc::new(SqliteLibrary::new(&db_path).expect("Failed to open library"));

        let reconciler = ImportReconciler::new(
            Arc::clone(&catalog) as Arc<dyn GameCatalog>,
            Arc::clone(&library) as Arc<dyn LibraryStore>,
        );
        let state = Arc::new(AppState::new(config, reconciler));

        Self {
            router: create_router(state),
            catalog,
            library,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body.to_string())).await
    }

    /// Send a POST request with a raw body (for malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        self.request("POST", path, Some(body.to_string())).await
    }

    async fn request(&self, method: &str, path: &str, body: Option<String>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        let body = match body {
            Some(json) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(json)
            }
            None => Body::empty(),
        };
        let request = builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body, text }
    }
}
