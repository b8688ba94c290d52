//! Import reconciliation integration tests.
//!
//! These tests run the reconciler against the real provider client stack
//! (token manager, cache gateway, rate limiter) with a mock provider API and
//! an on-disk library:
//! - Exact, best and ambiguous matches
//! - Idempotent re-import
//! - Per-item failure isolation
//! - Shared rate limit and token across a batch

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::Instant;

use questlog_core::{
    testing::{fixtures, FailingCacheBackend, MockProviderApi, RecordedProviderCall},
    CacheBackend, CacheGateway, CatalogClient, ClientCredentials, ImportOutcome,
    ImportReconciler, ImportRequest, LibraryStore, MatchKind, MemoryCacheBackend, ProviderError,
    RateLimiter, SqliteLibrary, StaticCredentialStore,
};

/// Test helper wiring a reconciler over the real client with mocks at the edges.
struct TestHarness {
    api: Arc<MockProviderApi>,
    library: Arc<SqliteLibrary>,
    reconciler: ImportReconciler,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self::with(Arc::new(MemoryCacheBackend::new()), 1, 1)
    }

    fn with(backend: Arc<dyn CacheBackend>, interval_ms: u64, concurrency: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let library = Arc::new(
            SqliteLibrary::new(&temp_dir.path().join("library.db"))
                .expect("Failed to create library"),
        );
        let api = Arc::new(MockProviderApi::new());
        let credentials = Arc::new(StaticCredentialStore::new(ClientCredentials::new(
            "app-id", "app-secret",
        )));
        let client = CatalogClient::new(
            Arc::clone(&api),
            CacheGateway::new(backend),
            Arc::new(RateLimiter::from_millis(interval_ms)),
            credentials,
        );
        let reconciler = ImportReconciler::new(Arc::new(client), library.clone())
            .with_max_concurrency(concurrency);

        Self {
            api,
            library,
            reconciler,
            _temp_dir: temp_dir,
        }
    }
}

#[tokio::test]
async fn test_mixed_batch() {
    let h = TestHarness::new();
    h.library
        .create_from_catalog_item(&fixtures::catalog_item(1, "Half-Life 2"))
        .unwrap();
    h.api
        .add_search_results(
            "Witcher 3",
            vec![fixtures::full_catalog_item(1942, "The Witcher 3: Wild Hunt")],
        )
        .await;
    h.api
        .add_search_results(
            "Mario",
            vec![
                fixtures::catalog_item(10, "Super Princess Peach"),
                fixtures::catalog_item(11, "Dr. Mario"),
                fixtures::catalog_item(12, "Mario Kart 8"),
            ],
        )
        .await;

    let report = h
        .reconciler
        .reconcile(
            "alice",
            &ImportRequest::new(["Half-Life 2", "Witcher 3", "Mario", "  "]).with_platform("pc"),
        )
        .await
        .unwrap();

    assert_eq!(report.imported.len(), 2);
    assert_eq!(report.imported[0].match_kind, MatchKind::Exact);
    assert_eq!(report.imported[1].match_kind, MatchKind::Best);
    assert_eq!(report.needs_review.len(), 1);
    assert_eq!(report.needs_review[0].candidates.len(), 3);

    // One search per name that missed the library.
    assert_eq!(h.api.search_count().await, 2);

    let witcher = h.library.find_by_provider_id(1942).unwrap().unwrap();
    let genres: Vec<String> = h
        .library
        .game_genres(witcher.id)
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect();
    assert_eq!(genres, vec!["Role-playing (RPG)", "Adventure"]);
    assert_eq!(h.library.user_library("alice").unwrap().len(), 2);
}

#[tokio::test]
async fn test_reimport_is_idempotent() {
    let h = TestHarness::new();
    h.api
        .add_search_results("Hollow Knight", vec![fixtures::catalog_item(5, "Hollow Knight")])
        .await;
    let request = ImportRequest::new(["Hollow Knight"]).with_platform("switch");

    h.reconciler.reconcile("alice", &request).await.unwrap();
    h.api.clear_recorded().await;
    let report = h.reconciler.reconcile("alice", &request).await.unwrap();

    assert_eq!(report.imported[0].match_kind, MatchKind::Exact);
    assert_eq!(h.api.search_count().await, 0);
    let entries = h.library.user_library("alice").unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_local_hit_folds_non_ascii_case() {
    let h = TestHarness::new();
    h.library
        .create_from_catalog_item(&fixtures::catalog_item(37382, "Pokémon Sword"))
        .unwrap();

    let report = h
        .reconciler
        .reconcile(
            "alice",
            &ImportRequest::new(["POKÉMON SWORD"]).with_platform("switch"),
        )
        .await
        .unwrap();

    assert_eq!(report.imported.len(), 1);
    assert!(report.needs_review.is_empty());
    assert_eq!(report.imported[0].match_kind, MatchKind::Exact);
    assert_eq!(report.imported[0].item.provider_id, 37382);
    assert_eq!(h.api.search_count().await, 0);
    assert_eq!(h.library.user_library("alice").unwrap().len(), 1);
}

#[tokio::test]
async fn test_provider_failure_isolated() {
    let h = TestHarness::new();
    h.api
        .add_search_results("Game B", vec![fixtures::catalog_item(2, "Game B")])
        .await;
    h.api
        .set_next_error(ProviderError::ApiError {
            status: 500,
            message: "internal error".to_string(),
        })
        .await;

    let outcomes = h
        .reconciler
        .reconcile_outcomes("alice", &ImportRequest::new(["Game A", "Game B"]))
        .await
        .unwrap();

    match &outcomes[0] {
        ImportOutcome::NeedsReview(review) => {
            assert_eq!(review.search_term, "Game A");
            assert!(review.error.as_deref().unwrap().contains("500"));
        }
        other => panic!("expected review, got {:?}", other),
    }
    match &outcomes[1] {
        ImportOutcome::Imported(game) => assert_eq!(game.item.provider_id, 2),
        other => panic!("expected import, got {:?}", other),
    }
}

#[tokio::test]
async fn test_auth_failure_becomes_review_item() {
    let h = TestHarness::new();
    h.api
        .set_auth_error(ProviderError::AuthFailed("invalid client secret".to_string()))
        .await;
    h.api
        .add_search_results("Game B", vec![fixtures::catalog_item(2, "Game B")])
        .await;

    let report = h
        .reconciler
        .reconcile("alice", &ImportRequest::new(["Game A", "Game B"]))
        .await
        .unwrap();

    // The failed mint is not remembered; "Game B" mints again and succeeds.
    assert_eq!(report.needs_review.len(), 1);
    assert!(report.needs_review[0]
        .error
        .as_deref()
        .unwrap()
        .contains("invalid client secret"));
    assert_eq!(report.imported.len(), 1);
    assert_eq!(h.api.auth_count().await, 2);
}

#[tokio::test]
async fn test_batch_shares_one_token() {
    let h = TestHarness::new();

    h.reconciler
        .reconcile("alice", &ImportRequest::new(["a", "b", "c"]))
        .await
        .unwrap();

    assert_eq!(h.api.auth_count().await, 1);
    let searches: Vec<RecordedProviderCall> = h
        .api
        .recorded_calls()
        .await
        .into_iter()
        .filter(|c| matches!(c, RecordedProviderCall::Search { .. }))
        .collect();
    assert_eq!(searches.len(), 3);
}

#[tokio::test]
async fn test_concurrent_batch_respects_rate_limit() {
    let h = TestHarness::with(Arc::new(MemoryCacheBackend::new()), 60, 4);

    let started = Instant::now();
    let outcomes = h
        .reconciler
        .reconcile_outcomes("alice", &ImportRequest::new(["a", "b", "c", "d"]))
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 4);
    // One token mint plus four searches: four full intervals at minimum.
    assert!(started.elapsed() >= Duration::from_millis(235));
    assert_eq!(h.api.auth_count().await, 1);
}

#[tokio::test]
async fn test_import_works_during_cache_outage() {
    let h = TestHarness::with(Arc::new(FailingCacheBackend::new()), 1, 1);
    h.api
        .add_search_results("Celeste", vec![fixtures::catalog_item(3, "Celeste")])
        .await;

    let report = h
        .reconciler
        .reconcile("alice", &ImportRequest::new(["Celeste"]))
        .await
        .unwrap();

    assert_eq!(report.imported.len(), 1);
    assert_eq!(report.imported[0].match_kind, MatchKind::Exact);
}
