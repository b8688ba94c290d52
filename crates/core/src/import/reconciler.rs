//! Import reconciler.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{
    select_match, ImportError, ImportOutcome, ImportReport, ImportRequest, ImportedGame,
    MatchDecision, MatchKind, ReviewItem,
};
use crate::library::{LibraryError, LibraryStore, LocalGame};
use crate::metrics;
use crate::provider::{CatalogItem, GameCatalog, ProviderError};

/// Failure while processing one name. Never escapes the reconciler.
#[derive(Debug, Error)]
enum ItemError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Library(#[from] LibraryError),
}

/// Reconciles free-text game names against the library and the provider.
pub struct ImportReconciler {
    catalog: Arc<dyn GameCatalog>,
    library: Arc<dyn LibraryStore>,
    max_concurrency: usize,
}

impl ImportReconciler {
    pub fn new(catalog: Arc<dyn GameCatalog>, library: Arc<dyn LibraryStore>) -> Self {
        Self {
            catalog,
            library,
            max_concurrency: 1,
        }
    }

    /// Process up to `n` names at once. Provider calls stay paced by the
    /// catalog's shared limiter.
    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }

    /// Reconcile a batch and partition the outcomes.
    pub async fn reconcile(
        &self,
        user_id: &str,
        request: &ImportRequest,
    ) -> Result<ImportReport, ImportError> {
        let outcomes = self.reconcile_outcomes(user_id, request).await?;
        let report = ImportReport::from(outcomes);

        info!(
            "Import for user {}: {} imported, {} need review",
            user_id,
            report.imported.len(),
            report.needs_review.len()
        );
        Ok(report)
    }

    /// Reconcile a batch: one outcome per non-blank name, in input order.
    ///
    /// Only an empty name list is an error; every per-name failure is
    /// returned as a `NeedsReview` outcome carrying the message.
    pub async fn reconcile_outcomes(
        &self,
        user_id: &str,
        request: &ImportRequest,
    ) -> Result<Vec<ImportOutcome>, ImportError> {
        if request.raw_names.is_empty() {
            return Err(ImportError::EmptyRequest);
        }

        let platform_id = request.target_platform_id.as_deref();
        let terms: Vec<&str> = request
            .raw_names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .collect();

        debug!(
            "Reconciling {} names for user {} (concurrency {})",
            terms.len(),
            user_id,
            self.max_concurrency
        );

        let pending: Vec<_> = terms
            .into_iter()
            .map(|term| self.reconcile_one(user_id, term, platform_id))
            .collect();
        let outcomes = stream::iter(pending)
            .buffered(self.max_concurrency)
            .collect()
            .await;

        Ok(outcomes)
    }

    async fn reconcile_one(
        &self,
        user_id: &str,
        term: &str,
        platform_id: Option<&str>,
    ) -> ImportOutcome {
        let outcome = match self.try_reconcile(user_id, term, platform_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Import of '{}' for user {} failed: {}", term, user_id, e);
                metrics::IMPORT_OUTCOMES.with_label_values(&["error"]).inc();
                return ImportOutcome::NeedsReview(ReviewItem {
                    search_term: term.to_string(),
                    candidates: Vec::new(),
                    error: Some(e.to_string()),
                });
            }
        };

        let label = match &outcome {
            ImportOutcome::Imported(game) => game.match_kind.as_str(),
            ImportOutcome::NeedsReview(_) => "needs_review",
        };
        metrics::IMPORT_OUTCOMES.with_label_values(&[label]).inc();
        outcome
    }

    async fn try_reconcile(
        &self,
        user_id: &str,
        term: &str,
        platform_id: Option<&str>,
    ) -> Result<ImportOutcome, ItemError> {
        if let Some(local) = self.library.find_by_name(term)? {
            debug!("'{}' already in library as game {}", term, local.id);
            self.attach(user_id, &local, platform_id)?;
            return Ok(imported(term, local, MatchKind::Exact));
        }

        let mut candidates = self.catalog.search(user_id, term).await?;

        let (item, match_kind) = match select_match(term, &candidates) {
            MatchDecision::Exact(idx) => (candidates.swap_remove(idx), MatchKind::Exact),
            MatchDecision::Best => (candidates.swap_remove(0), MatchKind::Best),
            MatchDecision::NoCandidates | MatchDecision::Ambiguous => {
                debug!(
                    "'{}' needs review ({} candidates)",
                    term,
                    candidates.len()
                );
                return Ok(ImportOutcome::NeedsReview(ReviewItem {
                    search_term: term.to_string(),
                    candidates,
                    error: None,
                }));
            }
        };

        let local = match self.library.find_by_provider_id(item.provider_id)? {
            Some(local) => local,
            None => self.create_game(&item)?,
        };
        self.attach(user_id, &local, platform_id)?;

        Ok(ImportOutcome::Imported(ImportedGame {
            search_term: term.to_string(),
            game_id: local.id,
            item,
            match_kind,
        }))
    }

    /// Create the library record and link its genres.
    fn create_game(&self, item: &CatalogItem) -> Result<LocalGame, LibraryError> {
        let game = self.library.create_from_catalog_item(item)?;
        for genre in &item.genres {
            let local_genre = self
                .library
                .find_or_create_genre(genre.provider_genre_id, &genre.name)?;
            self.library.link_genre(game.id, local_genre.id)?;
        }
        info!(
            "Added '{}' (provider id {}) to the library as game {}",
            game.name, game.provider_id, game.id
        );
        Ok(game)
    }

    fn attach(
        &self,
        user_id: &str,
        game: &LocalGame,
        platform_id: Option<&str>,
    ) -> Result<(), LibraryError> {
        let Some(platform_id) = platform_id else {
            return Ok(());
        };
        if self
            .library
            .attach_to_user_library(user_id, game.id, platform_id)?
        {
            debug!(
                "Attached game {} on {} to user {}",
                game.id, platform_id, user_id
            );
        }
        self.library
            .create_default_progress(user_id, game.id, platform_id)?;
        Ok(())
    }
}

fn imported(term: &str, local: LocalGame, match_kind: MatchKind) -> ImportOutcome {
    ImportOutcome::Imported(ImportedGame {
        search_term: term.to_string(),
        game_id: local.id,
        item: local.item,
        match_kind,
    })
}
