//! Local game library: catalog records created from provider snapshots,
//! their genres, and per-user library associations.
//!
//! Every write here is idempotent. Creating a game that already exists (by
//! provider id) returns the stored record, and the link/attach operations
//! report whether a new row was actually inserted.

mod sqlite;
mod types;

pub use sqlite::SqliteLibrary;
pub use types::*;

use crate::provider::CatalogItem;

/// Trait for local library storage.
pub trait LibraryStore: Send + Sync {
    /// Find a game by case-insensitive exact name.
    fn find_by_name(&self, name: &str) -> Result<Option<LocalGame>, LibraryError>;

    /// Find a game by provider id.
    fn find_by_provider_id(&self, provider_id: u64) -> Result<Option<LocalGame>, LibraryError>;

    /// Create a game record from a provider snapshot.
    ///
    /// If a record with the same provider id exists it is returned unchanged.
    fn create_from_catalog_item(&self, item: &CatalogItem) -> Result<LocalGame, LibraryError>;

    /// Get the genre with this provider genre id, creating it if absent.
    fn find_or_create_genre(
        &self,
        provider_genre_id: u64,
        name: &str,
    ) -> Result<LocalGenre, LibraryError>;

    /// Link a genre to a game. Returns false if the link already existed.
    fn link_genre(&self, game_id: i64, genre_id: i64) -> Result<bool, LibraryError>;

    /// Add a game on a platform to a user's library.
    /// Returns false if the association already existed.
    fn attach_to_user_library(
        &self,
        user_id: &str,
        game_id: i64,
        platform_id: &str,
    ) -> Result<bool, LibraryError>;

    /// Create the default progress record. Returns false if one existed.
    fn create_default_progress(
        &self,
        user_id: &str,
        game_id: i64,
        platform_id: &str,
    ) -> Result<bool, LibraryError>;

    /// Genres linked to a game.
    fn game_genres(&self, game_id: i64) -> Result<Vec<LocalGenre>, LibraryError>;

    /// A user's library associations, oldest first.
    fn user_library(&self, user_id: &str) -> Result<Vec<LibraryEntry>, LibraryError>;

    /// Progress for one user/game/platform.
    fn progress(
        &self,
        user_id: &str,
        game_id: i64,
        platform_id: &str,
    ) -> Result<Option<ProgressRecord>, LibraryError>;
}
