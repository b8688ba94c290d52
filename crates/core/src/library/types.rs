//! Library record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::provider::CatalogItem;

/// A game in the local catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalGame {
    /// Local row id.
    pub id: i64,
    pub provider_id: u64,
    pub name: String,
    pub slug: String,
    /// Provider snapshot the record was created from.
    pub item: CatalogItem,
    pub created_at: DateTime<Utc>,
}

/// A genre in the local catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalGenre {
    pub id: i64,
    pub provider_genre_id: u64,
    pub name: String,
}

/// A game on a platform in a user's library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub user_id: String,
    pub game_id: i64,
    pub platform_id: String,
    pub added_at: DateTime<Utc>,
}

/// Play progress for a game on a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: String,
    pub game_id: i64,
    pub platform_id: String,
    /// "backlog" for newly imported games.
    pub status: String,
    pub playtime_minutes: i64,
}

/// Errors from library storage.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
