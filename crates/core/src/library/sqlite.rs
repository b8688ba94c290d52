//! SQLite-backed local library.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{LibraryEntry, LibraryError, LibraryStore, LocalGame, LocalGenre, ProgressRecord};
use crate::provider::CatalogItem;

const GAME_COLUMNS: &str = "id, provider_id, name, slug, snapshot_json, created_at";

/// SQLite-backed library store.
pub struct SqliteLibrary {
    conn: Mutex<Connection>,
}

impl SqliteLibrary {
    /// Open (or create) the library database at `path`.
    pub fn new(path: &Path) -> Result<Self, LibraryError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory library (useful for testing).
    pub fn in_memory() -> Result<Self, LibraryError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), LibraryError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- One row per provider game
            CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                provider_id INTEGER NOT NULL UNIQUE,
                name TEXT NOT NULL,
                -- Unicode lower-case of name; SQLite's lower() only folds ASCII
                name_folded TEXT NOT NULL,
                slug TEXT NOT NULL,
                cover_url TEXT,
                release_date TEXT,
                rating REAL,
                snapshot_json TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_games_name_folded ON games(name_folded);

            CREATE TABLE IF NOT EXISTS genres (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                provider_genre_id INTEGER NOT NULL UNIQUE,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS game_genres (
                game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
                genre_id INTEGER NOT NULL REFERENCES genres(id) ON DELETE CASCADE,
                PRIMARY KEY (game_id, genre_id)
            );

            CREATE TABLE IF NOT EXISTS user_games (
                user_id TEXT NOT NULL,
                game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
                platform_id TEXT NOT NULL,
                added_at TEXT NOT NULL,
                PRIMARY KEY (user_id, game_id, platform_id)
            );

            CREATE TABLE IF NOT EXISTS user_progress (
                user_id TEXT NOT NULL,
                game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
                platform_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'backlog',
                playtime_minutes INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, game_id, platform_id)
            );
            "#,
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LibraryError> {
        self.conn
            .lock()
            .map_err(|_| LibraryError::Internal("library connection lock poisoned".to_string()))
    }

    fn query_game(
        conn: &Connection,
        filter: &str,
        param: &dyn rusqlite::ToSql,
    ) -> Result<Option<LocalGame>, LibraryError> {
        let sql = format!(
            "SELECT {} FROM games WHERE {} ORDER BY id LIMIT 1",
            GAME_COLUMNS, filter
        );
        let raw = conn
            .query_row(&sql, params![param], RawGame::from_row)
            .optional()
            .map_err(db_err)?;
        raw.map(RawGame::into_game).transpose()
    }
}

impl LibraryStore for SqliteLibrary {
    fn find_by_name(&self, name: &str) -> Result<Option<LocalGame>, LibraryError> {
        let conn = self.lock()?;
        Self::query_game(&conn, "name_folded = ?1", &fold_name(name))
    }

    fn find_by_provider_id(&self, provider_id: u64) -> Result<Option<LocalGame>, LibraryError> {
        let conn = self.lock()?;
        Self::query_game(&conn, "provider_id = ?1", &to_db_id(provider_id)?)
    }

    fn create_from_catalog_item(&self, item: &CatalogItem) -> Result<LocalGame, LibraryError> {
        let snapshot = serde_json::to_string(item)
            .map_err(|e| LibraryError::Internal(format!("Failed to serialize snapshot: {}", e)))?;
        let provider_id = to_db_id(item.provider_id)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO games
                 (provider_id, name, name_folded, slug, cover_url, release_date, rating,
                  snapshot_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                provider_id,
                item.name,
                fold_name(&item.name),
                item.slug,
                item.cover_url,
                item.release_date.map(|d| d.to_string()),
                item.rating,
                snapshot,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(db_err)?;

        Self::query_game(&conn, "provider_id = ?1", &provider_id)?.ok_or_else(|| {
            LibraryError::NotFound(format!("game with provider id {}", item.provider_id))
        })
    }

    fn find_or_create_genre(
        &self,
        provider_genre_id: u64,
        name: &str,
    ) -> Result<LocalGenre, LibraryError> {
        let db_id = to_db_id(provider_genre_id)?;
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR IGNORE INTO genres (provider_genre_id, name) VALUES (?1, ?2)",
            params![db_id, name],
        )
        .map_err(db_err)?;

        let (id, name) = conn
            .query_row(
                "SELECT id, name FROM genres WHERE provider_genre_id = ?1",
                params![db_id],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .map_err(db_err)?;

        Ok(LocalGenre {
            id,
            provider_genre_id,
            name,
        })
    }

    fn link_genre(&self, game_id: i64, genre_id: i64) -> Result<bool, LibraryError> {
        let conn = self.lock()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO game_genres (game_id, genre_id) VALUES (?1, ?2)",
                params![game_id, genre_id],
            )
            .map_err(db_err)?;
        Ok(inserted > 0)
    }

    fn attach_to_user_library(
        &self,
        user_id: &str,
        game_id: i64,
        platform_id: &str,
    ) -> Result<bool, LibraryError> {
        let conn = self.lock()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO user_games (user_id, game_id, platform_id, added_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, game_id, platform_id, Utc::now().to_rfc3339()],
            )
            .map_err(db_err)?;
        Ok(inserted > 0)
    }

    fn create_default_progress(
        &self,
        user_id: &str,
        game_id: i64,
        platform_id: &str,
    ) -> Result<bool, LibraryError> {
        let conn = self.lock()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO user_progress (user_id, game_id, platform_id, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, game_id, platform_id, Utc::now().to_rfc3339()],
            )
            .map_err(db_err)?;
        Ok(inserted > 0)
    }

    fn game_genres(&self, game_id: i64) -> Result<Vec<LocalGenre>, LibraryError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT g.id, g.provider_genre_id, g.name
                 FROM genres g JOIN game_genres gg ON gg.genre_id = g.id
                 WHERE gg.game_id = ?1 ORDER BY g.id",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![game_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(db_err)?;

        let mut genres = Vec::new();
        for row in rows {
            let (id, provider_genre_id, name) = row.map_err(db_err)?;
            genres.push(LocalGenre {
                id,
                provider_genre_id: from_db_id(provider_genre_id)?,
                name,
            });
        }
        Ok(genres)
    }

    fn user_library(&self, user_id: &str) -> Result<Vec<LibraryEntry>, LibraryError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT game_id, platform_id, added_at FROM user_games
                 WHERE user_id = ?1 ORDER BY added_at, game_id",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            let (game_id, platform_id, added_at) = row.map_err(db_err)?;
            entries.push(LibraryEntry {
                user_id: user_id.to_string(),
                game_id,
                platform_id,
                added_at: parse_timestamp(&added_at),
            });
        }
        Ok(entries)
    }

    fn progress(
        &self,
        user_id: &str,
        game_id: i64,
        platform_id: &str,
    ) -> Result<Option<ProgressRecord>, LibraryError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT status, playtime_minutes FROM user_progress
             WHERE user_id = ?1 AND game_id = ?2 AND platform_id = ?3",
            params![user_id, game_id, platform_id],
            |row| {
                Ok(ProgressRecord {
                    user_id: user_id.to_string(),
                    game_id,
                    platform_id: platform_id.to_string(),
                    status: row.get(0)?,
                    playtime_minutes: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(db_err)
    }
}

/// Game row before snapshot decoding.
struct RawGame {
    id: i64,
    provider_id: i64,
    name: String,
    slug: String,
    snapshot_json: String,
    created_at: String,
}

impl RawGame {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            provider_id: row.get(1)?,
            name: row.get(2)?,
            slug: row.get(3)?,
            snapshot_json: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_game(self) -> Result<LocalGame, LibraryError> {
        let item: CatalogItem = serde_json::from_str(&self.snapshot_json).map_err(|e| {
            LibraryError::Internal(format!("Corrupt snapshot for game {}: {}", self.id, e))
        })?;

        Ok(LocalGame {
            id: self.id,
            provider_id: from_db_id(self.provider_id)?,
            name: self.name,
            slug: self.slug,
            item,
            created_at: parse_timestamp(&self.created_at),
        })
    }
}

/// Case folding for name lookups, the same folding the matcher applies.
fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

fn db_err(e: rusqlite::Error) -> LibraryError {
    LibraryError::Database(e.to_string())
}

fn to_db_id(id: u64) -> Result<i64, LibraryError> {
    i64::try_from(id).map_err(|_| LibraryError::Internal(format!("Provider id {} out of range", id)))
}

fn from_db_id(id: i64) -> Result<u64, LibraryError> {
    u64::try_from(id).map_err(|_| LibraryError::Internal(format!("Negative provider id {}", id)))
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::GenreRef;
    use crate::testing::fixtures;
    use tempfile::TempDir;

    fn rpg_item() -> CatalogItem {
        let mut item = fixtures::catalog_item(1942, "The Witcher 3: Wild Hunt");
        item.genres = vec![
            GenreRef {
                provider_genre_id: 12,
                name: "Role-playing (RPG)".to_string(),
            },
            GenreRef {
                provider_genre_id: 31,
                name: "Adventure".to_string(),
            },
        ];
        item
    }

    #[test]
    fn test_create_and_find_by_provider_id() {
        let library = SqliteLibrary::in_memory().unwrap();
        let item = rpg_item();

        let created = library.create_from_catalog_item(&item).unwrap();
        let found = library.find_by_provider_id(1942).unwrap().unwrap();

        assert_eq!(created.id, found.id);
        assert_eq!(found.name, "The Witcher 3: Wild Hunt");
        assert_eq!(found.item, item);
        assert!(library.find_by_provider_id(1).unwrap().is_none());
    }

    #[test]
    fn test_create_is_idempotent_on_provider_id() {
        let library = SqliteLibrary::in_memory().unwrap();

        let first = library
            .create_from_catalog_item(&fixtures::catalog_item(7, "Original"))
            .unwrap();
        let second = library
            .create_from_catalog_item(&fixtures::catalog_item(7, "Renamed"))
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Original");
    }

    #[test]
    fn test_find_by_name_case_insensitive_exact() {
        let library = SqliteLibrary::in_memory().unwrap();
        library
            .create_from_catalog_item(&fixtures::catalog_item(1, "Half-Life 2"))
            .unwrap();

        assert!(library.find_by_name("half-life 2").unwrap().is_some());
        assert!(library.find_by_name("HALF-LIFE 2").unwrap().is_some());
        assert!(library.find_by_name("Half-Life").unwrap().is_none());
        assert!(library.find_by_name("Half-Life 2: Episode One").unwrap().is_none());
    }

    #[test]
    fn test_find_by_name_folds_non_ascii() {
        let library = SqliteLibrary::in_memory().unwrap();
        library
            .create_from_catalog_item(&fixtures::catalog_item(2, "Pokémon Sword"))
            .unwrap();
        library
            .create_from_catalog_item(&fixtures::catalog_item(3, "Ōkami"))
            .unwrap();

        let game = library.find_by_name("POKÉMON SWORD").unwrap().unwrap();
        assert_eq!(game.provider_id, 2);
        assert_eq!(game.name, "Pokémon Sword");
        assert_eq!(library.find_by_name("ōKAMI").unwrap().unwrap().provider_id, 3);
    }

    #[test]
    fn test_genres_upsert_and_link_once() {
        let library = SqliteLibrary::in_memory().unwrap();
        let game = library.create_from_catalog_item(&rpg_item()).unwrap();

        let rpg = library.find_or_create_genre(12, "Role-playing (RPG)").unwrap();
        let again = library.find_or_create_genre(12, "RPG").unwrap();
        assert_eq!(rpg, again);
        assert_eq!(again.name, "Role-playing (RPG)");

        assert!(library.link_genre(game.id, rpg.id).unwrap());
        assert!(!library.link_genre(game.id, rpg.id).unwrap());

        let genres = library.game_genres(game.id).unwrap();
        assert_eq!(genres.len(), 1);
        assert_eq!(genres[0].provider_genre_id, 12);
    }

    #[test]
    fn test_attach_and_progress_are_idempotent() {
        let library = SqliteLibrary::in_memory().unwrap();
        let game = library
            .create_from_catalog_item(&fixtures::catalog_item(5, "Celeste"))
            .unwrap();

        assert!(library.attach_to_user_library("alice", game.id, "switch").unwrap());
        assert!(!library.attach_to_user_library("alice", game.id, "switch").unwrap());
        assert!(library.attach_to_user_library("alice", game.id, "pc").unwrap());

        assert!(library.create_default_progress("alice", game.id, "switch").unwrap());
        assert!(!library.create_default_progress("alice", game.id, "switch").unwrap());

        assert_eq!(library.user_library("alice").unwrap().len(), 2);
        assert!(library.user_library("bob").unwrap().is_empty());

        let progress = library.progress("alice", game.id, "switch").unwrap().unwrap();
        assert_eq!(progress.status, "backlog");
        assert_eq!(progress.playtime_minutes, 0);
        assert!(library.progress("alice", game.id, "pc").unwrap().is_none());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("library.db");

        {
            let library = SqliteLibrary::new(&path).unwrap();
            library
                .create_from_catalog_item(&fixtures::catalog_item(42, "Outer Wilds"))
                .unwrap();
        }

        let library = SqliteLibrary::new(&path).unwrap();
        assert!(library.find_by_name("outer wilds").unwrap().is_some());
    }
}
