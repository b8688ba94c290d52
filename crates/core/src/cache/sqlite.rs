//! SQLite-backed cache backend.
//!
//! The database is opened lazily on first use. Concurrent first callers
//! share a single open attempt; if it fails, the next call tries again.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{CacheBackend, CacheBackendError};

const IN_MEMORY: &str = ":memory:";

type SharedConnection = Arc<Mutex<Connection>>;

/// Cache entries stored in a SQLite table with an expiry column.
pub struct SqliteCacheBackend {
    path: PathBuf,
    conn: OnceCell<SharedConnection>,
}

impl SqliteCacheBackend {
    /// Create a backend for the database at `path`. Nothing is opened yet.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            conn: OnceCell::new(),
        }
    }

    /// Create a backend over a private in-memory database (useful for testing).
    pub fn in_memory() -> Self {
        Self::new(Path::new(IN_MEMORY))
    }

    /// Whether the connection has been opened.
    pub fn is_connected(&self) -> bool {
        self.conn.initialized()
    }

    /// Delete every expired entry. Returns the number of rows removed.
    pub async fn purge_expired(&self) -> Result<usize, CacheBackendError> {
        let now = Utc::now().timestamp_millis();
        self.with_connection(move |conn| {
            conn.execute(
                "DELETE FROM cache_entries WHERE expires_at <= ?",
                params![now],
            )
        })
        .await
    }

    async fn connection(&self) -> Result<SharedConnection, CacheBackendError> {
        let conn = self
            .conn
            .get_or_try_init(|| {
                let path = self.path.clone();
                async move {
                    info!("Opening cache database at {:?}", path);
                    tokio::task::spawn_blocking(move || Self::open(&path))
                        .await
                        .map_err(|e| CacheBackendError::Unavailable(e.to_string()))?
                }
            })
            .await?;
        Ok(Arc::clone(conn))
    }

    fn open(path: &Path) -> Result<SharedConnection, CacheBackendError> {
        let conn = Connection::open(path)
            .map_err(|e| CacheBackendError::Unavailable(e.to_string()))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                expires_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cache_entries_expires ON cache_entries(expires_at);
            "#,
        )
        .map_err(|e| CacheBackendError::Backend(e.to_string()))?;
        Ok(Arc::new(Mutex::new(conn)))
    }

    async fn with_connection<T, F>(&self, op: F) -> Result<T, CacheBackendError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.connection().await?;
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            op(&conn)
        })
        .await
        .map_err(|e| CacheBackendError::Backend(e.to_string()))?
        .map_err(|e| CacheBackendError::Backend(e.to_string()))
    }
}

#[async_trait]
impl CacheBackend for SqliteCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheBackendError> {
        let key = key.to_string();
        let now = Utc::now().timestamp_millis();
        self.with_connection(move |conn| {
            let row: Option<(Vec<u8>, i64)> = conn
                .query_row(
                    "SELECT value, expires_at FROM cache_entries WHERE key = ?",
                    params![key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            match row {
                Some((value, expires_at)) if expires_at > now => Ok(Some(value)),
                Some(_) => {
                    debug!("Evicting expired cache entry {}", key);
                    conn.execute("DELETE FROM cache_entries WHERE key = ?", params![key])?;
                    Ok(None)
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheBackendError> {
        let key = key.to_string();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp_millis().saturating_add(ttl_ms);
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
                params![key, value, expires_at],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheBackendError> {
        let key = key.to_string();
        self.with_connection(move |conn| {
            conn.execute("DELETE FROM cache_entries WHERE key = ?", params![key])?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lazy_connect() {
        let backend = SqliteCacheBackend::in_memory();
        assert!(!backend.is_connected());

        assert_eq!(backend.get("missing").await.unwrap(), None);
        assert!(backend.is_connected());
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let backend = SqliteCacheBackend::in_memory();
        backend
            .set_with_expiry("search:zelda", b"[]".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            backend.get("search:zelda").await.unwrap(),
            Some(b"[]".to_vec())
        );

        backend
            .set_with_expiry("search:zelda", b"[1]".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            backend.get("search:zelda").await.unwrap(),
            Some(b"[1]".to_vec())
        );

        backend.delete("search:zelda").await.unwrap();
        assert_eq!(backend.get("search:zelda").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entries() {
        let backend = SqliteCacheBackend::in_memory();
        backend
            .set_with_expiry("a", b"1".to_vec(), Duration::from_millis(10))
            .await
            .unwrap();
        backend
            .set_with_expiry("b", b"2".to_vec(), Duration::from_millis(10))
            .await
            .unwrap();
        backend
            .set_with_expiry("c", b"3".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(backend.get("a").await.unwrap(), None);
        assert_eq!(backend.purge_expired().await.unwrap(), 1);
        assert_eq!(backend.get("c").await.unwrap(), Some(b"3".to_vec()));
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.db");

        let first = SqliteCacheBackend::new(&path);
        first
            .set_with_expiry("item:1", b"x".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        drop(first);

        let second = SqliteCacheBackend::new(&path);
        assert_eq!(second.get("item:1").await.unwrap(), Some(b"x".to_vec()));
    }

    #[tokio::test]
    async fn test_failed_open_is_retried() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("cache.db");
        let backend = SqliteCacheBackend::new(&path);

        assert!(matches!(
            backend.get("k").await,
            Err(CacheBackendError::Unavailable(_))
        ));
        assert!(!backend.is_connected());

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        assert_eq!(backend.get("k").await.unwrap(), None);
        assert!(backend.is_connected());
    }
}
