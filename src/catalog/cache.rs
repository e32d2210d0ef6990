use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use rusqlite::{params, Connection};
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};

use super::types::{CatalogHit, CatalogQuery, Component};
use super::CatalogClient;

/// SQLite-backed cache of catalog search results with TTL-based expiration.
/// Keyed by the canonical query signature; never a source of truth.
/// All operations are synchronous (rusqlite is blocking).
/// Callers in async contexts should use `tokio::task::spawn_blocking`.
pub struct QueryCache {
    conn: Connection,
}

impl QueryCache {
    /// Open or create the cache database at the given path.
    /// Creates the `search_cache` table and index if they don't exist.
    pub fn new(db_path: &Path) -> Result<Self, String> {
        let conn = Connection::open(db_path)
            .map_err(|e| format!("Failed to open cache database at {:?}: {}", db_path, e))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS search_cache (
                signature TEXT PRIMARY KEY,
                hits_json TEXT NOT NULL,
                cached_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_search_cache_expires ON search_cache(expires_at);",
        )
        .map_err(|e| format!("Failed to create cache table: {}", e))?;

        Ok(Self { conn })
    }

    /// Look up cached hits for a query signature.
    /// Returns None if not found or if the entry has expired.
    pub fn get(&self, signature: &str) -> Result<Option<Vec<CatalogHit>>, String> {
        let now = Utc::now().to_rfc3339();

        let mut stmt = self
            .conn
            .prepare("SELECT hits_json FROM search_cache WHERE signature = ?1 AND expires_at > ?2")
            .map_err(|e| format!("Failed to prepare cache query: {}", e))?;

        let result = stmt.query_row(params![signature, now], |row| row.get::<_, String>(0));

        match result {
            Ok(json) => {
                let hits: Vec<CatalogHit> = serde_json::from_str(&json)
                    .map_err(|e| format!("Failed to deserialize cached hits: {}", e))?;
                Ok(Some(hits))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(format!("Cache lookup failed: {}", e)),
        }
    }

    /// Store hits for a signature with the given TTL in seconds.
    /// Overwrites any existing entry for the same signature.
    pub fn put(&self, signature: &str, hits: &[CatalogHit], ttl_secs: i64) -> Result<(), String> {
        let now = Utc::now();
        let expires = now + Duration::seconds(ttl_secs);
        let json = serde_json::to_string(hits)
            .map_err(|e| format!("Failed to serialize hits for cache: {}", e))?;

        self.conn
            .execute(
                "INSERT OR REPLACE INTO search_cache
                 (signature, hits_json, cached_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![signature, json, now.to_rfc3339(), expires.to_rfc3339()],
            )
            .map_err(|e| format!("Failed to store hits in cache: {}", e))?;

        Ok(())
    }

    /// Delete all expired entries from the cache.
    /// Returns the number of deleted rows.
    pub fn clear_expired(&self) -> Result<usize, String> {
        let now = Utc::now().to_rfc3339();
        let count = self
            .conn
            .execute("DELETE FROM search_cache WHERE expires_at < ?1", params![now])
            .map_err(|e| format!("Failed to clear expired cache entries: {}", e))?;

        info!("Cleared {} expired cache entries", count);
        Ok(count)
    }
}

/// Read-through cache around another catalog client.
///
/// Only searches are cached; `fetch` always goes to the inner client so a
/// build is hydrated from current data. Cache failures are logged and the
/// inner client is used as if the cache were absent.
pub struct CachedCatalog<C> {
    inner: C,
    db_path: Option<PathBuf>,
    ttl_secs: i64,
}

impl<C: CatalogClient> CachedCatalog<C> {
    pub fn new(inner: C, db_path: PathBuf, ttl_secs: i64) -> Self {
        Self {
            inner,
            db_path: Some(db_path),
            ttl_secs,
        }
    }

    /// Wrap a client without caching.
    pub fn uncached(inner: C) -> Self {
        Self {
            inner,
            db_path: None,
            ttl_secs: 0,
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn is_caching(&self) -> bool {
        self.db_path.is_some() && self.ttl_secs > 0
    }

    async fn cached(&self, signature: &str) -> Option<Vec<CatalogHit>> {
        let db_path = self.db_path.clone()?;
        let key = signature.to_string();
        let result = tokio::task::spawn_blocking(move || {
            let cache = QueryCache::new(&db_path)?;
            cache.get(&key)
        })
        .await
        .map_err(|e| format!("Cache task panicked: {}", e));

        match result {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) | Err(e) => {
                warn!("Cache lookup failed for {}: {}, querying catalog", signature, e);
                None
            }
        }
    }

    async fn store(&self, signature: &str, hits: &[CatalogHit]) {
        let Some(db_path) = self.db_path.clone() else {
            return;
        };
        let key = signature.to_string();
        let hits = hits.to_vec();
        let ttl = self.ttl_secs;
        let result = tokio::task::spawn_blocking(move || {
            let cache = QueryCache::new(&db_path)?;
            cache.put(&key, &hits, ttl)
        })
        .await
        .map_err(|e| format!("Cache store task panicked: {}", e));

        if let Ok(Err(e)) | Err(e) = result {
            warn!("Failed to cache hits for {}: {}", signature, e);
        }
    }

    /// Delete expired entries. Returns the number removed (0 when not caching).
    /// Unlike lookups, a failure here is reported as `EngineError::Storage`.
    pub async fn purge_expired(&self) -> EngineResult<usize> {
        let Some(db_path) = self.db_path.clone() else {
            return Ok(0);
        };
        tokio::task::spawn_blocking(move || {
            let cache = QueryCache::new(&db_path)?;
            cache.clear_expired()
        })
        .await
        .map_err(|e| format!("Cache task panicked: {}", e))
        .and_then(|r| r)
        .map_err(EngineError::Storage)
    }
}

impl<C: CatalogClient> CatalogClient for CachedCatalog<C> {
    async fn search(&self, query: &CatalogQuery) -> EngineResult<Vec<CatalogHit>> {
        if !self.is_caching() {
            return self.inner.search(query).await;
        }

        let signature = query.signature();
        if let Some(hits) = self.cached(&signature).await {
            debug!("Cache hit for {}", signature);
            return Ok(hits);
        }
        debug!("Cache miss for {}", signature);

        let hits = self.inner.search(query).await?;
        self.store(&signature, &hits).await;
        Ok(hits)
    }

    async fn fetch(&self, ids: &[String]) -> EngineResult<Vec<Component>> {
        self.inner.fetch(ids).await
    }
}
