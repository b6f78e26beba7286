//! # Cache Storage
//!
//! Versioned response caches for the worker, partitioned into three named
//! caches per deploy:
//!
//! - **static** — the install-time asset manifest; never evicted until the
//!   version changes
//! - **dynamic** — runtime HTML and API responses
//! - **images** — kept apart so images never push out HTML
//!
//! [`CacheStorage`] guarantees a URL lives in at most one partition of the
//! current version. Storage itself sits behind [`CacheBackend`] so the
//! worker runs against SQLite in production and memory in tests.

use crate::local_db::schema::Migration;
use crate::local_db::LocalDatabase;
use crate::shared::{Response, SharedError};
use async_trait::async_trait;
use sqlx::Row;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cache partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Static,
    Dynamic,
    Images,
}

impl Partition {
    pub const ALL: [Partition; 3] = [Partition::Static, Partition::Dynamic, Partition::Images];
}

/// Cache names for one deploy version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    pub static_cache: String,
    pub dynamic_cache: String,
    pub image_cache: String,
}

impl CacheNames {
    /// `<app>-static-<version>`, `<app>-dynamic-<version>`, `<app>-images-<version>`
    pub fn new(app: &str, version: &str) -> Self {
        Self {
            static_cache: format!("{}-static-{}", app, version),
            dynamic_cache: format!("{}-dynamic-{}", app, version),
            image_cache: format!("{}-images-{}", app, version),
        }
    }

    /// Name of a partition
    pub fn name(&self, partition: Partition) -> &str {
        match partition {
            Partition::Static => &self.static_cache,
            Partition::Dynamic => &self.dynamic_cache,
            Partition::Images => &self.image_cache,
        }
    }

    /// The only cache names the current version keeps on activate
    pub fn allow_list(&self) -> [&str; 3] {
        [&self.static_cache, &self.dynamic_cache, &self.image_cache]
    }
}

/// Named-cache storage primitive (the Cache Storage API)
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Create the cache if it does not exist
    async fn open(&self, cache: &str) -> Result<(), SharedError>;
    /// Store a response, replacing any previous entry for the URL
    async fn put(&self, cache: &str, url: &str, response: &Response) -> Result<(), SharedError>;
    /// Look up a URL in one cache
    async fn match_url(&self, cache: &str, url: &str) -> Result<Option<Response>, SharedError>;
    /// Remove one entry; true if it existed
    async fn delete_entry(&self, cache: &str, url: &str) -> Result<bool, SharedError>;
    /// Every cache name, sorted
    async fn cache_names(&self) -> Result<Vec<String>, SharedError>;
    /// Drop a whole cache; true if it existed
    async fn delete_cache(&self, cache: &str) -> Result<bool, SharedError>;
    /// URLs stored in one cache, sorted
    async fn keys(&self, cache: &str) -> Result<Vec<String>, SharedError>;
}

/// In-memory backend
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    caches: RwLock<BTreeMap<String, HashMap<String, Response>>>,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn open(&self, cache: &str) -> Result<(), SharedError> {
        self.caches.write().await.entry(cache.to_string()).or_default();
        Ok(())
    }

    async fn put(&self, cache: &str, url: &str, response: &Response) -> Result<(), SharedError> {
        self.caches
            .write()
            .await
            .entry(cache.to_string())
            .or_default()
            .insert(url.to_string(), response.clone());
        Ok(())
    }

    async fn match_url(&self, cache: &str, url: &str) -> Result<Option<Response>, SharedError> {
        Ok(self
            .caches
            .read()
            .await
            .get(cache)
            .and_then(|entries| entries.get(url))
            .cloned())
    }

    async fn delete_entry(&self, cache: &str, url: &str) -> Result<bool, SharedError> {
        Ok(self
            .caches
            .write()
            .await
            .get_mut(cache)
            .map(|entries| entries.remove(url).is_some())
            .unwrap_or(false))
    }

    async fn cache_names(&self) -> Result<Vec<String>, SharedError> {
        Ok(self.caches.read().await.keys().cloned().collect())
    }

    async fn delete_cache(&self, cache: &str) -> Result<bool, SharedError> {
        Ok(self.caches.write().await.remove(cache).is_some())
    }

    async fn keys(&self, cache: &str) -> Result<Vec<String>, SharedError> {
        let mut keys: Vec<String> = self
            .caches
            .read()
            .await
            .get(cache)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }
}

const CACHE_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "create_cache_storage",
    statements: &[
        "CREATE TABLE caches (
            name TEXT PRIMARY KEY,
            created_at TEXT NOT NULL
        )",
        "CREATE TABLE cache_entries (
            cache_name TEXT NOT NULL REFERENCES caches(name) ON DELETE CASCADE,
            url TEXT NOT NULL,
            status INTEGER NOT NULL,
            headers TEXT NOT NULL,
            body BLOB NOT NULL,
            stored_at TEXT NOT NULL,
            PRIMARY KEY (cache_name, url)
        )",
    ],
}];

/// SQLite-backed cache storage
#[derive(Debug, Clone)]
pub struct SqliteCacheBackend {
    db: LocalDatabase,
}

impl SqliteCacheBackend {
    /// Wrap a database, applying the cache schema
    pub async fn new(db: LocalDatabase) -> Result<Self, SharedError> {
        db.migrate(CACHE_MIGRATIONS).await?;
        Ok(Self { db })
    }
}

#[async_trait]
impl CacheBackend for SqliteCacheBackend {
    async fn open(&self, cache: &str) -> Result<(), SharedError> {
        sqlx::query("INSERT OR IGNORE INTO caches (name, created_at) VALUES (?, ?)")
            .bind(cache)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn put(&self, cache: &str, url: &str, response: &Response) -> Result<(), SharedError> {
        self.open(cache).await?;
        let headers = serde_json::to_string(&response.headers)?;
        sqlx::query(
            "INSERT OR REPLACE INTO cache_entries (cache_name, url, status, headers, body, stored_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(cache)
        .bind(url)
        .bind(response.status as i64)
        .bind(headers)
        .bind(&response.body)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn match_url(&self, cache: &str, url: &str) -> Result<Option<Response>, SharedError> {
        let row = sqlx::query(
            "SELECT status, headers, body FROM cache_entries WHERE cache_name = ? AND url = ?",
        )
        .bind(cache)
        .bind(url)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(row) => {
                let status: i64 = row.try_get("status")?;
                let headers: String = row.try_get("headers")?;
                let body: Vec<u8> = row.try_get("body")?;
                Ok(Some(Response {
                    status: status as u16,
                    headers: serde_json::from_str(&headers)?,
                    body,
                }))
            }
            None => Ok(None),
        }
    }

    async fn delete_entry(&self, cache: &str, url: &str) -> Result<bool, SharedError> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE cache_name = ? AND url = ?")
            .bind(cache)
            .bind(url)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn cache_names(&self) -> Result<Vec<String>, SharedError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM caches ORDER BY name")
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn delete_cache(&self, cache: &str) -> Result<bool, SharedError> {
        let mut tx = self.db.pool().begin().await?;
        sqlx::query("DELETE FROM cache_entries WHERE cache_name = ?")
            .bind(cache)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM caches WHERE name = ?")
            .bind(cache)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn keys(&self, cache: &str) -> Result<Vec<String>, SharedError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT url FROM cache_entries WHERE cache_name = ? ORDER BY url")
                .bind(cache)
                .fetch_all(self.db.pool())
                .await?;
        Ok(rows.into_iter().map(|(url,)| url).collect())
    }
}

/// The worker's view of cache storage for the current version
#[derive(Clone)]
pub struct CacheStorage {
    backend: Arc<dyn CacheBackend>,
    names: CacheNames,
}

impl CacheStorage {
    pub fn new(backend: Arc<dyn CacheBackend>, names: CacheNames) -> Self {
        Self { backend, names }
    }

    pub fn names(&self) -> &CacheNames {
        &self.names
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Look up a URL in one partition
    pub async fn match_in(&self, partition: Partition, url: &str) -> Result<Option<Response>, SharedError> {
        self.backend.match_url(self.names.name(partition), url).await
    }

    /// Look up a URL across the current partitions (`caches.match`)
    pub async fn match_any(&self, url: &str) -> Result<Option<(Partition, Response)>, SharedError> {
        for partition in Partition::ALL {
            if let Some(response) = self.match_in(partition, url).await? {
                return Ok(Some((partition, response)));
            }
        }
        Ok(None)
    }

    /// Which current partition holds a URL
    pub async fn locate(&self, url: &str) -> Result<Option<Partition>, SharedError> {
        Ok(self.match_any(url).await?.map(|(partition, _)| partition))
    }

    /// Store a response, keeping the URL in exactly one partition
    ///
    /// A URL already held by some partition is rewritten in place (a
    /// precached asset stays in static); otherwise it goes to `preferred`.
    /// Any copy left in another partition is removed.
    pub async fn put(&self, preferred: Partition, url: &str, response: &Response) -> Result<Partition, SharedError> {
        let target = self.locate(url).await?.unwrap_or(preferred);
        self.backend.put(self.names.name(target), url, response).await?;

        for partition in Partition::ALL {
            if partition != target
                && self.backend.delete_entry(self.names.name(partition), url).await?
            {
                tracing::debug!("[Cache] Evicted duplicate of {} from {:?}", url, partition);
            }
        }
        Ok(target)
    }

    /// Store into a partition unconditionally, evicting copies elsewhere
    pub async fn put_into(&self, partition: Partition, url: &str, response: &Response) -> Result<(), SharedError> {
        self.backend.put(self.names.name(partition), url, response).await?;
        for other in Partition::ALL {
            if other != partition {
                self.backend.delete_entry(self.names.name(other), url).await?;
            }
        }
        Ok(())
    }

    /// Create the three current caches
    pub async fn open_all(&self) -> Result<(), SharedError> {
        for name in self.names.allow_list() {
            self.backend.open(name).await?;
        }
        Ok(())
    }

    /// Delete every cache outside the current allow-list
    pub async fn delete_stale(&self) -> Result<Vec<String>, SharedError> {
        let allow = self.names.allow_list();
        let mut deleted = Vec::new();
        for name in self.backend.cache_names().await? {
            if !allow.contains(&name.as_str()) && self.backend.delete_cache(&name).await? {
                tracing::info!("[Cache] Deleted stale cache {}", name);
                deleted.push(name);
            }
        }
        Ok(deleted)
    }
}
