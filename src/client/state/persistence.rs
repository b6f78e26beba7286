/**
 * State Snapshot Persistence
 *
 * Durable key/value storage for state snapshots, plus the autosave task
 * that writes one on a fixed interval. A snapshot is a single JSON
 * document `{ "state": {...}, "history": [...] }` stored under one key.
 */
use crate::client::state::StateStore;
use crate::local_db::schema::Migration;
use crate::local_db::LocalDatabase;
use crate::shared::SharedError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Durable string storage for snapshots
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>, SharedError>;
    async fn write(&self, key: &str, value: &str) -> Result<(), SharedError>;
    async fn remove(&self, key: &str) -> Result<(), SharedError>;
}

const SNAPSHOT_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "create_snapshots",
    statements: &["CREATE TABLE snapshots (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"],
}];

/// SQLite-backed snapshot storage
#[derive(Debug, Clone)]
pub struct SqliteSnapshotStorage {
    db: LocalDatabase,
}

impl SqliteSnapshotStorage {
    pub async fn new(db: LocalDatabase) -> Result<Self, SharedError> {
        db.migrate(SNAPSHOT_MIGRATIONS).await?;
        Ok(Self { db })
    }
}

#[async_trait]
impl SnapshotStorage for SqliteSnapshotStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, SharedError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM snapshots WHERE key = ?")
            .bind(key)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(|(value,)| value))
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), SharedError> {
        sqlx::query(
            "INSERT INTO snapshots (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), SharedError> {
        sqlx::query("DELETE FROM snapshots WHERE key = ?")
            .bind(key)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }
}

/// In-memory snapshot storage
#[derive(Debug, Default)]
pub struct MemorySnapshotStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySnapshotStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStorage for MemorySnapshotStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, SharedError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), SharedError> {
        self.entries.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), SharedError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Persist `store` every `every` until the task is aborted
pub fn spawn_autosave(store: Arc<StateStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = store.persist().await {
                tracing::error!("[State] Autosave failed: {}", e);
            }
        }
    })
}
