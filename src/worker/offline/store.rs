//! # Offline Store
//!
//! Durable storage for submissions made while offline: the `offline-store`
//! database (schema version 1) with one auto-increment store per
//! submission kind. Ids are never reused, and a record is never updated in
//! place; it is either deleted after a confirmed replay or left alone.

use crate::local_db::schema::Migration;
use crate::local_db::LocalDatabase;
use crate::shared::SharedError;
use crate::worker::offline::{PendingSubmission, SubmissionDraft, SubmissionKind};
use async_trait::async_trait;
use sqlx::Row;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Database name of the offline store
pub const OFFLINE_DB_NAME: &str = "offline-store";

/// Per-kind durable object stores
#[async_trait]
pub trait OfflineStore: Send + Sync {
    /// Insert a record, returning its new id
    async fn add(&self, kind: SubmissionKind, draft: &SubmissionDraft) -> Result<i64, SharedError>;
    /// Fetch one record
    async fn get(&self, kind: SubmissionKind, id: i64) -> Result<Option<PendingSubmission>, SharedError>;
    /// Every record of a kind, in id order
    async fn get_all(&self, kind: SubmissionKind) -> Result<Vec<PendingSubmission>, SharedError>;
    /// Delete one record; true if it existed
    async fn delete(&self, kind: SubmissionKind, id: i64) -> Result<bool, SharedError>;
    /// Number of records of a kind
    async fn count(&self, kind: SubmissionKind) -> Result<usize, SharedError>;
}

const OFFLINE_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "create_offline_stores",
    statements: &[
        "CREATE TABLE contact_forms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            payload TEXT NOT NULL,
            token TEXT,
            idempotency_key TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        "CREATE TABLE forum_posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            payload TEXT NOT NULL,
            token TEXT,
            idempotency_key TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        "CREATE TABLE chat_messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            payload TEXT NOT NULL,
            token TEXT,
            idempotency_key TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
    ],
}];

/// SQLite-backed offline store
#[derive(Debug, Clone)]
pub struct SqliteOfflineStore {
    db: LocalDatabase,
}

impl SqliteOfflineStore {
    /// Wrap a database, applying the offline-store schema
    pub async fn new(db: LocalDatabase) -> Result<Self, SharedError> {
        db.migrate(OFFLINE_MIGRATIONS).await?;
        Ok(Self { db })
    }

    fn row_to_submission(kind: SubmissionKind, row: &sqlx::sqlite::SqliteRow) -> Result<PendingSubmission, SharedError> {
        let payload: String = row.try_get("payload")?;
        let key: String = row.try_get("idempotency_key")?;
        Ok(PendingSubmission {
            id: row.try_get("id")?,
            kind,
            payload: serde_json::from_str(&payload)?,
            token: row.try_get("token")?,
            idempotency_key: Uuid::parse_str(&key)
                .map_err(|e| SharedError::storage(format!("Corrupt idempotency key: {}", e)))?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl OfflineStore for SqliteOfflineStore {
    async fn add(&self, kind: SubmissionKind, draft: &SubmissionDraft) -> Result<i64, SharedError> {
        let sql = format!(
            "INSERT INTO {} (payload, token, idempotency_key, created_at) VALUES (?, ?, ?, ?)",
            kind.table_name()
        );
        let result = sqlx::query(&sql)
            .bind(draft.payload.to_string())
            .bind(&draft.token)
            .bind(draft.idempotency_key.to_string())
            .bind(&draft.created_at)
            .execute(self.db.pool())
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn get(&self, kind: SubmissionKind, id: i64) -> Result<Option<PendingSubmission>, SharedError> {
        let sql = format!(
            "SELECT id, payload, token, idempotency_key, created_at FROM {} WHERE id = ?",
            kind.table_name()
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        row.map(|row| Self::row_to_submission(kind, &row)).transpose()
    }

    async fn get_all(&self, kind: SubmissionKind) -> Result<Vec<PendingSubmission>, SharedError> {
        let sql = format!(
            "SELECT id, payload, token, idempotency_key, created_at FROM {} ORDER BY id ASC",
            kind.table_name()
        );
        let rows = sqlx::query(&sql).fetch_all(self.db.pool()).await?;
        rows.iter()
            .map(|row| Self::row_to_submission(kind, row))
            .collect()
    }

    async fn delete(&self, kind: SubmissionKind, id: i64) -> Result<bool, SharedError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", kind.table_name());
        let result = sqlx::query(&sql).bind(id).execute(self.db.pool()).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, kind: SubmissionKind) -> Result<usize, SharedError> {
        let sql = format!("SELECT COUNT(*) FROM {}", kind.table_name());
        let count: (i64,) = sqlx::query_as(&sql).fetch_one(self.db.pool()).await?;
        Ok(count.0 as usize)
    }
}

#[derive(Debug, Default)]
struct MemoryObjectStore {
    last_id: i64,
    records: BTreeMap<i64, PendingSubmission>,
}

/// In-memory offline store
#[derive(Debug, Default)]
pub struct MemoryOfflineStore {
    stores: RwLock<HashMap<SubmissionKind, MemoryObjectStore>>,
}

impl MemoryOfflineStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OfflineStore for MemoryOfflineStore {
    async fn add(&self, kind: SubmissionKind, draft: &SubmissionDraft) -> Result<i64, SharedError> {
        let mut stores = self.stores.write().await;
        let store = stores.entry(kind).or_default();
        store.last_id += 1;
        let id = store.last_id;
        store.records.insert(id, draft.clone().into_pending(id, kind));
        Ok(id)
    }

    async fn get(&self, kind: SubmissionKind, id: i64) -> Result<Option<PendingSubmission>, SharedError> {
        Ok(self
            .stores
            .read()
            .await
            .get(&kind)
            .and_then(|store| store.records.get(&id))
            .cloned())
    }

    async fn get_all(&self, kind: SubmissionKind) -> Result<Vec<PendingSubmission>, SharedError> {
        Ok(self
            .stores
            .read()
            .await
            .get(&kind)
            .map(|store| store.records.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete(&self, kind: SubmissionKind, id: i64) -> Result<bool, SharedError> {
        Ok(self
            .stores
            .write()
            .await
            .get_mut(&kind)
            .map(|store| store.records.remove(&id).is_some())
            .unwrap_or(false))
    }

    async fn count(&self, kind: SubmissionKind) -> Result<usize, SharedError> {
        Ok(self
            .stores
            .read()
            .await
            .get(&kind)
            .map(|store| store.records.len())
            .unwrap_or(0))
    }
}
