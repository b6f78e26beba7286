//! # Local Database Module
//!
//! SQLite connection management for the durable stores that outlive a page
//! session: the state snapshot, the offline submission store and cache
//! storage. Each store owns its own database file and schema history.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fuelq::local_db::LocalDatabase;
//!
//! # async fn example() -> Result<(), fuelq::shared::SharedError> {
//! let db = LocalDatabase::open("/tmp/fuelq/offline-store.db").await?;
//! println!("schema version {}", db.schema_version().await?);
//! # Ok(())
//! # }
//! ```

pub mod schema;

use crate::shared::SharedError;
use schema::{latest_version, pending_migrations, Migration};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;

/// Local database connection manager
#[derive(Debug, Clone)]
pub struct LocalDatabase {
    pool: SqlitePool,
}

impl LocalDatabase {
    /// Open or create a database file
    ///
    /// Creates the parent directory when missing. Uses WAL mode so the page
    /// and the worker can read while the other writes.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SharedError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        tracing::debug!("[LocalDb] Opened {}", path.display());
        Ok(Self { pool })
    }

    /// Private in-memory database, mostly for tests
    pub async fn in_memory() -> Result<Self, SharedError> {
        // A single connection that is never recycled keeps the memory database alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Current schema version (0 for a fresh database)
    pub async fn schema_version(&self) -> Result<i64, SharedError> {
        self.ensure_migrations_table().await?;
        let version: (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;
        Ok(version.0)
    }

    /// Apply every migration newer than the current schema version
    ///
    /// Each migration runs in its own transaction together with its
    /// `schema_migrations` row. Returns the resulting version. A database
    /// already past the newest known migration is refused.
    pub async fn migrate(&self, migrations: &[Migration]) -> Result<i64, SharedError> {
        let current = self.schema_version().await?;
        let latest = latest_version(migrations);
        if current > latest {
            return Err(SharedError::storage(format!(
                "Database schema version {} is newer than supported version {}",
                current, latest
            )));
        }
        let mut version = current;

        for migration in pending_migrations(migrations, current) {
            let mut tx = self.pool.begin().await?;
            for statement in migration.statements {
                sqlx::query(statement).execute(&mut *tx).await?;
            }
            sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)")
                .bind(migration.version)
                .bind(migration.name)
                .bind(chrono::Utc::now().to_rfc3339())
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            tracing::info!(
                "[LocalDb] Applied migration {} ({})",
                migration.version,
                migration.name
            );
            version = migration.version;
        }

        Ok(version)
    }

    async fn ensure_migrations_table(&self) -> Result<(), SharedError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
