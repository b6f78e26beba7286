//! Database Schema Definitions
//!
//! Every local database is versioned independently. A store declares its
//! migrations as a static slice; [`pending_migrations`] picks the ones the
//! database has not applied yet.

/// One schema step
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Monotonic version number, starting at 1
    pub version: i64,
    /// Short label recorded in `schema_migrations`
    pub name: &'static str,
    /// Statements executed in order inside one transaction
    pub statements: &'static [&'static str],
}

/// Migrations newer than `current_version`, in ascending order
pub fn pending_migrations(migrations: &[Migration], current_version: i64) -> Vec<Migration> {
    let mut pending: Vec<Migration> = migrations
        .iter()
        .filter(|m| m.version > current_version)
        .copied()
        .collect();
    pending.sort_by_key(|m| m.version);
    pending
}

/// Highest version declared in a migration list
pub fn latest_version(migrations: &[Migration]) -> i64 {
    migrations.iter().map(|m| m.version).max().unwrap_or(0)
}
