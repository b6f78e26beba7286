//! Store and context fixtures

use crate::common::network::CountingNetwork;
use fuelq::client::state::MemorySnapshotStorage;
use fuelq::client::{AppContext, Page, StateStore};
use fuelq::local_db::LocalDatabase;
use fuelq::shared::{event, AppConfig, SiteEventBroadcast};
use fuelq::worker::offline::{MemoryOfflineStore, OfflineQueue, SqliteOfflineStore, OFFLINE_DB_NAME};
use fuelq::worker::{CacheNames, CacheStorage, MemoryCacheBackend, Network, ServiceWorker, SqliteCacheBackend, SyncRegistry};
use std::sync::Arc;
use tempfile::TempDir;

/// Configuration pointing at a temporary data directory
pub fn test_config(dir: &TempDir) -> AppConfig {
    AppConfig::builder()
        .data_dir(dir.path())
        .build()
        .expect("valid test config")
}

/// Offline queue on a SQLite file under `dir`
pub async fn sqlite_queue(dir: &TempDir, events: SiteEventBroadcast) -> OfflineQueue {
    let db = LocalDatabase::open(dir.path().join(format!("{}.db", OFFLINE_DB_NAME)))
        .await
        .expect("open offline db");
    let store = SqliteOfflineStore::new(db).await.expect("offline schema");
    OfflineQueue::new(Arc::new(store), Arc::new(SyncRegistry::new()), events)
}

pub fn memory_queue(events: SiteEventBroadcast) -> OfflineQueue {
    OfflineQueue::new(Arc::new(MemoryOfflineStore::new()), Arc::new(SyncRegistry::new()), events)
}

/// Cache storage on a SQLite file under `dir`
pub async fn sqlite_cache(dir: &TempDir, config: &AppConfig) -> CacheStorage {
    let db = LocalDatabase::open(dir.path().join("cache-storage.db"))
        .await
        .expect("open cache db");
    let backend = SqliteCacheBackend::new(db).await.expect("cache schema");
    CacheStorage::new(Arc::new(backend), CacheNames::new(&config.app_name, &config.cache_version))
}

pub fn memory_cache(config: &AppConfig) -> CacheStorage {
    CacheStorage::new(
        Arc::new(MemoryCacheBackend::new()),
        CacheNames::new(&config.app_name, &config.cache_version),
    )
}

/// Page context with in-memory stores
pub fn page_context(page: Page, network: Arc<CountingNetwork>) -> Arc<AppContext> {
    let events = event::channel();
    let config = AppConfig::default();
    let state = StateStore::from_config(&config, Arc::new(MemorySnapshotStorage::new()));
    let queue = memory_queue(events.clone());
    Arc::new(AppContext::new(config, page, network, state, queue, events))
}

/// Installed and activated worker on in-memory stores
pub async fn active_worker(network: Arc<CountingNetwork>, precache: &[&str]) -> ServiceWorker {
    let config = AppConfig::builder()
        .precache(precache.iter().copied())
        .build()
        .expect("valid test config");
    let cache = memory_cache(&config);
    let queue = memory_queue(event::channel());
    let network: Arc<dyn Network> = network;
    let worker = ServiceWorker::new(config, cache, network, queue);
    worker.install().await.expect("install");
    worker.activate().await.expect("activate");
    worker
}
