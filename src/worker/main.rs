/**
 * FuelQ Worker Entry Point
 *
 * Runs the offline worker outside a browser: precaches the site into the
 * local cache database, activates the current cache version and replays
 * queued submissions on a fixed interval until interrupted.
 */

use fuelq::local_db::LocalDatabase;
use fuelq::shared::{event, AppConfig};
use fuelq::worker::offline::{OfflineQueue, SqliteOfflineStore, OFFLINE_DB_NAME};
use fuelq::worker::{CacheNames, CacheStorage, HttpNetwork, ServiceWorker, SqliteCacheBackend, SyncRegistry};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        "[STARTUP] {} worker, cache version {}, server {}",
        config.app_name,
        config.cache_version,
        config.server_url
    );

    let cache_db = LocalDatabase::open(config.data_dir.join("cache-storage.db")).await?;
    let offline_db = LocalDatabase::open(config.data_dir.join(format!("{}.db", OFFLINE_DB_NAME))).await?;

    let cache = CacheStorage::new(
        Arc::new(SqliteCacheBackend::new(cache_db).await?),
        CacheNames::new(&config.app_name, &config.cache_version),
    );
    let queue = OfflineQueue::new(
        Arc::new(SqliteOfflineStore::new(offline_db).await?),
        Arc::new(SyncRegistry::new()),
        event::channel(),
    );
    let network = Arc::new(HttpNetwork::new(config.server_url.clone())?);
    let sync_every = Duration::from_secs(config.sync_interval_secs);

    let worker = ServiceWorker::new(config, cache, network, queue);
    let report = worker.install().await?;
    if !report.failed.is_empty() {
        tracing::warn!("[STARTUP] {} assets could not be precached", report.failed.len());
    }
    worker.activate().await?;

    let mut interval = tokio::time::interval(sync_every);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                match worker.sync_all().await {
                    Ok(reports) => {
                        for report in reports.iter().filter(|r| !r.replayed.is_empty() || !r.retained.is_empty()) {
                            tracing::info!(
                                "[Sync] {}: {} replayed, {} retained",
                                report.kind,
                                report.replayed.len(),
                                report.retained.len()
                            );
                        }
                    }
                    Err(e) => tracing::error!("[Sync] Sync pass failed: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("[SHUTDOWN] Interrupted, waiting for background work");
                break;
            }
        }
    }

    worker.settle().await;
    Ok(())
}
