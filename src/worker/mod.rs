//! # Worker Runtime
//!
//! The offline layer of the site: versioned response caches, the fetch
//! strategy dispatcher and the background-sync replay of queued
//! submissions.
//!
//! ## Lifecycle
//!
//! 1. `install()` precaches the static asset manifest (best effort)
//! 2. `activate()` deletes caches left behind by older versions
//! 3. `handle_fetch()` answers intercepted requests once active
//! 4. `on_sync(tag)` replays the offline queue for one submission kind
//!
//! ## Key Components
//!
//! - `cache.rs`: partitioned cache storage
//! - `strategy.rs`: request classification and caching policies
//! - `network.rs`: the fetch seam
//! - `offline/`: durable submission queue
//! - `sync.rs`: background-sync tag registry

pub mod cache;
pub mod network;
pub mod offline;
pub mod strategy;
pub mod sync;

pub use cache::{CacheBackend, CacheNames, CacheStorage, MemoryCacheBackend, Partition, SqliteCacheBackend};
pub use network::{HttpNetwork, Network};
pub use offline::{OfflineQueue, PendingSubmission, ReplayReport, SubmissionKind};
pub use strategy::{classify, RequestClass};
pub use sync::SyncRegistry;

use crate::shared::{AppConfig, Method, Request, RequestDestination, Response, SharedError};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// Path of the navigation fallback page
pub const OFFLINE_PAGE: &str = "/offline.html";

/// Worker lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installed,
    Activated,
}

/// What the worker did with an intercepted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchHandling {
    /// Not intercepted; the request goes to the network untouched
    Passthrough,
    /// Answered by the worker
    Respond(Response),
}

/// Result of the install phase
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub cached: Vec<String>,
    pub failed: Vec<(String, SharedError)>,
}

/// The worker runtime
pub struct ServiceWorker {
    config: AppConfig,
    cache: CacheStorage,
    network: Arc<dyn Network>,
    queue: OfflineQueue,
    state: RwLock<WorkerState>,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl ServiceWorker {
    pub fn new(config: AppConfig, cache: CacheStorage, network: Arc<dyn Network>, queue: OfflineQueue) -> Self {
        Self {
            config,
            cache,
            network,
            queue,
            state: RwLock::new(WorkerState::Parsed),
            background: Mutex::new(Vec::new()),
        }
    }

    pub fn cache(&self) -> &CacheStorage {
        &self.cache
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Precache the static manifest
    ///
    /// A failure to cache one asset is recorded and skipped; installation
    /// itself only fails when cache storage is unusable.
    pub async fn install(&self) -> Result<InstallReport, SharedError> {
        tracing::info!("[Worker] Installing version {}", self.config.cache_version);
        self.cache.open_all().await?;

        let mut report = InstallReport::default();
        for asset in &self.config.precache {
            let request = Request::get(asset.as_str());
            let result = match self.network.fetch(&request).await {
                Ok(response) if response.ok() => self.cache.put_into(Partition::Static, asset, &response).await,
                Ok(response) => Err(SharedError::load(asset.as_str(), format!("HTTP {}", response.status))),
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => report.cached.push(asset.clone()),
                Err(e) => {
                    tracing::warn!("[Worker] Failed to precache {}: {}", asset, e);
                    report.failed.push((asset.clone(), e));
                }
            }
        }

        *self.state.write().await = WorkerState::Installed;
        tracing::info!(
            "[Worker] Installed: {} cached, {} failed",
            report.cached.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Delete caches from other versions and start serving fetches
    pub async fn activate(&self) -> Result<Vec<String>, SharedError> {
        let deleted = self.cache.delete_stale().await?;
        *self.state.write().await = WorkerState::Activated;
        tracing::info!("[Worker] Activated, removed {} stale caches", deleted.len());
        Ok(deleted)
    }

    /// Answer an intercepted request
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchHandling, SharedError> {
        if request.method != Method::Get || self.state().await != WorkerState::Activated {
            return Ok(FetchHandling::Passthrough);
        }

        let response = match classify(request) {
            RequestClass::Api => strategy::network_first(request, self.network.as_ref(), &self.cache).await?,
            RequestClass::Image => strategy::cache_first(request, self.network.as_ref(), &self.cache).await?,
            RequestClass::General => self.general(request).await?,
        };
        Ok(FetchHandling::Respond(response))
    }

    async fn general(&self, request: &Request) -> Result<Response, SharedError> {
        match strategy::stale_while_revalidate(request, self.network.clone(), self.cache.clone()).await {
            Ok(outcome) => {
                if let Some(refresh) = outcome.refresh {
                    let mut background = self.background.lock().await;
                    background.retain(|handle| !handle.is_finished());
                    background.push(refresh);
                }
                Ok(outcome.response)
            }
            Err(e) if e.is_offline() && request.destination == RequestDestination::Document => {
                match self.cache.match_any(OFFLINE_PAGE).await? {
                    Some((_, page)) => {
                        tracing::debug!("[Worker] Serving offline page for {}", request.url);
                        Ok(page)
                    }
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Background revalidations still running
    pub async fn pending_background(&self) -> usize {
        self.background
            .lock()
            .await
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Wait for background revalidations to finish
    pub async fn settle(&self) {
        let handles: Vec<JoinHandle<()>> = self.background.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("[Worker] Background task failed: {}", e);
            }
        }
    }

    /// Handle a background sync event
    ///
    /// Unknown tags are ignored. The tag stays registered while records
    /// remain queued, including records queued during the replay.
    pub async fn on_sync(&self, tag: &str) -> Result<Option<ReplayReport>, SharedError> {
        let Some(kind) = SubmissionKind::from_sync_tag(tag) else {
            tracing::warn!("[Worker] Ignoring unknown sync tag {}", tag);
            return Ok(None);
        };

        let report = self.queue.replay(kind, self.network.as_ref()).await?;
        if report.is_drained() {
            // Enqueue adds the record before registering, so checking the
            // store after completing cannot lose a tag
            let registry = self.queue.sync_registry();
            registry.complete(tag).await;
            if self.queue.store().count(kind).await? > 0 {
                tracing::debug!("[Worker] {} received new records during replay", kind);
                registry.register(tag).await;
            }
        }
        Ok(Some(report))
    }

    /// Replay every kind that is registered or still has pending records
    pub async fn sync_all(&self) -> Result<Vec<ReplayReport>, SharedError> {
        let registered = self.queue.sync_registry().pending().await;
        let mut reports = Vec::new();

        for kind in SubmissionKind::ALL {
            let has_records = self.queue.store().count(kind).await? > 0;
            if has_records || registered.iter().any(|tag| tag == kind.sync_tag()) {
                if let Some(report) = self.on_sync(kind.sync_tag()).await? {
                    reports.push(report);
                }
            }
        }
        Ok(reports)
    }
}
