/**
 * Page Bootstrap
 *
 * Brings a page to life in three phases:
 *
 * 1. Core modules (navigation, theme, analytics, components) are loaded
 *    concurrently
 * 2. The page manifest is consulted and page modules are loaded concurrently
 * 3. Every registered module is initialized with its configuration slice
 *
 * A required module that fails to load or initialize aborts the bootstrap;
 * anything else is logged and skipped. When `App::run` sees a failed
 * bootstrap it shows the failure banner instead of a half-working page.
 */
use crate::client::components::{ComponentLoader, Page};
use crate::client::modules::builtin::site_module_source;
use crate::client::modules::manifest::core_modules;
use crate::client::modules::{InitReport, ModuleDescriptor, ModuleRegistry, ModuleSource, PageManifest};
use crate::client::state::{spawn_autosave, StateStore};
use crate::client::submit::SubmissionClient;
use crate::shared::{AppConfig, SharedError, SiteEventBroadcast};
use crate::worker::network::Network;
use crate::worker::offline::OfflineQueue;
use futures_util::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tokio::task::JoinHandle;

/// Banner shown when the page could not be brought up
pub const FAILURE_BANNER: &str = "Application failed to load. Please refresh the page.";

/// Everything a page's modules share
pub struct AppContext {
    pub config: AppConfig,
    pub state: Arc<StateStore>,
    pub page: RwLock<Page>,
    pub components: ComponentLoader,
    pub events: SiteEventBroadcast,
    pub submissions: SubmissionClient,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    restored: OnceCell<bool>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        page: Page,
        network: Arc<dyn Network>,
        state: StateStore,
        queue: OfflineQueue,
        events: SiteEventBroadcast,
    ) -> Self {
        Self {
            config,
            state: Arc::new(state.with_events(events.clone())),
            page: RwLock::new(page),
            components: ComponentLoader::new(network.clone(), events.clone()),
            events,
            submissions: SubmissionClient::new(network, queue),
            tasks: Mutex::new(Vec::new()),
            restored: OnceCell::new(),
        }
    }

    /// Restore the saved state snapshot; later calls are no-ops
    ///
    /// Returns whether a snapshot was restored by the first call.
    pub async fn restore_state(&self) -> bool {
        *self.restored.get_or_init(|| self.state.load()).await
    }

    /// Keep a background task alive until teardown
    pub async fn track_task(&self, handle: JoinHandle<()>) {
        self.tasks.lock().await.push(handle);
    }

    async fn abort_tasks(&self) {
        for handle in self.tasks.lock().await.drain(..) {
            handle.abort();
        }
    }
}

/// What a successful bootstrap did
#[derive(Debug, Clone, Default)]
pub struct BootstrapReport {
    /// Modules loaded, in load order
    pub loaded: Vec<String>,
    /// Optional modules that failed to load
    pub load_failures: Vec<(String, SharedError)>,
    pub init: InitReport,
}

/// Result of `App::run`
#[derive(Debug, Clone)]
pub enum BootstrapOutcome {
    Ready(BootstrapReport),
    Failed(SharedError),
}

impl BootstrapOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, BootstrapOutcome::Ready(_))
    }
}

/// A running page
pub struct App {
    ctx: Arc<AppContext>,
    registry: ModuleRegistry,
    manifest: PageManifest,
    autosave: Mutex<Option<JoinHandle<()>>>,
}

impl App {
    pub fn new(ctx: Arc<AppContext>, source: Arc<dyn ModuleSource>, manifest: PageManifest) -> Self {
        Self {
            ctx,
            registry: ModuleRegistry::new(source),
            manifest,
            autosave: Mutex::new(None),
        }
    }

    /// The site's page runtime with its built-in modules
    pub fn site(ctx: Arc<AppContext>) -> Self {
        let source = Arc::new(site_module_source(&ctx));
        Self::new(ctx, source, PageManifest::site())
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Load and initialize the page's modules
    ///
    /// `config` maps module names to their configuration slices.
    pub async fn bootstrap(&self, config: &Value) -> Result<BootstrapReport, SharedError> {
        self.ctx.restore_state().await;
        self.start_autosave().await;

        let mut report = BootstrapReport::default();

        self.load_phase(core_modules(), &mut report).await?;

        let path = self.ctx.page.read().await.path.clone();
        let page_modules = self.manifest.lookup(&path).to_vec();
        tracing::info!("[Bootstrap] {} page modules for {}", page_modules.len(), path);
        self.load_phase(&page_modules, &mut report).await?;

        report.init = self.registry.initialize_modules(config).await;
        for descriptor in core_modules().iter().chain(page_modules.iter()) {
            if let Some(e) = report.init.failure(descriptor.name) {
                if descriptor.required {
                    return Err(SharedError::bootstrap(format!(
                        "Required module {} failed to initialize: {}",
                        descriptor.name, e
                    )));
                }
            }
        }

        tracing::info!("[Bootstrap] Ready with {} modules", report.loaded.len());
        Ok(report)
    }

    async fn load_phase(&self, modules: &[ModuleDescriptor], report: &mut BootstrapReport) -> Result<(), SharedError> {
        let results = join_all(modules.iter().map(|d| self.registry.load(d.path, d.name))).await;

        for (descriptor, result) in modules.iter().zip(results) {
            match result {
                Ok(_) => report.loaded.push(descriptor.name.to_string()),
                Err(e) if descriptor.required => {
                    return Err(SharedError::bootstrap(format!(
                        "Required module {} failed to load: {}",
                        descriptor.name, e
                    )));
                }
                Err(e) => {
                    tracing::warn!("[Bootstrap] Skipping {}: {}", descriptor.name, e);
                    report.load_failures.push((descriptor.name.to_string(), e));
                }
            }
        }
        Ok(())
    }

    async fn start_autosave(&self) {
        let mut autosave = self.autosave.lock().await;
        if autosave.is_none() && self.ctx.config.persist_interval_secs > 0 {
            let every = Duration::from_secs(self.ctx.config.persist_interval_secs);
            *autosave = Some(spawn_autosave(self.ctx.state.clone(), every));
        }
    }

    /// Bootstrap, showing the failure banner if it fails
    pub async fn run(&self, config: &Value) -> BootstrapOutcome {
        match self.bootstrap(config).await {
            Ok(report) => BootstrapOutcome::Ready(report),
            Err(e) => {
                tracing::error!("[Bootstrap] {}", e);
                self.ctx.page.write().await.banner = Some(FAILURE_BANNER.to_string());
                BootstrapOutcome::Failed(e)
            }
        }
    }

    /// Stop background work and save the state one last time
    pub async fn teardown(&self) -> Result<(), SharedError> {
        if let Some(handle) = self.autosave.lock().await.take() {
            handle.abort();
        }
        self.ctx.abort_tasks().await;
        self.ctx.state.persist().await?;
        Ok(())
    }
}
