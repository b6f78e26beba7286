//! # Module Registry
//!
//! Tracks the named units of page behavior and drives their lifecycle.
//!
//! ## Features
//!
//! - **Insertion order**: modules initialize in the order they were first registered
//! - **Silent overwrite**: registering a name twice replaces the instance in place
//! - **Async init**: every `init` is awaited before `initialize_modules` returns
//! - **Log and continue**: one failing `init` never stops the others
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fuelq::client::modules::{ModuleRegistry, StaticModuleSource};
//! use std::sync::Arc;
//!
//! # async fn example(source: Arc<StaticModuleSource>) -> Result<(), fuelq::shared::SharedError> {
//! let registry = ModuleRegistry::new(source);
//! registry.load("/src/js/modules/theme.js", "theme").await?;
//!
//! let report = registry
//!     .initialize_modules(&serde_json::json!({"theme": {"default": "dark"}}))
//!     .await;
//! assert!(report.failed.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod builtin;
pub mod loader;
pub mod manifest;

pub use loader::{ImportedModule, ModuleFactory, ModuleSource, StaticModuleSource};
pub use manifest::{ModuleDescriptor, PageManifest};

use crate::shared::SharedError;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A named unit of page behavior
///
/// Modules without setup work keep the default `init`.
#[async_trait]
pub trait Module: Send + Sync {
    /// Called once with this module's configuration slice (`{}` when absent)
    async fn init(&self, _config: &Value) -> Result<(), SharedError> {
        Ok(())
    }
}

/// Registry slot for one module
#[derive(Clone)]
pub struct ModuleEntry {
    pub name: String,
    /// Where the module was loaded from, if it came through `load`
    pub path: Option<String>,
    pub instance: Arc<dyn Module>,
    pub initialized: bool,
}

impl std::fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("initialized", &self.initialized)
            .finish()
    }
}

/// Outcome of one `initialize_modules` pass
#[derive(Debug, Clone, Default)]
pub struct InitReport {
    pub initialized: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, SharedError)>,
}

impl InitReport {
    pub fn failure(&self, name: &str) -> Option<&SharedError> {
        self.failed.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }
}

/// Insertion-ordered name → module registry
pub struct ModuleRegistry {
    entries: RwLock<Vec<ModuleEntry>>,
    source: Arc<dyn ModuleSource>,
}

impl ModuleRegistry {
    pub fn new(source: Arc<dyn ModuleSource>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            source,
        }
    }

    /// Insert a module; an existing name is overwritten in place
    pub async fn register(&self, name: &str, module: Arc<dyn Module>) {
        self.insert(name, None, module).await;
    }

    async fn insert(&self, name: &str, path: Option<String>, module: Arc<dyn Module>) {
        let mut entries = self.entries.write().await;
        let entry = ModuleEntry {
            name: name.to_string(),
            path,
            instance: module,
            initialized: false,
        };

        match entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => {
                tracing::debug!("[Modules] Replacing module {}", name);
                *existing = entry;
            }
            None => {
                tracing::debug!("[Modules] Registered module {}", name);
                entries.push(entry);
            }
        }
    }

    pub async fn get_module(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.entries
            .read()
            .await
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.instance.clone())
    }

    pub async fn entry(&self, name: &str) -> Option<ModuleEntry> {
        self.entries.read().await.iter().find(|e| e.name == name).cloned()
    }

    /// Registered names in registration order
    pub async fn names(&self) -> Vec<String> {
        self.entries.read().await.iter().map(|e| e.name.clone()).collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn is_initialized(&self, name: &str) -> bool {
        self.entries
            .read()
            .await
            .iter()
            .any(|e| e.name == name && e.initialized)
    }

    /// Import the module at `path` and register it under `name`
    ///
    /// The default export wins over the namespace object. A name already
    /// loaded from the same path is returned as is. Import failures come
    /// back as `LoadError` and are not retried.
    pub async fn load(&self, path: &str, name: &str) -> Result<Arc<dyn Module>, SharedError> {
        if let Some(existing) = self
            .entries
            .read()
            .await
            .iter()
            .find(|e| e.name == name && e.path.as_deref() == Some(path))
        {
            tracing::debug!("[Modules] {} already loaded", name);
            return Ok(existing.instance.clone());
        }

        let imported = self.source.import(path).await.map_err(|e| {
            tracing::warn!("[Modules] Failed to load {} from {}: {}", name, path, e);
            match e {
                SharedError::LoadError { .. } => e,
                other => SharedError::load(path, other.to_string()),
            }
        })?;

        let module = imported.into_module();
        self.insert(name, Some(path.to_string()), module.clone()).await;
        Ok(module)
    }

    /// Initialize every registered module in registration order
    ///
    /// Each module receives `config[name]`, or `{}` when the slice is
    /// missing. Already-initialized modules are skipped. A failing `init` is
    /// logged and recorded; iteration continues.
    pub async fn initialize_modules(&self, config: &Value) -> InitReport {
        let snapshot: Vec<ModuleEntry> = self.entries.read().await.clone();
        let mut report = InitReport::default();
        let empty = Value::Object(Default::default());

        for entry in snapshot {
            if entry.initialized {
                report.skipped.push(entry.name);
                continue;
            }

            let slice = config.get(&entry.name).unwrap_or(&empty);
            match entry.instance.init(slice).await {
                Ok(()) => {
                    self.mark_initialized(&entry).await;
                    tracing::debug!("[Modules] Initialized {}", entry.name);
                    report.initialized.push(entry.name);
                }
                Err(e) => {
                    tracing::warn!("[Modules] Failed to initialize {}: {}", entry.name, e);
                    report.failed.push((entry.name, e));
                }
            }
        }

        tracing::info!(
            "[Modules] Initialized {} modules ({} failed)",
            report.initialized.len(),
            report.failed.len()
        );
        report
    }

    async fn mark_initialized(&self, initialized: &ModuleEntry) {
        let mut entries = self.entries.write().await;
        // A module replaced while its predecessor was initializing stays uninitialized
        if let Some(entry) = entries
            .iter_mut()
            .find(|e| e.name == initialized.name && Arc::ptr_eq(&e.instance, &initialized.instance))
        {
            entry.initialized = true;
        }
    }
}
