//! Module sources: where `ModuleRegistry::load` gets its code from.

use crate::client::modules::Module;
use crate::shared::SharedError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Result of importing a module path
pub struct ImportedModule {
    pub default_export: Option<Arc<dyn Module>>,
    pub namespace: Arc<dyn Module>,
}

impl ImportedModule {
    /// A module whose default export is the registered object
    pub fn with_default(module: Arc<dyn Module>) -> Self {
        Self {
            default_export: Some(module),
            namespace: Arc::new(Namespace),
        }
    }

    /// A module without a default export
    pub fn namespace(module: Arc<dyn Module>) -> Self {
        Self {
            default_export: None,
            namespace: module,
        }
    }

    /// The object that gets registered
    pub fn into_module(self) -> Arc<dyn Module> {
        self.default_export.unwrap_or(self.namespace)
    }
}

/// Namespace object of a module that only has a default export
struct Namespace;

impl Module for Namespace {}

/// Resolves module paths to code
#[async_trait]
pub trait ModuleSource: Send + Sync {
    async fn import(&self, path: &str) -> Result<ImportedModule, SharedError>;
}

/// Constructs a module on import
pub type ModuleFactory = Arc<dyn Fn() -> Result<ImportedModule, SharedError> + Send + Sync>;

/// Compile-time table of importable paths
#[derive(Default)]
pub struct StaticModuleSource {
    factories: HashMap<String, ModuleFactory>,
}

impl StaticModuleSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `path` importable
    pub fn provide<F>(mut self, path: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<ImportedModule, SharedError> + Send + Sync + 'static,
    {
        self.factories.insert(path.into(), Arc::new(factory));
        self
    }

    pub fn contains(&self, path: &str) -> bool {
        self.factories.contains_key(path)
    }
}

#[async_trait]
impl ModuleSource for StaticModuleSource {
    async fn import(&self, path: &str) -> Result<ImportedModule, SharedError> {
        let factory = self
            .factories
            .get(path)
            .ok_or_else(|| SharedError::load(path, "Module not found"))?;
        factory()
    }
}
