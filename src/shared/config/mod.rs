//! Application configuration module
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then `FUELQ_*` environment overrides.
//!
//! ```rust
//! use fuelq::shared::config::AppConfig;
//!
//! let config = AppConfig::builder()
//!     .cache_version("v7")
//!     .build()
//!     .unwrap();
//! assert_eq!(config.cache_version, "v7");
//! ```

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Default server URL
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Assets precached into the static partition at install time
pub const DEFAULT_PRECACHE: &[&str] = &[
    "/",
    "/index.html",
    "/offline.html",
    "/manifest.json",
    "/src/css/styles.css",
    "/src/js/main.js",
    "/src/components/header.html",
    "/src/components/footer.html",
    "/src/images/logo.png",
];

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Prefix for cache names and the state snapshot key
    pub app_name: String,
    /// Deploy version; bumping it invalidates every cache
    pub cache_version: String,
    /// Origin the site is served from
    pub server_url: String,
    /// Directory holding the SQLite stores
    pub data_dir: PathBuf,
    /// Key of the state snapshot; derived from `app_name` when unset
    pub state_key: Option<String>,
    /// Seconds between state snapshots
    pub persist_interval_secs: u64,
    /// Bounded length of the state history ring
    pub history_capacity: usize,
    /// Seconds between background sync passes in the runner
    pub sync_interval_secs: u64,
    /// Static asset manifest
    pub precache: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "fuelq".to_string(),
            cache_version: "v1".to_string(),
            server_url: DEFAULT_SERVER_URL.to_string(),
            data_dir: default_data_dir(),
            state_key: None,
            persist_interval_secs: 30,
            history_capacity: 50,
            sync_interval_secs: 60,
            precache: DEFAULT_PRECACHE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
    path.push("fuelq");
    path
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            toml::from_str(source).map_err(|e| ConfigError::InvalidToml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration: `FUELQ_CONFIG` file if set, then environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let config = match std::env::var("FUELQ_CONFIG") {
            Ok(path) => {
                let source = std::fs::read_to_string(&path)
                    .map_err(|e| ConfigError::Unreadable(format!("{}: {}", path, e)))?;
                Self::from_toml_str(&source)?
            }
            Err(_) => Self::default(),
        };
        let config = config.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `FUELQ_*` environment variables on top of this configuration
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(url) = std::env::var("FUELQ_SERVER_URL") {
            self.server_url = url;
        }
        if let Ok(version) = std::env::var("FUELQ_CACHE_VERSION") {
            self.cache_version = version;
        }
        if let Ok(dir) = std::env::var("FUELQ_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(secs) = std::env::var("FUELQ_SYNC_INTERVAL_SECS") {
            self.sync_interval_secs = secs
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("FUELQ_SYNC_INTERVAL_SECS", secs))?;
        }
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(self.server_url.clone()));
        }
        if self.app_name.is_empty() {
            return Err(ConfigError::MissingValue("app_name"));
        }
        if self.cache_version.is_empty() {
            return Err(ConfigError::MissingValue("cache_version"));
        }
        if self.persist_interval_secs == 0 {
            return Err(ConfigError::ZeroValue("persist_interval_secs"));
        }
        if self.sync_interval_secs == 0 {
            return Err(ConfigError::ZeroValue("sync_interval_secs"));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroValue("history_capacity"));
        }
        Ok(())
    }

    /// Key the state snapshot is stored under
    pub fn state_key(&self) -> String {
        self.state_key
            .clone()
            .unwrap_or_else(|| format!("{}-state", self.app_name))
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    app_name: Option<String>,
    cache_version: Option<String>,
    server_url: Option<String>,
    data_dir: Option<PathBuf>,
    state_key: Option<String>,
    persist_interval_secs: Option<u64>,
    history_capacity: Option<usize>,
    sync_interval_secs: Option<u64>,
    precache: Option<Vec<String>>,
}

impl AppConfigBuilder {
    /// Set the application name
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Set the cache version
    pub fn cache_version(mut self, version: impl Into<String>) -> Self {
        self.cache_version = Some(version.into());
        self
    }

    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Set the data directory
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Override the state snapshot key
    pub fn state_key(mut self, key: impl Into<String>) -> Self {
        self.state_key = Some(key.into());
        self
    }

    /// Set the snapshot interval
    pub fn persist_interval_secs(mut self, secs: u64) -> Self {
        self.persist_interval_secs = Some(secs);
        self
    }

    /// Set the history ring capacity
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = Some(capacity);
        self
    }

    /// Set the background sync interval
    pub fn sync_interval_secs(mut self, secs: u64) -> Self {
        self.sync_interval_secs = Some(secs);
        self
    }

    /// Replace the precache manifest
    pub fn precache<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.precache = Some(assets.into_iter().map(Into::into).collect());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let defaults = AppConfig::default();
        let config = AppConfig {
            app_name: self.app_name.unwrap_or(defaults.app_name),
            cache_version: self.cache_version.unwrap_or(defaults.cache_version),
            server_url: self.server_url.unwrap_or(defaults.server_url),
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            state_key: self.state_key.or(defaults.state_key),
            persist_interval_secs: self
                .persist_interval_secs
                .unwrap_or(defaults.persist_interval_secs),
            history_capacity: self.history_capacity.unwrap_or(defaults.history_capacity),
            sync_interval_secs: self.sync_interval_secs.unwrap_or(defaults.sync_interval_secs),
            precache: self.precache.unwrap_or(defaults.precache),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
    #[error("invalid number for {0}: {1}")]
    InvalidNumber(&'static str, String),
    #[error("invalid TOML: {0}")]
    InvalidToml(String),
    #[error("unreadable config file: {0}")]
    Unreadable(String),
}
