//! Shared Error Types
//!
//! This module defines the error taxonomy used by both the page runtime and
//! the worker runtime. Every fallible operation in the crate returns
//! `Result<T, SharedError>`.
//!
//! # Error Categories
//!
//! - `LoadError` - A module import failed
//! - `ComponentLoadError` - An HTML fragment could not be fetched
//! - `ValidationError` - A configuration slice or payload was rejected
//! - `NetworkError` - The network is unreachable (the "offline" condition)
//! - `OfflineReplayError` - A queued submission failed to replay
//! - `StorageError` - Snapshot, cache or offline-store failure
//! - `SerializationError` - JSON encode/decode failure
//! - `BootstrapError` - The top-level page bootstrap failed
//!
//! # Usage
//!
//! ```rust
//! use fuelq::shared::error::SharedError;
//!
//! let error = SharedError::validation("theme", "unknown theme 'sepia'");
//! assert!(!error.is_offline());
//! ```
//!
//! # Thread Safety
//!
//! All error types are `Send + Sync + Clone`, so a single failure can be
//! handed to every waiter of a deduplicated fetch.
use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// Dynamic import of a module failed
    #[error("Failed to load module '{path}': {message}")]
    LoadError {
        /// Path the loader tried to import
        path: String,
        /// Human-readable error message
        message: String,
    },

    /// HTML fragment fetch failed or returned a non-2xx status
    #[error("Failed to load component '{path}': {message}")]
    ComponentLoadError {
        /// Resolved fragment URL
        path: String,
        /// HTTP status when the server answered, `None` for transport failures
        status: Option<u16>,
        /// Human-readable error message
        message: String,
    },

    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// The network could not be reached
    #[error("Network error for '{url}': {message}")]
    NetworkError {
        /// Request URL
        url: String,
        /// Human-readable error message
        message: String,
    },

    /// A queued submission could not be replayed
    #[error("Replay of {kind} #{id} failed: {message}")]
    OfflineReplayError {
        /// Submission kind (store name)
        kind: String,
        /// Record id in the offline store
        id: i64,
        /// Human-readable error message
        message: String,
    },

    /// Durable storage failure
    #[error("Storage error: {message}")]
    StorageError {
        /// Human-readable error message
        message: String,
    },

    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Human-readable error message
        message: String,
    },

    /// Top-level bootstrap failure
    #[error("Bootstrap failed: {message}")]
    BootstrapError {
        /// Human-readable error message
        message: String,
    },
}

impl SharedError {
    /// Create a new module load error
    pub fn load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LoadError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new component load error
    pub fn component(path: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::ComponentLoadError {
            path: path.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NetworkError {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a new replay error
    pub fn replay(kind: impl Into<String>, id: i64, message: impl Into<String>) -> Self {
        Self::OfflineReplayError {
            kind: kind.into(),
            id,
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageError {
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Create a new bootstrap error
    pub fn bootstrap(message: impl Into<String>) -> Self {
        Self::BootstrapError {
            message: message.into(),
        }
    }

    /// Whether this failure is attributable to network unavailability
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::NetworkError { .. })
            || matches!(self, Self::ComponentLoadError { status: None, .. })
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}

impl From<sqlx::Error> for SharedError {
    fn from(err: sqlx::Error) -> Self {
        Self::storage(format!("SQLite error: {}", err))
    }
}

impl From<reqwest::Error> for SharedError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();
        if err.is_decode() {
            Self::serialization(format!("Response decode error: {}", err))
        } else if err.is_connect() || err.is_timeout() || err.is_request() {
            Self::network(url, err.to_string())
        } else {
            Self::validation("request", err.to_string())
        }
    }
}

impl From<std::io::Error> for SharedError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(format!("I/O error: {}", err))
    }
}
