//! Shared Module
//!
//! Types shared by the page runtime (`client`) and the worker runtime
//! (`worker`): the error taxonomy, configuration, HTTP value types and the
//! site event channel.

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Request and response values
pub mod http;

/// Site event broadcast
pub mod event;

/// Re-export commonly used types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::SharedError;
pub use event::{SiteEvent, SiteEventBroadcast};
pub use http::{Method, Request, RequestDestination, Response};
