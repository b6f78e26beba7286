//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - A scriptable, call-counting network
//! - SQLite-backed stores on temporary directories
//! - Page context builders

pub mod fixtures;
pub mod network;

// Re-export commonly used utilities
pub use fixtures::*;
pub use network::*;
