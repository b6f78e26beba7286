//! Integration tests
//!
//! End-to-end flows across the page runtime, the worker and the SQLite stores.

pub mod bootstrap_test;
pub mod cache_test;
pub mod components_test;
pub mod offline_replay_test;
