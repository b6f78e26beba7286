//! FuelQ - Client Runtime Library
//!
//! The client runtime of the FuelQ site: the page-side module and component
//! system, and the offline worker that caches the site and replays
//! submissions made without a connection.
//!
//! # Overview
//!
//! This library provides:
//! - A module registry with a static page manifest and a three-phase bootstrap
//! - An HTML component loader with shared fetches and inline failure rendering
//! - A key/value state store with subscriptions, history and durable snapshots
//! - A durable offline submission queue with background-sync replay
//! - Versioned response caches and per-request-class fetch strategies
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared by both runtimes
//!   - Error taxonomy, configuration, HTTP values, site events
//!
//! - **`local_db`** - SQLite connection and schema management
//!
//! - **`client`** - The page runtime
//!   - Module registry, built-in modules, page manifest, bootstrap
//!   - Component loader and document model
//!   - State store and snapshot persistence
//!   - Submission client
//!
//! - **`worker`** - The offline worker
//!   - Cache storage and fetch strategies
//!   - Offline submission queue and background sync
//!   - Network access
//!
//! # Feature Flags
//!
//! - **`runner`** - Builds the `fuelq-worker` binary (logging subscriber, `.env` loading)
//!
//! # Usage
//!
//! ## Page
//!
//! ```rust,no_run
//! use fuelq::client::{App, AppContext, Page, StateStore};
//! use fuelq::shared::{event, AppConfig};
//! use fuelq::worker::offline::{MemoryOfflineStore, OfflineQueue};
//! use fuelq::worker::{HttpNetwork, SyncRegistry};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! let events = event::channel();
//! let network = Arc::new(HttpNetwork::new(config.server_url.clone())?);
//! let queue = OfflineQueue::new(Arc::new(MemoryOfflineStore::new()), Arc::new(SyncRegistry::new()), events.clone());
//! let state = StateStore::new(config.history_capacity);
//!
//! let ctx = Arc::new(AppContext::new(config, Page::new("/index.html"), network, state, queue, events));
//! let app = App::site(ctx);
//! app.run(&serde_json::json!({"theme": {"default": "dark"}})).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Worker
//!
//! ```rust,no_run
//! use fuelq::shared::Request;
//! use fuelq::worker::{FetchHandling, ServiceWorker};
//!
//! # async fn example(worker: ServiceWorker) -> Result<(), fuelq::shared::SharedError> {
//! worker.install().await?;
//! worker.activate().await?;
//! if let FetchHandling::Respond(response) = worker.handle_fetch(&Request::get("/index.html")).await? {
//!     println!("{} bytes", response.body.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! - Shared state lives behind `Arc<RwLock<>>` / `Arc<Mutex<>>`
//! - Site events travel over `tokio::sync::broadcast`
//! - Durable stores serialize access through SQLite transactions
//!
//! # Error Handling
//!
//! Fallible operations return `Result<T, SharedError>`; configuration
//! problems surface as `ConfigError`.

/// Shared types and data structures
pub mod shared;

/// Local SQLite persistence
pub mod local_db;

/// Page runtime
pub mod client;

/// Offline worker runtime
pub mod worker;
