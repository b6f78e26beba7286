//! # Page Runtime
//!
//! Everything that runs on a page: the module registry and its built-in
//! modules, the component fragment loader, the state store and the
//! submission client that falls back to the offline queue.
//!
//! ## Key Components
//!
//! - `bootstrap.rs`: `AppContext` and the three-phase page bootstrap
//! - `modules/`: module trait, registry, sources and page manifest
//! - `components/`: document model, path resolution and fragment loading
//! - `state/`: key/value store with history and snapshots
//! - `submit.rs`: online-or-queued submissions

pub mod bootstrap;
pub mod components;
pub mod modules;
pub mod state;
pub mod submit;

pub use bootstrap::{App, AppContext, BootstrapOutcome, BootstrapReport, FAILURE_BANNER};
pub use components::{ComponentLoader, Element, LoadSummary, Page};
pub use modules::{Module, ModuleRegistry, PageManifest};
pub use state::{StateStore, Subscription};
pub use submit::{SubmissionClient, SubmitOutcome};
