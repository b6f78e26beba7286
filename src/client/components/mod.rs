//! HTML component fragments: document model, path resolution and the loader.

pub mod loader;
pub mod page;
pub mod paths;

pub use loader::{error_html, ComponentLoader, LoadSummary};
pub use page::{Element, Page};
pub use paths::{page_depth, resolve_component_url, rewrite_href, rewrite_links};
