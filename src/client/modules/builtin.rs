//! # Built-in Modules
//!
//! The closed set of modules the site ships with, and the module source
//! that makes them importable by path.
//!
//! ## Core
//!
//! - `navigation`: tracks the active page and highlights its links in the header
//! - `theme`: restores the saved theme or applies the configured default
//! - `analytics`: counts page views when enabled
//! - `components`: fills the page's component placeholders
//!
//! ## Page
//!
//! `animation`, `homePage`, `forum`, `thread`, `contact`, `chat`, `about` and
//! `services` record their configuration under `modules.<name>`.

use crate::client::bootstrap::AppContext;
use crate::client::components::paths::{absolutize, component_name};
use crate::client::modules::loader::{ImportedModule, StaticModuleSource};
use crate::client::modules::manifest::{core_modules, normalize_route, page_modules};
use crate::client::modules::Module;
use crate::shared::{SharedError, SiteEvent};
use async_trait::async_trait;
use regex::{Captures, NoExpand, Regex};
use serde_json::{json, Value};
use std::sync::{Arc, LazyLock, Weak};
use tokio::sync::broadcast::error::RecvError;

/// Themes the site can render
pub const THEMES: [&str; 2] = ["light", "dark"];

/// Fragments that carry the site navigation
const NAVIGATION_FRAGMENTS: [&str; 3] = ["header", "nav", "navigation"];

static ANCHOR_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<a\s[^>]*>").expect("valid anchor regex"));

static HREF_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href=["']([^"']*)["']"#).expect("valid href regex"));

static CLASS_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"class="([^"]*)""#).expect("valid class regex"));

/// Module source for every built-in module
pub fn site_module_source(ctx: &Arc<AppContext>) -> StaticModuleSource {
    let mut source = StaticModuleSource::new();

    for descriptor in core_modules() {
        let ctx = ctx.clone();
        let name = descriptor.name;
        source = source.provide(descriptor.path, move || {
            core_module(name, ctx.clone())
                .map(ImportedModule::with_default)
                .ok_or_else(|| SharedError::load(name, "No built-in module with this name"))
        });
    }

    for descriptor in page_modules() {
        let ctx = ctx.clone();
        let name = descriptor.name;
        source = source.provide(descriptor.path, move || {
            Ok(ImportedModule::namespace(Arc::new(PageModule::new(name, ctx.clone()))))
        });
    }

    source
}

fn core_module(name: &str, ctx: Arc<AppContext>) -> Option<Arc<dyn Module>> {
    let module: Arc<dyn Module> = match name {
        "navigation" => Arc::new(Navigation { ctx }),
        "theme" => Arc::new(Theme { ctx }),
        "analytics" => Arc::new(Analytics { ctx }),
        "components" => Arc::new(Components { ctx }),
        _ => return None,
    };
    Some(module)
}

/// Active-page tracking and header link highlighting
pub struct Navigation {
    ctx: Arc<AppContext>,
}

impl Navigation {
    async fn highlight(ctx: &AppContext, element_id: Option<&str>) -> usize {
        let mut page = ctx.page.write().await;
        let path = page.path.clone();
        let mut marked = 0;

        for element in page.elements.iter_mut() {
            let targeted = match element_id {
                Some(id) => element.id.as_deref() == Some(id),
                None => !element.is_placeholder(),
            };
            if !targeted {
                continue;
            }
            let (html, count) = mark_active_links(&element.inner_html, &path);
            element.inner_html = html;
            marked += count;
        }
        marked
    }
}

#[async_trait]
impl Module for Navigation {
    async fn init(&self, _config: &Value) -> Result<(), SharedError> {
        let path = normalize_route(&self.ctx.page.read().await.path);
        self.ctx.state.set("navigation.active_path", json!(path), true);

        // Fragments injected before this point
        Self::highlight(&self.ctx, None).await;

        let mut rx = self.ctx.events.subscribe();
        let ctx: Weak<AppContext> = Arc::downgrade(&self.ctx);
        let listener = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(SiteEvent::ComponentLoaded {
                        element_id,
                        component_path,
                    }) if NAVIGATION_FRAGMENTS.contains(&component_name(&component_path)) => {
                        let Some(ctx) = ctx.upgrade() else { break };
                        let marked = Self::highlight(&ctx, element_id.as_deref()).await;
                        tracing::debug!("[Navigation] Marked {} active links in {}", marked, component_path);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("[Navigation] Missed {} site events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        self.ctx.track_task(listener).await;
        Ok(())
    }
}

/// Add the `active` class to anchors pointing at `page_path`
///
/// Returns the rewritten HTML and the number of anchors marked.
pub fn mark_active_links(html: &str, page_path: &str) -> (String, usize) {
    let current = normalize_route(page_path);
    let mut marked = 0;

    let rewritten = ANCHOR_TAG.replace_all(html, |caps: &Captures| {
        let tag = &caps[0];
        let is_current = HREF_VALUE
            .captures(tag)
            .and_then(|href| absolutize(page_path, &href[1]))
            .is_some_and(|target| target == current);
        if !is_current {
            return tag.to_string();
        }

        match CLASS_VALUE.captures(tag) {
            Some(class) if class[1].split_whitespace().any(|c| c == "active") => tag.to_string(),
            Some(class) => {
                marked += 1;
                let classes = format!("class=\"{} active\"", class[1].trim());
                CLASS_VALUE.replace(tag, NoExpand(&classes)).into_owned()
            }
            None => {
                marked += 1;
                format!("{} class=\"active\">", tag.trim_end_matches('>').trim_end())
            }
        }
    });

    (rewritten.into_owned(), marked)
}

/// Theme selection
pub struct Theme {
    ctx: Arc<AppContext>,
}

#[async_trait]
impl Module for Theme {
    async fn init(&self, config: &Value) -> Result<(), SharedError> {
        let default = match config.get("default") {
            None => "light",
            Some(Value::String(theme)) if THEMES.contains(&theme.as_str()) => theme.as_str(),
            Some(other) => {
                return Err(SharedError::validation(
                    "theme.default",
                    format!("Unknown theme {}", other),
                ))
            }
        };

        let theme = match self.ctx.state.get("theme") {
            Some(Value::String(saved)) if THEMES.contains(&saved.as_str()) => saved,
            _ => default.to_string(),
        };
        tracing::debug!("[Theme] Using {} theme", theme);
        self.ctx.state.set("theme", json!(theme), true);
        Ok(())
    }
}

/// Page view counting
pub struct Analytics {
    ctx: Arc<AppContext>,
}

#[async_trait]
impl Module for Analytics {
    async fn init(&self, config: &Value) -> Result<(), SharedError> {
        if !config.get("enabled").and_then(Value::as_bool).unwrap_or(false) {
            tracing::debug!("[Analytics] Disabled");
            return Ok(());
        }

        let tracking_id = config
            .get("tracking_id")
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| SharedError::validation("analytics.tracking_id", "Required when analytics is enabled"))?;

        let views = self
            .ctx
            .state
            .get("analytics.page_views")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let path = self.ctx.page.read().await.path.clone();
        self.ctx.state.set_multiple(
            [
                ("analytics.tracking_id", json!(tracking_id)),
                ("analytics.page_views", json!(views + 1)),
                ("analytics.last_page", json!(path)),
            ],
            true,
        );
        Ok(())
    }
}

/// Component placeholder filling
pub struct Components {
    ctx: Arc<AppContext>,
}

#[async_trait]
impl Module for Components {
    async fn init(&self, _config: &Value) -> Result<(), SharedError> {
        let summary = self.ctx.components.load_all(&self.ctx.page).await;
        let failed: Vec<&str> = summary.failed.iter().map(|(url, _)| url.as_str()).collect();
        self.ctx.state.set_multiple(
            [
                ("components.loaded", json!(summary.loaded)),
                ("components.failed", json!(failed)),
            ],
            false,
        );
        Ok(())
    }
}

/// Page-specific behavior
pub struct PageModule {
    name: &'static str,
    ctx: Arc<AppContext>,
}

impl PageModule {
    pub fn new(name: &'static str, ctx: Arc<AppContext>) -> Self {
        Self { name, ctx }
    }
}

#[async_trait]
impl Module for PageModule {
    async fn init(&self, config: &Value) -> Result<(), SharedError> {
        self.ctx
            .state
            .set(&format!("modules.{}", self.name), config.clone(), true);
        Ok(())
    }
}
