//! # Component Loader
//!
//! Replaces placeholder elements with HTML fragments fetched from the site.
//!
//! ## Behavior
//!
//! - All placeholders on a page load concurrently
//! - Placeholders naming the same fragment share one fetch
//! - A failed fragment renders an inline error in its placeholder; the rest
//!   of the page is unaffected
//! - Every successful injection broadcasts `SiteEvent::ComponentLoaded`

use crate::client::components::page::{Element, Page};
use crate::client::components::paths::{component_name, page_depth, resolve_component_url, rewrite_links};
use crate::shared::event::{broadcast_event, SiteEvent, SiteEventBroadcast};
use crate::shared::{Request, SharedError};
use crate::worker::network::Network;
use futures_util::future::{join_all, BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

type FragmentFetch = Shared<BoxFuture<'static, Result<String, SharedError>>>;

#[derive(Default)]
struct FragmentCache {
    loaded: HashMap<String, String>,
    pending: HashMap<String, FragmentFetch>,
}

/// What one `load_all` pass did
#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    /// Resolved URLs injected, in placeholder order
    pub loaded: Vec<String>,
    pub failed: Vec<(String, SharedError)>,
    /// Placeholders that left the page while their fragment was in flight
    pub skipped: Vec<String>,
}

impl LoadSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fetches and injects component fragments
pub struct ComponentLoader {
    network: Arc<dyn Network>,
    events: SiteEventBroadcast,
    fragments: Mutex<FragmentCache>,
}

impl ComponentLoader {
    pub fn new(network: Arc<dyn Network>, events: SiteEventBroadcast) -> Self {
        Self {
            network,
            events,
            fragments: Mutex::new(FragmentCache::default()),
        }
    }

    /// Fragment HTML for a resolved URL, sharing in-flight fetches
    pub async fn fetch_fragment(&self, url: &str) -> Result<String, SharedError> {
        let fetch = {
            let mut cache = self.fragments.lock().await;
            if let Some(html) = cache.loaded.get(url) {
                return Ok(html.clone());
            }
            match cache.pending.get(url) {
                Some(fetch) => {
                    tracing::debug!("[Components] Joining pending fetch for {}", url);
                    fetch.clone()
                }
                None => {
                    let fetch = Self::start_fetch(self.network.clone(), url.to_string());
                    cache.pending.insert(url.to_string(), fetch.clone());
                    fetch
                }
            }
        };

        let result = fetch.clone().await;

        let mut cache = self.fragments.lock().await;
        if cache.pending.get(url).is_some_and(|f| f.ptr_eq(&fetch)) {
            cache.pending.remove(url);
        }
        if let Ok(html) = &result {
            cache.loaded.insert(url.to_string(), html.clone());
        }
        result
    }

    fn start_fetch(network: Arc<dyn Network>, url: String) -> FragmentFetch {
        async move {
            let response = network
                .fetch(&Request::get(url.as_str()))
                .await
                .map_err(|e| SharedError::component(url.as_str(), None, e.to_string()))?;
            if !response.ok() {
                return Err(SharedError::component(
                    url.as_str(),
                    Some(response.status),
                    format!("HTTP {}", response.status),
                ));
            }
            Ok(response.text())
        }
        .boxed()
        .shared()
    }

    /// Forget fetched fragments
    pub async fn clear_cache(&self) {
        self.fragments.lock().await.loaded.clear();
    }

    /// Fill every placeholder on the page
    ///
    /// Failures are rendered into their placeholder and reported in the
    /// summary, never returned.
    pub async fn load_all(&self, page: &RwLock<Page>) -> LoadSummary {
        let (targets, depth) = {
            let page = page.read().await;
            let targets: Vec<(usize, String, String)> = page
                .placeholders()
                .into_iter()
                .filter_map(|index| {
                    let attribute = page.elements[index].component.clone()?;
                    let url = resolve_component_url(&attribute);
                    Some((index, attribute, url))
                })
                .collect();
            (targets, page_depth(&page.path))
        };

        if targets.is_empty() {
            return LoadSummary::default();
        }
        tracing::debug!("[Components] Loading {} placeholders", targets.len());

        let results = join_all(targets.iter().map(|(_, _, url)| self.fetch_fragment(url))).await;

        let mut summary = LoadSummary::default();
        let mut loaded_events = Vec::new();
        {
            let mut page = page.write().await;
            for ((index, attribute, url), result) in targets.into_iter().zip(results) {
                // The page may have changed while fragments were in flight
                let Some(index) = locate_placeholder(&page, index, &attribute) else {
                    tracing::debug!("[Components] Placeholder for {} is gone, skipping", attribute);
                    summary.skipped.push(url);
                    continue;
                };
                match result {
                    Ok(html) => {
                        let with_assets = {
                            let element = &mut page.elements[index];
                            element.inner_html = rewrite_links(&html, depth, "");
                            element.component = None;
                            loaded_events.push(SiteEvent::ComponentLoaded {
                                element_id: element.id.clone(),
                                component_path: url.clone(),
                            });
                            element.with_assets
                        };
                        if with_assets {
                            let name = component_name(&url);
                            page.add_stylesheet(&format!("/src/css/components/{}.css", name));
                            page.add_script(&format!("/src/js/components/{}.js", name));
                        }
                        summary.loaded.push(url);
                    }
                    Err(e) => {
                        tracing::warn!("[Components] {}", e);
                        let element = &mut page.elements[index];
                        element.inner_html = error_html(&attribute);
                        element.component = None;
                        summary.failed.push((url, e));
                    }
                }
            }
        }

        for event in loaded_events {
            broadcast_event(&self.events, event);
        }

        tracing::info!(
            "[Components] Loaded {} components ({} failed)",
            summary.loaded.len(),
            summary.failed.len()
        );
        summary
    }
}

/// Current index of a placeholder still waiting on `attribute`
///
/// Prefers the index seen when the fetch started, then the first matching
/// placeholder anywhere on the page.
fn locate_placeholder(page: &Page, index: usize, attribute: &str) -> Option<usize> {
    let waiting = |e: &Element| e.component.as_deref() == Some(attribute);
    if page.elements.get(index).is_some_and(waiting) {
        return Some(index);
    }
    page.elements.iter().position(waiting)
}

/// Inline error shown in place of a fragment that failed to load
pub fn error_html(component: &str) -> String {
    format!(
        "<div class=\"component-error\">Failed to load component: {}</div>",
        escape_html(component)
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{event, Response};
    use crate::worker::network::stub::StubNetwork;

    fn loader(network: Arc<StubNetwork>) -> (ComponentLoader, SiteEventBroadcast) {
        let events = event::channel();
        (ComponentLoader::new(network, events.clone()), events)
    }

    #[tokio::test]
    async fn test_injects_fragment_and_rewrites_links() {
        let network = Arc::new(StubNetwork::new());
        network.route(
            "/src/components/header.html",
            Response::new(200, r#"<a href="index.html">Home</a>"#),
        );
        let (loader, events) = loader(network);
        let mut rx = events.subscribe();
        let page = RwLock::new(
            Page::new("/pages/forum.html").with_element(Element::placeholder("../components/header.html").with_id("header")),
        );

        let summary = loader.load_all(&page).await;

        assert!(summary.is_clean());
        let page = page.read().await;
        assert_eq!(page.elements[0].inner_html, r#"<a href="../index.html">Home</a>"#);
        assert!(!page.elements[0].is_placeholder());
        assert_eq!(
            rx.try_recv().unwrap(),
            SiteEvent::ComponentLoaded {
                element_id: Some("header".to_string()),
                component_path: "/src/components/header.html".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_404_renders_inline_error() {
        let network = Arc::new(StubNetwork::new());
        network.route("/src/components/header.html", Response::new(200, "<header></header>"));
        let (loader, _events) = loader(network);
        let page = RwLock::new(
            Page::new("/index.html")
                .with_element(Element::placeholder("components/missing.html"))
                .with_element(Element::placeholder("components/header.html")),
        );

        let summary = loader.load_all(&page).await;

        assert_eq!(summary.failed.len(), 1);
        assert!(matches!(
            summary.failed[0].1,
            SharedError::ComponentLoadError { status: Some(404), .. }
        ));
        let page = page.read().await;
        assert!(page.elements[0].inner_html.contains("Failed"));
        assert_eq!(page.elements[1].inner_html, "<header></header>");
    }

    #[tokio::test]
    async fn test_same_fragment_fetched_once() {
        let network = Arc::new(StubNetwork::new());
        network.route("/src/components/cta.html", Response::new(200, "<div>cta</div>"));
        let (loader, _events) = loader(network.clone());
        let page = RwLock::new(
            Page::new("/index.html")
                .with_element(Element::placeholder("cta"))
                .with_element(Element::placeholder("components/cta.html"))
                .with_element(Element::placeholder("/src/components/cta.html")),
        );

        let summary = loader.load_all(&page).await;

        assert_eq!(summary.loaded.len(), 3);
        assert_eq!(network.calls_to("/src/components/cta.html"), 1);
    }

    #[tokio::test]
    async fn test_assets_registered_once() {
        let network = Arc::new(StubNetwork::new());
        network.route("/src/components/card.html", Response::new(200, "<div></div>"));
        let (loader, _events) = loader(network);
        let page = RwLock::new(
            Page::new("/index.html")
                .with_element(Element::placeholder("card").with_assets())
                .with_element(Element::placeholder("card").with_assets()),
        );

        loader.load_all(&page).await;

        let page = page.read().await;
        assert_eq!(page.stylesheets, vec!["/src/css/components/card.css"]);
        assert_eq!(page.scripts, vec!["/src/js/components/card.js"]);
    }

    #[tokio::test]
    async fn test_page_changed_during_fetch() {
        let network = Arc::new(StubNetwork::new());
        network.route("/src/components/header.html", Response::new(200, "<header></header>"));
        network.route("/src/components/footer.html", Response::new(200, "<footer></footer>"));
        let gate = network.hold();
        let (loader, _events) = loader(network);
        let page = RwLock::new(
            Page::new("/index.html")
                .with_element(Element::placeholder("header").with_id("header"))
                .with_element(Element::placeholder("footer").with_id("footer")),
        );

        // Runs once both fetches are parked on the gate
        let edit = async {
            page.write().await.elements.remove(0);
            gate.add_permits(1);
        };
        let (summary, _) = tokio::join!(loader.load_all(&page), edit);

        assert_eq!(summary.loaded, vec!["/src/components/footer.html"]);
        assert_eq!(summary.skipped, vec!["/src/components/header.html"]);
        let page = page.read().await;
        assert_eq!(page.elements.len(), 1);
        assert_eq!(page.element_by_id("footer").unwrap().inner_html, "<footer></footer>");
    }

    #[test]
    fn test_error_html_escapes() {
        assert_eq!(
            error_html("<x>"),
            "<div class=\"component-error\">Failed to load component: &lt;x&gt;</div>"
        );
    }
}
