//! Component loader integration tests

use crate::common::CountingNetwork;
use fuelq::client::components::{ComponentLoader, Element, Page};
use fuelq::shared::{event, Response, SharedError, SiteEvent};
use std::sync::Arc;
use tokio::sync::RwLock;

#[tokio::test]
async fn test_404_fragment_renders_failed_and_page_survives() {
    let network = Arc::new(CountingNetwork::new());
    network.route("/src/components/footer.html", Response::new(200, "<footer>FuelQ</footer>"));
    let events = event::channel();
    let mut rx = events.subscribe();
    let loader = ComponentLoader::new(network, events);
    let page = RwLock::new(
        Page::new("/pages/contact.html")
            .with_element(Element::placeholder("../components/sidebar.html").with_id("sidebar"))
            .with_element(Element::placeholder("../components/footer.html").with_id("footer")),
    );

    let summary = loader.load_all(&page).await;

    assert_eq!(summary.loaded, vec!["/src/components/footer.html"]);
    assert!(matches!(
        &summary.failed[0],
        (url, SharedError::ComponentLoadError { status: Some(404), .. }) if url == "/src/components/sidebar.html"
    ));

    let page = page.read().await;
    let sidebar = page.element_by_id("sidebar").unwrap();
    assert!(sidebar.inner_html.contains("Failed"));
    assert!(sidebar.inner_html.contains("component-error"));
    assert_eq!(page.element_by_id("footer").unwrap().inner_html, "<footer>FuelQ</footer>");

    // Only the successful injection is announced
    assert_eq!(
        rx.try_recv().unwrap(),
        SiteEvent::ComponentLoaded {
            element_id: Some("footer".to_string()),
            component_path: "/src/components/footer.html".to_string(),
        }
    );
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_offline_fragment_renders_failed() {
    let network = Arc::new(CountingNetwork::new());
    network.set_offline(true);
    let loader = ComponentLoader::new(network, event::channel());
    let page = RwLock::new(Page::new("/index.html").with_element(Element::placeholder("header")));

    let summary = loader.load_all(&page).await;

    assert!(matches!(
        summary.failed[0].1,
        SharedError::ComponentLoadError { status: None, .. }
    ));
    assert!(page.read().await.elements[0].inner_html.contains("Failed"));
}

#[tokio::test]
async fn test_failed_fragment_is_retried_on_next_pass() {
    let network = Arc::new(CountingNetwork::new());
    let loader = ComponentLoader::new(network.clone(), event::channel());
    let first = RwLock::new(Page::new("/index.html").with_element(Element::placeholder("banner")));
    loader.load_all(&first).await;

    network.route("/src/components/banner.html", Response::new(200, "<div>banner</div>"));
    let second = RwLock::new(Page::new("/index.html").with_element(Element::placeholder("banner")));
    let summary = loader.load_all(&second).await;

    assert!(summary.is_clean());
    assert_eq!(network.calls_to("/src/components/banner.html"), 2);
}

#[tokio::test]
async fn test_loaded_fragment_is_reused_across_pages() {
    let network = Arc::new(CountingNetwork::new());
    network.route("/src/components/header.html", Response::new(200, r#"<a href="index.html">Home</a>"#));
    let loader = ComponentLoader::new(network.clone(), event::channel());

    let root = RwLock::new(Page::new("/index.html").with_element(Element::placeholder("header")));
    let nested = RwLock::new(Page::new("/pages/forum/thread.html").with_element(Element::placeholder("header")));
    loader.load_all(&root).await;
    loader.load_all(&nested).await;

    assert_eq!(network.calls_to("/src/components/header.html"), 1);
    assert_eq!(root.read().await.elements[0].inner_html, r#"<a href="index.html">Home</a>"#);
    assert_eq!(
        nested.read().await.elements[0].inner_html,
        r#"<a href="../../index.html">Home</a>"#
    );
}
