//! Page bootstrap integration tests

use crate::common::{page_context, CountingNetwork};
use fuelq::client::{App, BootstrapOutcome, Element, Page, FAILURE_BANNER};
use fuelq::shared::Response;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const HEADER: &str = r#"<nav><a href="index.html">Home</a><a href="pages/forum.html">Forum</a></nav>"#;

#[tokio::test]
async fn test_index_loads_and_initializes_page_modules() {
    let network = Arc::new(CountingNetwork::new());
    network.route("/src/components/header.html", Response::new(200, HEADER));
    let page = Page::new("/index.html").with_element(Element::placeholder("components/header.html").with_id("header"));
    let app = App::site(page_context(page, network));

    let config = json!({
        "animation": {"duration": 400},
        "homePage": {"slides": 3},
    });
    let outcome = app.run(&config).await;

    let report = match outcome {
        BootstrapOutcome::Ready(report) => report,
        BootstrapOutcome::Failed(e) => panic!("bootstrap failed: {}", e),
    };
    assert!(report.loaded.contains(&"animation".to_string()));
    assert!(report.loaded.contains(&"homePage".to_string()));
    assert!(app.registry().is_initialized("animation").await);
    assert!(app.registry().is_initialized("homePage").await);

    let state = &app.context().state;
    assert_eq!(state.get("modules.animation"), Some(json!({"duration": 400})));
    assert_eq!(state.get("modules.homePage"), Some(json!({"slides": 3})));
    assert_eq!(state.get("navigation.active_path"), Some(json!("/index.html")));

    app.teardown().await.unwrap();
}

#[tokio::test]
async fn test_core_modules_initialize_before_page_modules() {
    let network = Arc::new(CountingNetwork::new());
    let app = App::site(page_context(Page::new("/pages/services.html"), network));

    let report = app.bootstrap(&json!({})).await.unwrap();

    assert_eq!(
        report.init.initialized,
        vec!["navigation", "theme", "analytics", "components", "animation", "services"]
    );
}

#[tokio::test]
async fn test_header_links_marked_active() {
    let network = Arc::new(CountingNetwork::new());
    network.route("/src/components/header.html", Response::new(200, HEADER));
    let page = Page::new("/pages/forum.html").with_element(Element::placeholder("../components/header.html").with_id("header"));
    let ctx = page_context(page, network);
    let app = App::site(ctx.clone());

    assert!(app.run(&json!({})).await.is_ready());

    // The highlighter reacts to the load event on its own task
    let mut html = String::new();
    for _ in 0..50 {
        html = ctx.page.read().await.element_by_id("header").unwrap().inner_html.clone();
        if html.contains("active") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(
        html,
        r#"<nav><a href="../index.html">Home</a><a href="../pages/forum.html" class="active">Forum</a></nav>"#
    );
    app.teardown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_route_loads_only_core() {
    let network = Arc::new(CountingNetwork::new());
    let app = App::site(page_context(Page::new("/pages/careers.html"), network));

    let report = app.bootstrap(&json!({})).await.unwrap();

    assert_eq!(report.loaded, vec!["navigation", "theme", "analytics", "components"]);
    assert!(app.context().page.read().await.banner.is_none());
}

#[tokio::test]
async fn test_analytics_counts_views_across_runs() {
    let network = Arc::new(CountingNetwork::new());
    let app = App::site(page_context(Page::new("/pages/about.html"), network));
    let config = json!({"analytics": {"enabled": true, "tracking_id": "FQ-1"}});

    app.bootstrap(&config).await.unwrap();
    assert_eq!(app.context().state.get("analytics.page_views"), Some(json!(1)));

    // Re-running skips modules that already initialized
    app.bootstrap(&config).await.unwrap();
    assert_eq!(app.context().state.get("analytics.page_views"), Some(json!(1)));
}

#[tokio::test]
async fn test_failed_bootstrap_shows_banner_only() {
    let network = Arc::new(CountingNetwork::new());
    let ctx = page_context(Page::new("/index.html"), network);
    let source = Arc::new(fuelq::client::modules::StaticModuleSource::new());
    let app = App::new(ctx.clone(), source, fuelq::client::PageManifest::site());

    let outcome = app.run(&json!({})).await;

    assert!(matches!(outcome, BootstrapOutcome::Failed(fuelq::shared::SharedError::BootstrapError { .. })));
    assert_eq!(ctx.page.read().await.banner.as_deref(), Some(FAILURE_BANNER));
}
