//! Worker cache integration tests

use crate::common::{active_worker, memory_queue, sqlite_cache, test_config, CountingNetwork};
use fuelq::shared::{event, AppConfig, Request, RequestDestination, Response};
use fuelq::worker::{CacheBackend, FetchHandling, Network, Partition, ServiceWorker, OFFLINE_PAGE};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;

fn respond(handling: FetchHandling) -> Response {
    match handling {
        FetchHandling::Respond(response) => response,
        FetchHandling::Passthrough => panic!("request was not intercepted"),
    }
}

#[tokio::test]
async fn test_image_second_fetch_served_from_cache() {
    let network = Arc::new(CountingNetwork::new());
    network.route("/src/images/pump.png", Response::new(200, vec![0x89, 0x50, 0x4e, 0x47]));
    let worker = active_worker(network.clone(), &[]).await;
    let request = Request::get("/src/images/pump.png").with_destination(RequestDestination::Image);

    let first = respond(worker.handle_fetch(&request).await.unwrap());
    let second = respond(worker.handle_fetch(&request).await.unwrap());

    assert_eq!(first, second);
    assert_eq!(network.calls_to("/src/images/pump.png"), 1);
    assert_eq!(
        worker.cache().locate("/src/images/pump.png").await.unwrap(),
        Some(Partition::Images)
    );
}

#[tokio::test]
async fn test_failed_image_not_cached() {
    let network = Arc::new(CountingNetwork::new());
    let worker = active_worker(network.clone(), &[]).await;
    let request = Request::get("/src/images/missing.jpg");

    let response = respond(worker.handle_fetch(&request).await.unwrap());

    assert_eq!(response.status, 404);
    assert!(worker.cache().locate("/src/images/missing.jpg").await.unwrap().is_none());
}

#[tokio::test]
async fn test_api_offline_without_cache_is_503_json() {
    let network = Arc::new(CountingNetwork::new());
    let worker = active_worker(network.clone(), &[]).await;
    network.set_offline(true);

    let response = respond(worker.handle_fetch(&Request::get("/api/prices")).await.unwrap());

    assert_eq!(response.status, 503);
    assert_eq!(response.json_body().unwrap()["offline"], true);
}

#[tokio::test]
async fn test_api_offline_serves_last_good_response() {
    let network = Arc::new(CountingNetwork::new());
    network.route("/api/prices", Response::json(200, &serde_json::json!({"diesel": 1.62})));
    let worker = active_worker(network.clone(), &[]).await;

    respond(worker.handle_fetch(&Request::get("/api/prices")).await.unwrap());
    network.set_offline(true);
    let cached = respond(worker.handle_fetch(&Request::get("/api/prices")).await.unwrap());

    assert_eq!(cached.status, 200);
    assert_eq!(cached.json_body().unwrap()["diesel"], 1.62);
}

#[tokio::test]
async fn test_page_revalidates_in_background() {
    let network = Arc::new(CountingNetwork::new());
    network.route("/pages/about.html", Response::new(200, "<h1>About v1</h1>"));
    let worker = active_worker(network.clone(), &["/pages/about.html"]).await;
    network.route("/pages/about.html", Response::new(200, "<h1>About v2</h1>"));

    let served = respond(worker.handle_fetch(&Request::get("/pages/about.html")).await.unwrap());
    worker.settle().await;

    assert_eq!(served.text(), "<h1>About v1</h1>");
    let refreshed = worker.cache().match_any("/pages/about.html").await.unwrap().unwrap();
    // The precached copy is rewritten in place
    assert_eq!(refreshed, (Partition::Static, Response::new(200, "<h1>About v2</h1>")));
}

#[tokio::test]
async fn test_offline_navigation_falls_back_to_offline_page() {
    let network = Arc::new(CountingNetwork::new());
    network.route(OFFLINE_PAGE, Response::new(200, "<h1>Offline</h1>"));
    let worker = active_worker(network.clone(), &[OFFLINE_PAGE]).await;
    network.set_offline(true);

    let request = Request::get("/pages/forum.html").with_destination(RequestDestination::Document);
    let response = respond(worker.handle_fetch(&request).await.unwrap());

    assert_eq!(response.text(), "<h1>Offline</h1>");
}

#[tokio::test]
async fn test_activate_deletes_previous_version_caches() {
    let dir = TempDir::new().unwrap();
    let old_config = test_config(&dir);
    let old_cache = sqlite_cache(&dir, &old_config).await;
    old_cache.open_all().await.unwrap();
    old_cache
        .put_into(Partition::Static, "/index.html", &Response::new(200, "old"))
        .await
        .unwrap();

    let config = AppConfig {
        cache_version: "v2".to_string(),
        precache: vec!["/index.html".to_string()],
        ..old_config.clone()
    };
    let network = Arc::new(CountingNetwork::new());
    network.route("/index.html", Response::new(200, "new"));
    let cache = sqlite_cache(&dir, &config).await;
    let dyn_network: Arc<dyn Network> = network;
    let worker = ServiceWorker::new(config, cache, dyn_network, memory_queue(event::channel()));

    worker.install().await.unwrap();
    let mut deleted = worker.activate().await.unwrap();
    deleted.sort();

    assert_eq!(
        deleted,
        vec!["fuelq-dynamic-v1", "fuelq-images-v1", "fuelq-static-v1"]
    );
    assert_eq!(
        worker.cache().backend().cache_names().await.unwrap(),
        vec!["fuelq-dynamic-v2", "fuelq-images-v2", "fuelq-static-v2"]
    );
    assert_eq!(
        worker.cache().match_in(Partition::Static, "/index.html").await.unwrap(),
        Some(Response::new(200, "new"))
    );
}
