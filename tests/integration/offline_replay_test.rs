//! Offline submission and background sync replay against a live HTTP server

use crate::common::{memory_cache, sqlite_queue, test_config};
use fuelq::client::{SubmissionClient, SubmitOutcome};
use fuelq::shared::{event, SharedError, SiteEvent};
use fuelq::worker::{HttpNetwork, Network, ServiceWorker, SubmissionKind};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Nothing listens on the discard port
const UNREACHABLE: &str = "http://127.0.0.1:9";

fn contact_payload() -> serde_json::Value {
    json!({"name": "Ada", "email": "ada@example.com", "message": "Fleet card enquiry"})
}

#[tokio::test]
async fn test_offline_submission_replays_when_server_recovers() {
    let dir = TempDir::new().unwrap();
    let events = event::channel();
    let mut rx = events.subscribe();

    // Page side: the network is down, so the form is queued
    let offline: Arc<dyn Network> = Arc::new(HttpNetwork::new(UNREACHABLE).unwrap());
    let client = SubmissionClient::new(offline, sqlite_queue(&dir, events.clone()).await);
    let outcome = client
        .submit(SubmissionKind::ContactForm, contact_payload(), Some("tok-1".to_string()))
        .await
        .unwrap();

    let id = match outcome {
        SubmitOutcome::Queued { id } => id,
        other => panic!("expected the submission to be queued, got {:?}", other),
    };
    assert_eq!(
        rx.try_recv().unwrap(),
        SiteEvent::SubmissionQueued {
            kind: "contact-forms".to_string(),
            id,
        }
    );
    assert!(client.queue().sync_registry().is_registered("contact-form-sync").await);

    // Worker side: a fresh process reopens the same store
    let queue = sqlite_queue(&dir, events.clone()).await;
    queue.sync_registry().register("contact-form-sync").await;
    let record = queue.pending(SubmissionKind::ContactForm).await.unwrap().remove(0);
    assert_eq!(record.id, id);
    assert_eq!(record.payload, contact_payload());

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/contact"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(server.uri()).unwrap());
    let config = test_config(&dir);
    let worker = ServiceWorker::new(config.clone(), memory_cache(&config), network, queue.clone());

    let report = worker.on_sync("contact-form-sync").await.unwrap().unwrap();
    assert_eq!(report.retained, vec![id]);
    assert!(report.replayed.is_empty());
    assert_eq!(queue.pending(SubmissionKind::ContactForm).await.unwrap(), vec![record.clone()]);
    assert!(queue.sync_registry().is_registered("contact-form-sync").await);

    server.verify().await;
    server.reset().await;
    Mock::given(method("POST"))
        .and(path("/api/contact"))
        .and(header_exists("Idempotency-Key"))
        .and(header("Idempotency-Key", record.idempotency_key.to_string().as_str()))
        .and(header("Authorization", "Bearer tok-1"))
        .and(body_json(contact_payload()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let report = worker.on_sync("contact-form-sync").await.unwrap().unwrap();
    assert_eq!(report.replayed, vec![id]);
    assert!(report.is_drained());
    assert!(queue.pending(SubmissionKind::ContactForm).await.unwrap().is_empty());
    assert!(!queue.sync_registry().is_registered("contact-form-sync").await);
}

#[tokio::test]
async fn test_online_submission_is_delivered_with_idempotency_key() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/forum/posts"))
        .and(header_exists("Idempotency-Key"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(server.uri()).unwrap());
    let client = SubmissionClient::new(network, sqlite_queue(&dir, event::channel()).await);
    let outcome = client
        .submit(SubmissionKind::ForumPost, json!({"title": "Diesel prices"}), None)
        .await
        .unwrap();

    match outcome {
        SubmitOutcome::Delivered(response) => {
            assert_eq!(response.status, 201);
            assert_eq!(response.json_body().unwrap()["id"], 7);
        }
        other => panic!("expected delivery, got {:?}", other),
    }
    assert_eq!(client.queue().stats().await.unwrap().total(), 0);
}

#[tokio::test]
async fn test_server_rejection_is_not_queued() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/messages"))
        .respond_with(ResponseTemplate::new(422))
        .mount(&server)
        .await;

    let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(server.uri()).unwrap());
    let client = SubmissionClient::new(network, sqlite_queue(&dir, event::channel()).await);
    let outcome = client
        .submit(SubmissionKind::ChatMessage, json!({"text": "hi"}), None)
        .await
        .unwrap();

    assert!(!outcome.is_queued());
    assert_eq!(client.queue().stats().await.unwrap().chat_messages, 0);
}

#[tokio::test]
async fn test_sync_all_replays_every_kind_with_records() {
    let dir = TempDir::new().unwrap();
    let queue = sqlite_queue(&dir, event::channel()).await;
    queue.enqueue(SubmissionKind::ForumPost, json!({"title": "a"}), None).await.unwrap();
    queue.enqueue(SubmissionKind::ChatMessage, json!({"text": "b"}), None).await.unwrap();
    queue.enqueue(SubmissionKind::ChatMessage, json!({"text": "c"}), None).await.unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(server.uri()).unwrap());
    let config = test_config(&dir);
    let worker = ServiceWorker::new(config.clone(), memory_cache(&config), network, queue.clone());

    let reports = worker.sync_all().await.unwrap();

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.is_drained()));
    assert_eq!(queue.stats().await.unwrap().total(), 0);
    assert!(queue.sync_registry().pending().await.is_empty());
}

#[tokio::test]
async fn test_malformed_token_is_rejected_not_queued() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/contact"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(server.uri()).unwrap());
    let client = SubmissionClient::new(network, sqlite_queue(&dir, event::channel()).await);
    let result = client
        .submit(SubmissionKind::ContactForm, contact_payload(), Some("bad\ntoken".to_string()))
        .await;

    assert!(matches!(result, Err(SharedError::ValidationError { .. })));
    assert_eq!(client.queue().stats().await.unwrap().total(), 0);
    assert!(!client.queue().sync_registry().is_registered("contact-form-sync").await);
}
