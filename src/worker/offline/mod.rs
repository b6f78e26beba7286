//! # Offline Submission Queue
//!
//! Keeps a form, forum post or chat message submitted while offline from
//! being lost. The page persists the payload (plus the auth token needed to
//! replay it) and registers a background-sync tag; when the sync fires,
//! the worker replays every pending record for that kind and deletes only
//! the ones the server accepted.
//!
//! ## Delivery
//!
//! At-least-once. Each record carries a client-generated idempotency key,
//! sent as `Idempotency-Key` on every replay, so a server that honours the
//! header can drop the duplicate caused by a lost success response.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fuelq::worker::offline::{OfflineQueue, SubmissionKind};
//! # async fn example(queue: OfflineQueue, network: &dyn fuelq::worker::network::Network) -> Result<(), fuelq::shared::SharedError> {
//! let id = queue
//!     .enqueue(SubmissionKind::ContactForm, serde_json::json!({"name": "A"}), None)
//!     .await?;
//!
//! // Later, when connectivity returns
//! let report = queue.replay(SubmissionKind::ContactForm, network).await?;
//! assert!(report.replayed.contains(&id));
//! # Ok(())
//! # }
//! ```

pub mod store;

pub use store::{MemoryOfflineStore, OfflineStore, SqliteOfflineStore, OFFLINE_DB_NAME};

use crate::shared::event::{broadcast_event, SiteEvent, SiteEventBroadcast};
use crate::shared::{Request, SharedError};
use crate::worker::network::Network;
use crate::worker::sync::SyncRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// What was submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmissionKind {
    ContactForm,
    ForumPost,
    ChatMessage,
}

impl SubmissionKind {
    pub const ALL: [SubmissionKind; 3] = [
        SubmissionKind::ContactForm,
        SubmissionKind::ForumPost,
        SubmissionKind::ChatMessage,
    ];

    /// Object store name
    pub fn store_name(&self) -> &'static str {
        match self {
            SubmissionKind::ContactForm => "contact-forms",
            SubmissionKind::ForumPost => "forum-posts",
            SubmissionKind::ChatMessage => "chat-messages",
        }
    }

    /// SQLite table backing the object store
    pub fn table_name(&self) -> &'static str {
        match self {
            SubmissionKind::ContactForm => "contact_forms",
            SubmissionKind::ForumPost => "forum_posts",
            SubmissionKind::ChatMessage => "chat_messages",
        }
    }

    /// Background sync tag
    pub fn sync_tag(&self) -> &'static str {
        match self {
            SubmissionKind::ContactForm => "contact-form-sync",
            SubmissionKind::ForumPost => "forum-post-sync",
            SubmissionKind::ChatMessage => "chat-message-sync",
        }
    }

    /// Endpoint the submission is POSTed to
    pub fn endpoint(&self) -> &'static str {
        match self {
            SubmissionKind::ContactForm => "/api/contact",
            SubmissionKind::ForumPost => "/api/forum/posts",
            SubmissionKind::ChatMessage => "/api/chat/messages",
        }
    }

    /// Kind for a sync tag
    pub fn from_sync_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.sync_tag() == tag)
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.store_name())
    }
}

/// A submission about to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionDraft {
    pub payload: serde_json::Value,
    pub token: Option<String>,
    pub idempotency_key: Uuid,
    pub created_at: String,
}

impl SubmissionDraft {
    pub fn new(payload: serde_json::Value, token: Option<String>) -> Self {
        Self {
            payload,
            token,
            idempotency_key: Uuid::new_v4(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// The HTTP request delivering this submission
    pub fn to_request(&self, kind: SubmissionKind) -> Request {
        submission_request(kind, &self.payload, self.token.as_deref(), &self.idempotency_key)
    }

    pub(crate) fn into_pending(self, id: i64, kind: SubmissionKind) -> PendingSubmission {
        PendingSubmission {
            id,
            kind,
            payload: self.payload,
            token: self.token,
            idempotency_key: self.idempotency_key,
            created_at: self.created_at,
        }
    }
}

/// A stored submission waiting for replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSubmission {
    pub id: i64,
    pub kind: SubmissionKind,
    /// Original request body
    pub payload: serde_json::Value,
    /// Bearer token needed to replay the request
    pub token: Option<String>,
    pub idempotency_key: Uuid,
    pub created_at: String,
}

impl PendingSubmission {
    /// The HTTP request this record replays as
    pub fn to_request(&self) -> Request {
        submission_request(self.kind, &self.payload, self.token.as_deref(), &self.idempotency_key)
    }
}

fn submission_request(
    kind: SubmissionKind,
    payload: &serde_json::Value,
    token: Option<&str>,
    idempotency_key: &Uuid,
) -> Request {
    let mut request =
        Request::post_json(kind.endpoint(), payload).with_header("Idempotency-Key", idempotency_key.to_string());
    if let Some(token) = token {
        request = request.with_header("Authorization", format!("Bearer {}", token));
    }
    request
}

/// Result of one replay pass over a kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    pub kind: SubmissionKind,
    /// Ids replayed and deleted
    pub replayed: Vec<i64>,
    /// Ids left queued for the next sync
    pub retained: Vec<i64>,
    pub errors: Vec<SharedError>,
}

impl ReplayReport {
    fn new(kind: SubmissionKind) -> Self {
        Self {
            kind,
            replayed: Vec::new(),
            retained: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// True when nothing is left queued
    pub fn is_drained(&self) -> bool {
        self.retained.is_empty()
    }
}

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub contact_forms: usize,
    pub forum_posts: usize,
    pub chat_messages: usize,
}

impl QueueStats {
    pub fn total(&self) -> usize {
        self.contact_forms + self.forum_posts + self.chat_messages
    }
}

/// Offline submission queue shared by the page and the worker
#[derive(Clone)]
pub struct OfflineQueue {
    store: Arc<dyn OfflineStore>,
    sync: Arc<SyncRegistry>,
    events: SiteEventBroadcast,
}

impl OfflineQueue {
    pub fn new(store: Arc<dyn OfflineStore>, sync: Arc<SyncRegistry>, events: SiteEventBroadcast) -> Self {
        Self { store, sync, events }
    }

    pub fn store(&self) -> &Arc<dyn OfflineStore> {
        &self.store
    }

    pub fn sync_registry(&self) -> &Arc<SyncRegistry> {
        &self.sync
    }

    /// Persist a submission and request a background sync for its kind
    pub async fn enqueue(
        &self,
        kind: SubmissionKind,
        payload: serde_json::Value,
        token: Option<String>,
    ) -> Result<i64, SharedError> {
        self.enqueue_draft(kind, SubmissionDraft::new(payload, token)).await
    }

    /// Persist a prepared draft, keeping its idempotency key
    pub async fn enqueue_draft(&self, kind: SubmissionKind, draft: SubmissionDraft) -> Result<i64, SharedError> {
        let id = self.store.add(kind, &draft).await?;
        self.sync.register(kind.sync_tag()).await;

        tracing::info!("[Offline] Queued {} #{} for background sync", kind, id);
        broadcast_event(
            &self.events,
            SiteEvent::SubmissionQueued {
                kind: kind.store_name().to_string(),
                id,
            },
        );
        Ok(id)
    }

    /// Pending records of a kind
    pub async fn pending(&self, kind: SubmissionKind) -> Result<Vec<PendingSubmission>, SharedError> {
        self.store.get_all(kind).await
    }

    /// Replay every pending record of a kind
    ///
    /// Only records whose replay returned 2xx are deleted. Everything else
    /// stays untouched for the next sync.
    pub async fn replay(&self, kind: SubmissionKind, network: &dyn Network) -> Result<ReplayReport, SharedError> {
        let pending = self.store.get_all(kind).await?;
        let mut report = ReplayReport::new(kind);

        if pending.is_empty() {
            return Ok(report);
        }
        tracing::info!("[Offline] Replaying {} pending {}", pending.len(), kind);

        for record in pending {
            match network.fetch(&record.to_request()).await {
                Ok(response) if response.ok() => match self.store.delete(kind, record.id).await {
                    Ok(_) => {
                        report.replayed.push(record.id);
                        broadcast_event(
                            &self.events,
                            SiteEvent::SubmissionReplayed {
                                kind: kind.store_name().to_string(),
                                id: record.id,
                            },
                        );
                    }
                    Err(e) => {
                        tracing::error!("[Offline] Replayed {} #{} but could not delete it: {}", kind, record.id, e);
                        report.retained.push(record.id);
                        report.errors.push(e);
                    }
                },
                Ok(response) => {
                    let error = SharedError::replay(
                        kind.store_name(),
                        record.id,
                        format!("HTTP {}", response.status),
                    );
                    tracing::warn!("[Offline] {}", error);
                    report.retained.push(record.id);
                    report.errors.push(error);
                }
                Err(e) => {
                    let error = SharedError::replay(kind.store_name(), record.id, e.to_string());
                    tracing::warn!("[Offline] {}", error);
                    report.retained.push(record.id);
                    report.errors.push(error);
                }
            }
        }

        Ok(report)
    }

    /// Pending counts per kind
    pub async fn stats(&self) -> Result<QueueStats, SharedError> {
        Ok(QueueStats {
            contact_forms: self.store.count(SubmissionKind::ContactForm).await?,
            forum_posts: self.store.count(SubmissionKind::ForumPost).await?,
            chat_messages: self.store.count(SubmissionKind::ChatMessage).await?,
        })
    }
}
