//! Page-side form submission with offline fallback.
//!
//! A submission is POSTed straight away. When the network is unreachable
//! the payload goes to the offline queue instead and is replayed by the
//! worker on the next background sync.

use crate::shared::{Response, SharedError};
use crate::worker::network::Network;
use crate::worker::offline::{OfflineQueue, SubmissionDraft, SubmissionKind};
use std::sync::Arc;

/// What happened to a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The server answered; the status may still be an error
    Delivered(Response),
    /// The network was unreachable; the payload is queued under `id`
    Queued { id: i64 },
}

impl SubmitOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, SubmitOutcome::Queued { .. })
    }
}

/// Submits forms, posts and messages
#[derive(Clone)]
pub struct SubmissionClient {
    network: Arc<dyn Network>,
    queue: OfflineQueue,
}

impl SubmissionClient {
    pub fn new(network: Arc<dyn Network>, queue: OfflineQueue) -> Self {
        Self { network, queue }
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    /// Submit now, or queue for background sync when offline
    ///
    /// Server error responses are handed back as `Delivered`; only an
    /// unreachable network queues the payload.
    pub async fn submit(
        &self,
        kind: SubmissionKind,
        payload: serde_json::Value,
        token: Option<String>,
    ) -> Result<SubmitOutcome, SharedError> {
        let draft = SubmissionDraft::new(payload, token);
        let request = draft.to_request(kind);

        match self.network.fetch(&request).await {
            Ok(response) => {
                if !response.ok() {
                    tracing::warn!("[Submit] {} rejected with HTTP {}", kind, response.status);
                }
                Ok(SubmitOutcome::Delivered(response))
            }
            Err(e) if e.is_offline() => {
                tracing::info!("[Submit] Offline, queueing {}", kind);
                let id = self.queue.enqueue_draft(kind, draft).await?;
                Ok(SubmitOutcome::Queued { id })
            }
            Err(e) => Err(e),
        }
    }
}
