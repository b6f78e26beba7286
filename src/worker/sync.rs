//! Background sync registrations.
//!
//! The page registers a tag when it queues a submission; the worker
//! consumes tags when a sync opportunity arrives. A tag stays registered
//! until a sync pass leaves nothing queued for it.

use std::collections::BTreeSet;
use tokio::sync::RwLock;

/// Pending background-sync tags
#[derive(Debug, Default)]
pub struct SyncRegistry {
    tags: RwLock<BTreeSet<String>>,
}

impl SyncRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a sync for `tag`; registering twice is a no-op
    pub async fn register(&self, tag: &str) {
        if self.tags.write().await.insert(tag.to_string()) {
            tracing::debug!("[Sync] Registered {}", tag);
        }
    }

    pub async fn is_registered(&self, tag: &str) -> bool {
        self.tags.read().await.contains(tag)
    }

    /// Registered tags, sorted
    pub async fn pending(&self) -> Vec<String> {
        self.tags.read().await.iter().cloned().collect()
    }

    /// Drop a tag after its work is done
    pub async fn complete(&self, tag: &str) -> bool {
        self.tags.write().await.remove(tag)
    }
}
