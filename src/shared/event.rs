/**
 * Site Event System
 *
 * Events broadcast between decoupled parts of the runtime. On the page this
 * replaces the `componentLoaded` DOM event; from the worker it replaces the
 * `postMessage` notifications sent after offline replays.
 *
 * Events are delivered through `tokio::sync::broadcast`, so every subscriber
 * receives its own copy and a send with no subscribers is not an error.
 */
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Capacity of the site event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Broadcast sender for site events
pub type SiteEventBroadcast = broadcast::Sender<SiteEvent>;

/// Event broadcast to all subscribers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SiteEvent {
    /// A component fragment was injected into a placeholder
    ComponentLoaded {
        /// Id of the placeholder element, if it had one
        element_id: Option<String>,
        /// Resolved fragment path
        component_path: String,
    },
    /// A submission was persisted to the offline store
    SubmissionQueued {
        /// Store name of the submission kind
        kind: String,
        /// Record id
        id: i64,
    },
    /// A queued submission was replayed successfully
    SubmissionReplayed {
        /// Store name of the submission kind
        kind: String,
        /// Record id (now deleted)
        id: i64,
    },
    /// The state store wrote a snapshot
    StateSnapshotSaved {
        /// Number of keys in the snapshot
        keys: usize,
    },
}

/// Create a new site event channel
pub fn channel() -> SiteEventBroadcast {
    let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    tx
}

/// Broadcast an event, returning how many subscribers received it
pub fn broadcast_event(tx: &SiteEventBroadcast, event: SiteEvent) -> usize {
    match tx.send(event) {
        Ok(count) => count,
        Err(e) => {
            tracing::trace!("[Events] No subscribers for event: {:?}", e.0);
            0
        }
    }
}
