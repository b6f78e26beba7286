//! # State Store
//!
//! In-memory key/value store shared by the page modules, with per-key
//! change notification, a bounded change history and best-effort durable
//! snapshots.
//!
//! ## Features
//!
//! - **Subscriptions**: callbacks receive `(new_value, previous_value)` and run
//!   after the store lock is released, so they may read or write the store
//! - **History**: every write records the value it replaced; the oldest entry
//!   is evicted once the capacity (50 by default) is reached
//! - **Persistence**: the map is snapshotted periodically and on teardown;
//!   the in-memory map is always authoritative
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fuelq::client::state::StateStore;
//! use serde_json::json;
//!
//! let store = StateStore::new(50);
//! let subscription = store.subscribe("theme", |new, _previous| {
//!     println!("theme is now {}", new);
//! });
//!
//! store.set("theme", json!("dark"), true);
//! assert_eq!(store.get("theme"), Some(json!("dark")));
//! subscription.unsubscribe();
//! ```

pub mod persistence;

pub use persistence::{spawn_autosave, MemorySnapshotStorage, SnapshotStorage, SqliteSnapshotStorage};

use crate::shared::event::{broadcast_event, SiteEvent, SiteEventBroadcast};
use crate::shared::{AppConfig, SharedError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Default number of history entries kept
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Change callback: `(new_value, previous_value)`
pub type Callback = Arc<dyn Fn(&Value, Option<&Value>) + Send + Sync>;

/// One recorded change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub key: String,
    /// Value before the change; `null` when the key did not exist
    pub previous_value: Value,
    /// The key was present before the change, possibly holding `null`
    #[serde(default)]
    pub existed: bool,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Whether undoing this entry restores a value rather than removing the key
    pub fn restores_value(&self) -> bool {
        self.existed || !self.previous_value.is_null()
    }
}

/// Persisted form of the store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: BTreeMap<String, Value>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

#[derive(Default)]
struct StoreInner {
    values: BTreeMap<String, Value>,
    subscribers: HashMap<String, Vec<(u64, Callback)>>,
    history: VecDeque<HistoryEntry>,
    next_subscriber: u64,
}

impl StoreInner {
    fn record(&mut self, key: &str, previous: Option<&Value>, capacity: usize) {
        if capacity == 0 {
            return;
        }
        while self.history.len() >= capacity {
            self.history.pop_front();
        }
        self.history.push_back(HistoryEntry {
            key: key.to_string(),
            previous_value: previous.cloned().unwrap_or(Value::Null),
            existed: previous.is_some(),
            timestamp: Utc::now(),
        });
    }

    fn callbacks(&self, key: &str) -> Vec<Callback> {
        self.subscribers
            .get(key)
            .map(|subs| subs.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default()
    }
}

struct Notification {
    callbacks: Vec<Callback>,
    value: Value,
    previous: Option<Value>,
}

impl Notification {
    fn deliver(self) {
        for callback in &self.callbacks {
            callback(&self.value, self.previous.as_ref());
        }
    }
}

fn lock(inner: &Mutex<StoreInner>) -> MutexGuard<'_, StoreInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle returned by `StateStore::subscribe`
pub struct Subscription {
    inner: Weak<Mutex<StoreInner>>,
    key: String,
    id: u64,
}

impl Subscription {
    /// Remove the callback; the key's subscriber set goes away with its last member
    pub fn unsubscribe(self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut inner = lock(&inner);
        if let Some(subs) = inner.subscribers.get_mut(&self.key) {
            subs.retain(|(id, _)| *id != self.id);
            if subs.is_empty() {
                inner.subscribers.remove(&self.key);
            }
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Key/value state store
pub struct StateStore {
    inner: Arc<Mutex<StoreInner>>,
    capacity: usize,
    storage: Option<(Arc<dyn SnapshotStorage>, String)>,
    events: Option<SiteEventBroadcast>,
}

impl StateStore {
    /// Store without durable snapshots
    pub fn new(history_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner::default())),
            capacity: history_capacity,
            storage: None,
            events: None,
        }
    }

    /// Store snapshotting to `storage` under the configured key
    pub fn from_config(config: &AppConfig, storage: Arc<dyn SnapshotStorage>) -> Self {
        Self::new(config.history_capacity).with_storage(storage, config.state_key())
    }

    pub fn with_storage(mut self, storage: Arc<dyn SnapshotStorage>, key: impl Into<String>) -> Self {
        self.storage = Some((storage, key.into()));
        self
    }

    /// Announce saved snapshots on `events`
    pub fn with_events(mut self, events: SiteEventBroadcast) -> Self {
        self.events = Some(events);
        self
    }

    pub fn history_capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        lock(&self.inner).values.get(key).cloned()
    }

    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.inner).values.contains_key(key)
    }

    /// Write one key, recording the replaced value in history
    pub fn set(&self, key: &str, value: Value, notify: bool) {
        let notification = {
            let mut inner = lock(&self.inner);
            let previous = inner.values.insert(key.to_string(), value.clone());
            inner.record(key, previous.as_ref(), self.capacity);
            if !notify {
                return;
            }
            Notification {
                callbacks: inner.callbacks(key),
                value,
                previous,
            }
        };

        notification.deliver();
    }

    /// Write several keys; subscribers are notified after all writes land
    pub fn set_multiple<I, K>(&self, updates: I, notify: bool)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let notifications: Vec<Notification> = {
            let mut inner = lock(&self.inner);
            let mut notifications = Vec::new();
            for (key, value) in updates {
                let key = key.into();
                let previous = inner.values.insert(key.clone(), value.clone());
                inner.record(&key, previous.as_ref(), self.capacity);
                if notify {
                    notifications.push(Notification {
                        callbacks: inner.callbacks(&key),
                        value,
                        previous,
                    });
                }
            }
            notifications
        };

        for notification in notifications {
            notification.deliver();
        }
    }

    /// Delete a key; subscribers see `null` as the new value
    pub fn remove(&self, key: &str, notify: bool) -> Option<Value> {
        let (previous, callbacks) = {
            let mut inner = lock(&self.inner);
            let previous = inner.values.remove(key);
            if previous.is_some() {
                inner.record(key, previous.as_ref(), self.capacity);
            }
            let callbacks = if notify && previous.is_some() {
                inner.callbacks(key)
            } else {
                Vec::new()
            };
            (previous, callbacks)
        };

        Notification {
            callbacks,
            value: Value::Null,
            previous: previous.clone(),
        }
        .deliver();
        previous
    }

    /// Register a change callback for one key
    pub fn subscribe<F>(&self, key: &str, callback: F) -> Subscription
    where
        F: Fn(&Value, Option<&Value>) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        let mut inner = lock(&self.inner);
        let id = inner.next_subscriber;
        inner.next_subscriber += 1;
        inner
            .subscribers
            .entry(key.to_string())
            .or_default()
            .push((id, callback));

        Subscription {
            inner: Arc::downgrade(&self.inner),
            key: key.to_string(),
            id,
        }
    }

    pub fn subscriber_count(&self, key: &str) -> usize {
        lock(&self.inner).subscribers.get(key).map(Vec::len).unwrap_or(0)
    }

    /// Keys with at least one subscriber
    pub fn subscribed_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.inner).subscribers.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// History, oldest first
    pub fn history(&self) -> Vec<HistoryEntry> {
        lock(&self.inner).history.iter().cloned().collect()
    }

    pub fn clear_history(&self) {
        lock(&self.inner).history.clear();
    }

    /// Revert the most recent change without recording a new entry
    ///
    /// A key that did not exist before the change is removed.
    pub fn undo(&self) -> Option<HistoryEntry> {
        let (entry, notification) = {
            let mut inner = lock(&self.inner);
            let entry = inner.history.pop_back()?;
            let current = if entry.restores_value() {
                inner.values.insert(entry.key.clone(), entry.previous_value.clone())
            } else {
                inner.values.remove(&entry.key)
            };
            let notification = Notification {
                callbacks: inner.callbacks(&entry.key),
                value: entry.previous_value.clone(),
                previous: current,
            };
            (entry, notification)
        };

        notification.deliver();
        Some(entry)
    }

    /// Copy of the state and history
    pub fn snapshot(&self) -> Snapshot {
        let inner = lock(&self.inner);
        Snapshot {
            state: inner.values.clone(),
            history: inner.history.iter().cloned().collect(),
        }
    }

    fn restore(&self, snapshot: Snapshot) {
        let mut inner = lock(&self.inner);
        inner.values = snapshot.state;
        let skip = snapshot.history.len().saturating_sub(self.capacity);
        inner.history = snapshot.history.into_iter().skip(skip).collect();
    }

    /// Load the persisted snapshot
    ///
    /// Returns false when nothing usable was stored. An unreadable store
    /// leaves the state empty; a corrupt snapshot is discarded.
    pub async fn load(&self) -> bool {
        let Some((storage, key)) = &self.storage else {
            return false;
        };

        let raw = match storage.read(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return false,
            Err(e) => {
                tracing::warn!("[State] Could not read snapshot, starting empty: {}", e);
                return false;
            }
        };

        match serde_json::from_str::<Snapshot>(&raw) {
            Ok(snapshot) => {
                tracing::debug!("[State] Restored {} keys", snapshot.state.len());
                self.restore(snapshot);
                true
            }
            Err(e) => {
                tracing::warn!("[State] Discarding corrupt snapshot: {}", e);
                if let Err(e) = storage.remove(key).await {
                    tracing::error!("[State] Could not remove corrupt snapshot: {}", e);
                }
                false
            }
        }
    }

    /// Write a snapshot, returning the number of keys saved
    pub async fn persist(&self) -> Result<usize, SharedError> {
        let Some((storage, key)) = &self.storage else {
            return Ok(0);
        };

        let snapshot = self.snapshot();
        let keys = snapshot.state.len();
        let raw = serde_json::to_string(&snapshot)?;
        storage.write(key, &raw).await?;

        tracing::debug!("[State] Saved snapshot with {} keys", keys);
        if let Some(events) = &self.events {
            broadcast_event(events, SiteEvent::StateSnapshotSaved { keys });
        }
        Ok(keys)
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
