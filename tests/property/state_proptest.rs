//! Property-based tests for the state store

use fuelq::client::StateStore;
use proptest::prelude::*;
use serde_json::json;

const KEYS: [&str; 4] = ["theme.current", "user.name", "cart.items", "navigation.active_path"];

proptest! {
    #[test]
    fn test_history_keeps_most_recent_changes(
        writes in prop::collection::vec((0..KEYS.len(), any::<i32>()), 0..120),
        capacity in 1usize..60,
    ) {
        let store = StateStore::new(capacity);
        for (key, value) in &writes {
            store.set(KEYS[*key], json!(value), false);
        }

        let history = store.history();
        prop_assert_eq!(history.len(), writes.len().min(capacity));

        let expected: Vec<&str> = writes[writes.len() - history.len()..]
            .iter()
            .map(|(key, _)| KEYS[*key])
            .collect();
        let recorded: Vec<&str> = history.iter().map(|entry| entry.key.as_str()).collect();
        prop_assert_eq!(recorded, expected);
    }

    #[test]
    fn test_undo_everything_restores_empty_state(
        writes in prop::collection::vec((0..KEYS.len(), any::<i32>()), 0..50),
    ) {
        let store = StateStore::new(50);
        for (key, value) in &writes {
            store.set(KEYS[*key], json!(value), true);
        }

        for _ in 0..writes.len() {
            prop_assert!(store.undo().is_some());
        }

        prop_assert!(store.undo().is_none());
        prop_assert!(store.snapshot().state.is_empty());
    }

    #[test]
    fn test_get_returns_last_write(
        writes in prop::collection::vec((0..KEYS.len(), any::<i32>()), 1..40),
    ) {
        let store = StateStore::default();
        for (key, value) in &writes {
            store.set(KEYS[*key], json!(value), false);
        }

        for (index, key) in KEYS.iter().enumerate() {
            let last = writes.iter().rev().find(|(k, _)| *k == index).map(|(_, v)| json!(v));
            prop_assert_eq!(store.get(key), last);
        }
    }
}
