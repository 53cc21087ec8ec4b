//! Property-based tests for persisted property maps.

mod common;

use common::{encrypted_manager, scope};
use propvault_store::SqliteBackend;
use proptest::prelude::*;

fn entries_strategy() -> impl Strategy<Value = Vec<(String, Option<String>)>> {
    prop::collection::vec(
        ("[a-z][a-z0-9_.]{0,15}", prop::option::of(any::<String>())),
        0..12,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Save followed by load returns the same entries in the same order.
    #[test]
    fn save_load_preserves_entries_and_order(entries in entries_strategy()) {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let manager = encrypted_manager(&backend, Some("proptest"));
        let scope = scope("tenant", "prop");

        let mut map = manager.get_writable_properties(&scope, true).unwrap().unwrap();
        for (name, value) in &entries {
            map.insert(name.clone(), value.clone());
        }
        manager.save(&mut map).unwrap();

        let loaded = manager.get_properties(&scope).unwrap();
        let expected: Vec<_> = map.iter().collect();
        let actual: Vec<_> = loaded.iter().collect();
        prop_assert_eq!(actual, expected);
    }
}
