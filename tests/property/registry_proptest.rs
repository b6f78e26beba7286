//! Property-based tests for the module registry

use fuelq::client::modules::{Module, ModuleRegistry, StaticModuleSource};
use proptest::prelude::*;
use std::sync::Arc;

const NAMES: [&str; 5] = ["navigation", "theme", "analytics", "components", "forum"];

struct Marker;

impl Module for Marker {}

proptest! {
    #[test]
    fn test_register_keeps_first_position_and_last_instance(
        order in prop::collection::vec(0..NAMES.len(), 1..30),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let registry = ModuleRegistry::new(Arc::new(StaticModuleSource::new()));
            let mut instances: Vec<(usize, Arc<dyn Module>)> = Vec::new();
            for index in &order {
                let module: Arc<dyn Module> = Arc::new(Marker);
                registry.register(NAMES[*index], module.clone()).await;
                instances.push((*index, module));
            }

            let mut expected: Vec<&str> = Vec::new();
            for index in &order {
                if !expected.contains(&NAMES[*index]) {
                    expected.push(NAMES[*index]);
                }
            }
            prop_assert_eq!(registry.names().await, expected.clone());
            prop_assert_eq!(registry.len().await, expected.len());

            for name in expected {
                let last = instances
                    .iter()
                    .rev()
                    .find(|(index, _)| NAMES[*index] == name)
                    .map(|(_, module)| module.clone())
                    .unwrap();
                let registered = registry.get_module(name).await.unwrap();
                prop_assert!(Arc::ptr_eq(&registered, &last));
            }
            Ok(())
        })?;
    }
}
