//! Property-based tests

pub mod paths_proptest;
pub mod registry_proptest;
pub mod state_proptest;
