//! Test suite for FuelQ
//!
//! This module organizes all tests

pub mod common;
pub mod integration;
pub mod property;
