//! Shared test fixtures for the crs-engine crates.

pub mod fixtures;
