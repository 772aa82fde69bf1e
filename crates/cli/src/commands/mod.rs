//! CLI command implementations.

pub mod browse;
