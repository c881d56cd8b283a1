//! Runtime glue that wires configuration and telemetry.

pub mod config;
pub mod telemetry;
