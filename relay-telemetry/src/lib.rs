//! Telemetry setup shared by relay binaries and tests.

pub mod tracing;
