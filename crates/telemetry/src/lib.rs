// Path: crates/telemetry/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Registry Telemetry
//!
//! Structured logging initialization, a Prometheus metrics backend, and
//! abstract sinks that decouple metric instrumentation from the backend.

/// The initialization routines for global structured logging.
pub mod init;
/// The concrete implementation of metrics sinks using the `prometheus` crate.
pub mod prometheus;
/// Abstract traits (`*MetricsSink`) that define the contract for metrics reporting.
pub mod sinks;
/// A simple RAII timer for measuring the duration of a scope.
pub mod time;

// Re-export the public helper functions for easy access to the global sinks.
pub use sinks::{error_metrics, registry_metrics, storage_metrics};
