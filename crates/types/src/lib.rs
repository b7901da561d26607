// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]
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

//! # Participant Registry Types
//!
//! The foundational crate of the registry workspace. It holds the canonical
//! definitions of participant records, their mutable state, the diff format
//! exchanged between registry versions, the normalized special-transaction
//! payloads a block feeds into the registry, configuration, and the error
//! taxonomy.
//!
//! Every other crate in the workspace depends on this one, so it stays free
//! of storage, runtime and logging dependencies.

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::RegistryError> = std::result::Result<T, E>;

/// Participant records, state deltas, diffs and block transition payloads.
pub mod app;
/// The canonical, deterministic binary codec for consensus-critical data.
pub mod codec;
/// Registry configuration (snapshot cadence, PoSe parameters).
pub mod config;
/// The error taxonomy shared by every registry component.
pub mod error;
