// Path: crates/state/src/lib.rs
#![forbid(unsafe_code)]
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

//! # Participant Registry State
//!
//! Immutable, structurally shared registry versions and the algebra over
//! them: diff, apply and undo, the PoSe state machine, and the deterministic
//! orderings (quorum scores, payment rotation) consumers derive from a
//! version.

/// Diff computation, application and undo.
pub mod diff;
/// Proof-of-service penalties and bans.
pub mod pose;
/// The versioned participant list.
pub mod registry;
/// Quorum scoring and payment ordering.
pub mod scoring;
/// Persistent tree structures.
pub mod tree;

pub use diff::DiffEngine;
pub use pose::{PoseEngine, PoseStatus};
pub use registry::{ParticipantList, UniqueProperty};
pub use tree::PersistentMap;
