// Path: crates/types/src/app/mod.rs

//! Core data structures of the participant registry.

/// The 256-bit hash type and hashing helpers.
pub mod hash;
/// Participant records, state and deltas.
pub mod participant;
/// Registry diffs.
pub mod diff;
/// Block contents and special transactions.
pub mod transition;

pub use diff::*;
pub use hash::*;
pub use participant::*;
pub use transition::*;
