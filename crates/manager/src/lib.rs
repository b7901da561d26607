// Path: crates/manager/src/lib.rs
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

//! # Registry Manager
//!
//! Owns the registry across blocks: builds the version for every connected
//! block, persists its diff (and a full snapshot on the snapshot cadence),
//! keeps recent versions cached, reconstructs older ones from the nearest
//! snapshot, and undoes blocks on reorganisation.
//!
//! The manager is an explicit context object. Construct one at start-up and
//! share it through an `Arc`.

/// An in-memory block index.
pub mod chain;
/// Loading `RegistryConfig` from TOML.
pub mod config;
/// The background cache maintenance task.
pub mod maintenance;
/// The registry manager itself.
pub mod manager;
/// Encoding of diffs and snapshots into the key/value store.
pub mod persist;

pub use chain::BlockTree;
pub use manager::{ProcessOutcome, RegistryManager};
pub use persist::{RegistryStore, SnapshotHeader};
