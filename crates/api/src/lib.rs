// Path: crates/api/src/lib.rs

//! # Registry API Crate Lints
//!
//! Panics are disallowed in non-test code to promote robust error handling.
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]
#![deny(missing_docs)]
//! # Registry API
//!
//! The traits the registry consumes from its surroundings. Implementations
//! live in other crates (`mnlist-storage` for stores, the host node or
//! `mnlist-manager` for block indexes).

/// A read-only view of block ancestry.
pub mod chain;
/// The abstract ordered key/value store and the registry's key layout.
pub mod storage;

/// A curated set of the most commonly used traits and types.
pub mod prelude {
    pub use crate::chain::{BlockIndex, BlockRef};
    pub use crate::storage::{KvStore, StorageError, WriteOp};
}
