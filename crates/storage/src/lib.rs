// Path: crates/storage/src/lib.rs
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

//! Ordered key/value store backends for registry diffs and snapshots.
//! `MemoryKvStore` keeps everything in a `BTreeMap`; `RedbKvStore` persists
//! into a single redb table whose byte-ordered keys give prefix iteration
//! for free.

pub mod memory;
pub mod metrics;
pub mod redb_store;

pub use memory::MemoryKvStore;
pub use redb_store::RedbKvStore;
