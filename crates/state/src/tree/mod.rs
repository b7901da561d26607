// Path: crates/state/src/tree/mod.rs

//! Persistent tree structures backing the registry's indexes.

/// A persistent AVL tree with structural sharing.
pub mod avl;

pub use avl::PersistentMap;
