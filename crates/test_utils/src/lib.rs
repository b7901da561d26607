// Path: crates/test_utils/src/lib.rs
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

//! # Registry Test Utilities
//!
//! Deterministic randomness, participant and block fixtures, and assertion
//! macros shared by the workspace's tests.

pub mod assertions;
pub mod fixtures;
pub mod randomness;
