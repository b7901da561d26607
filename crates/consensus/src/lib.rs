// Path: crates/consensus/src/lib.rs
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
//! Consensus-side registry logic: folding a block's special transactions and
//! quorum commitments into the next registry version.

pub mod common;
pub mod transition;

pub use transition::{TransitionBuilder, TransitionOutcome};
