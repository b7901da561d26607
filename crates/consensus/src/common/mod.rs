// Path: crates/consensus/src/common/mod.rs
//! Logic shared by the transition stages.

pub mod penalty;
