// Path: crates/types/src/error/mod.rs
//! Core error types for the participant registry.

use crate::app::Hash256;
use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors raised while building, diffing, persisting or undoing registry versions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A unique property value is already held by another live participant.
    #[error("unique property {property} already owned by {owner}")]
    DuplicateUniqueProperty {
        /// Which property collided, e.g. `service 10.0.0.1:9999`.
        property: String,
        /// The participant currently holding the value.
        owner: Hash256,
    },
    /// A referenced participant (by id, internal id or collateral) does not exist.
    #[error("unknown participant: {0}")]
    UnknownParticipant(String),
    /// A special transaction or diff is malformed. The enclosing block is invalid.
    #[error("malformed transition: {0}")]
    MalformedTransition(String),
    /// Reading or writing persisted diffs and snapshots failed.
    #[error("snapshot I/O error: {0}")]
    SnapshotIo(String),
    /// An internal consistency check failed.
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),
}

impl RegistryError {
    /// Returns true for errors that invalidate the block being processed, or
    /// that indicate the registry itself is inconsistent.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MalformedTransition(_) | Self::InternalInvariantViolation(_)
        )
    }

    /// Shorthand for an `InternalInvariantViolation`.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InternalInvariantViolation(msg.into())
    }
}

impl ErrorCode for RegistryError {
    fn code(&self) -> &'static str {
        match self {
            Self::DuplicateUniqueProperty { .. } => "REGISTRY_DUPLICATE_UNIQUE_PROPERTY",
            Self::UnknownParticipant(_) => "REGISTRY_UNKNOWN_PARTICIPANT",
            Self::MalformedTransition(_) => "REGISTRY_MALFORMED_TRANSITION",
            Self::SnapshotIo(_) => "REGISTRY_SNAPSHOT_IO",
            Self::InternalInvariantViolation(_) => "REGISTRY_INTERNAL_INVARIANT_VIOLATION",
        }
    }
}

impl From<parity_scale_codec::Error> for RegistryError {
    fn from(e: parity_scale_codec::Error) -> Self {
        RegistryError::SnapshotIo(e.to_string())
    }
}
