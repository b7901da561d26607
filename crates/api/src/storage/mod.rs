// Path: crates/api/src/storage/mod.rs

//! API for the abstract ordered key/value store that holds registry diffs
//! and snapshots, plus the key layout the registry writes into it.

use mnlist_types::error::RegistryError;
use std::sync::Arc;
use thiserror::Error;

/// Represents errors that can occur within the durable storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A generic error originating from the underlying key-value store backend (e.g., redb).
    #[error("backend error: {0}")]
    Backend(String),
    /// An error occurred while serializing data for storage.
    #[error("encode error: {0}")]
    Encode(String),
    /// An error occurred while deserializing data from storage.
    #[error("decode error: {0}")]
    Decode(String),
    /// The requested key or item was not found in the store.
    #[error("not found")]
    NotFound,
}

impl From<StorageError> for RegistryError {
    fn from(e: StorageError) -> Self {
        RegistryError::SnapshotIo(e.to_string())
    }
}

/// One entry of an atomic write batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Insert or overwrite a key.
    Put(Vec<u8>, Vec<u8>),
    /// Remove a key. Removing a missing key is not an error.
    Delete(Vec<u8>),
}

impl WriteOp {
    /// The key this operation touches.
    pub fn key(&self) -> &[u8] {
        match self {
            Self::Put(k, _) | Self::Delete(k) => k,
        }
    }
}

/// An ordered key/value store.
///
/// Calls are synchronous and expected to have bounded latency. A batch is
/// applied atomically: after a crash either every operation of the batch is
/// visible or none is.
pub trait KvStore: Send + Sync {
    /// Reads a single key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Atomically applies a batch of puts and deletes, in order.
    fn write_batch(&self, ops: Vec<WriteOp>) -> Result<(), StorageError>;

    /// Returns every entry whose key starts with `prefix`, in ascending key order.
    fn iterate_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;
}

impl<T: KvStore + ?Sized> KvStore for Arc<T> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key)
    }

    fn write_batch(&self, ops: Vec<WriteOp>) -> Result<(), StorageError> {
        (**self).write_batch(ops)
    }

    fn iterate_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        (**self).iterate_prefix(prefix)
    }
}

/// Key layout of the registry's rows.
///
/// ```text
/// [b'd'] ++ block_hash                    -> diff
/// [b's'] ++ block_hash                    -> snapshot header
/// [b's'] ++ block_hash ++ participant_id  -> snapshot record
/// ```
pub mod keys {
    use mnlist_types::app::Hash256;

    /// Tag byte of diff rows.
    pub const DIFF_TAG: u8 = b'd';
    /// Tag byte of snapshot rows.
    pub const SNAPSHOT_TAG: u8 = b's';

    /// Length of a snapshot header key.
    pub const SNAPSHOT_HEADER_KEY_LEN: usize = 1 + 32;
    /// Length of a snapshot record key.
    pub const SNAPSHOT_RECORD_KEY_LEN: usize = 1 + 32 + 32;

    fn tagged(tag: u8, block_hash: &Hash256) -> Vec<u8> {
        let mut key = Vec::with_capacity(SNAPSHOT_RECORD_KEY_LEN);
        key.push(tag);
        key.extend_from_slice(block_hash.as_ref());
        key
    }

    /// The diff row of a block.
    pub fn diff_key(block_hash: &Hash256) -> Vec<u8> {
        tagged(DIFF_TAG, block_hash)
    }

    /// The snapshot header row of a block. Also the prefix of its record rows.
    pub fn snapshot_key(block_hash: &Hash256) -> Vec<u8> {
        tagged(SNAPSHOT_TAG, block_hash)
    }

    /// One participant's row in a block's snapshot.
    pub fn snapshot_record_key(block_hash: &Hash256, participant_id: &Hash256) -> Vec<u8> {
        let mut key = tagged(SNAPSHOT_TAG, block_hash);
        key.extend_from_slice(participant_id.as_ref());
        key
    }

    /// Extracts the participant id from a snapshot record key, or `None` for
    /// any other key shape (notably the header row).
    pub fn participant_of_record_key(key: &[u8]) -> Option<Hash256> {
        if key.len() != SNAPSHOT_RECORD_KEY_LEN || key.first() != Some(&SNAPSHOT_TAG) {
            return None;
        }
        key.get(SNAPSHOT_HEADER_KEY_LEN..)
            .and_then(|tail| Hash256::from_slice(tail).ok())
    }
}
