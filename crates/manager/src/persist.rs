// Path: crates/manager/src/persist.rs
//! Diff and snapshot rows in the key/value store.
//!
//! Every connected block has one diff row. Every `snapshot_period` blocks a
//! snapshot is written as a header row plus one row per participant, all in
//! a single batch, so a crash never leaves half a snapshot behind.

use mnlist_api::storage::keys::{
    diff_key, participant_of_record_key, snapshot_key, snapshot_record_key,
    SNAPSHOT_HEADER_KEY_LEN,
};
use mnlist_api::storage::{KvStore, StorageError, WriteOp};
use mnlist_state::ParticipantList;
use mnlist_types::app::{Hash256, ParticipantRecord, RegistryDiff};
use mnlist_types::codec;
use mnlist_types::error::RegistryError;
use mnlist_types::Result;
use parity_scale_codec::{Decode, Encode};
use std::sync::Arc;

/// The header row of a snapshot.
#[derive(Encode, Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    /// Height of the snapshotted block.
    pub height: i64,
    /// The list's `total_registered_count`, which records alone cannot recover.
    pub total_registered_count: u64,
}

fn encode<T: Encode>(v: &T) -> Result<Vec<u8>> {
    codec::to_bytes_canonical(v).map_err(|e| StorageError::Encode(e).into())
}

fn decode<T: Decode>(b: &[u8]) -> Result<T> {
    codec::from_bytes_canonical(b).map_err(|e| StorageError::Decode(e).into())
}

/// Typed access to the registry's rows.
#[derive(Clone)]
pub struct RegistryStore {
    kv: Arc<dyn KvStore>,
}

impl std::fmt::Debug for RegistryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryStore").finish_non_exhaustive()
    }
}

impl RegistryStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Commits a batch built by the `*_ops` helpers.
    pub fn commit(&self, ops: Vec<WriteOp>) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }
        Ok(self.kv.write_batch(ops)?)
    }

    pub fn diff_ops(&self, block_hash: &Hash256, diff: &RegistryDiff) -> Result<Vec<WriteOp>> {
        Ok(vec![WriteOp::Put(diff_key(block_hash), encode(diff)?)])
    }

    pub fn write_diff(&self, block_hash: &Hash256, diff: &RegistryDiff) -> Result<()> {
        self.commit(self.diff_ops(block_hash, diff)?)
    }

    pub fn read_diff(&self, block_hash: &Hash256) -> Result<Option<RegistryDiff>> {
        match self.kv.get(&diff_key(block_hash))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn diff_erase_op(&self, block_hash: &Hash256) -> WriteOp {
        WriteOp::Delete(diff_key(block_hash))
    }

    pub fn has_diff(&self, block_hash: &Hash256) -> Result<bool> {
        Ok(self.kv.get(&diff_key(block_hash))?.is_some())
    }

    /// Ops replacing whatever snapshot exists for the list's block with `list`.
    pub fn snapshot_ops(&self, list: &ParticipantList) -> Result<Vec<WriteOp>> {
        let hash = list.block_hash();
        let mut ops = self.snapshot_erase_ops(&hash)?;
        let header = SnapshotHeader {
            height: list.height(),
            total_registered_count: list.total_registered_count(),
        };
        ops.push(WriteOp::Put(snapshot_key(&hash), encode(&header)?));
        for record in list.iter() {
            ops.push(WriteOp::Put(
                snapshot_record_key(&hash, &record.participant_id),
                encode(record.as_ref())?,
            ));
        }
        Ok(ops)
    }

    /// Writes a full snapshot. Returns the number of participant rows.
    pub fn write_snapshot(&self, list: &ParticipantList) -> Result<usize> {
        self.commit(self.snapshot_ops(list)?)?;
        Ok(list.all_count())
    }

    pub fn has_snapshot(&self, block_hash: &Hash256) -> Result<bool> {
        Ok(self.kv.get(&snapshot_key(block_hash))?.is_some())
    }

    /// Loads the snapshot of a block, if one was written.
    pub fn read_snapshot(&self, block_hash: &Hash256) -> Result<Option<ParticipantList>> {
        let rows = self.kv.iterate_prefix(&snapshot_key(block_hash))?;
        if rows.is_empty() {
            return Ok(None);
        }

        let mut header: Option<SnapshotHeader> = None;
        let mut records = Vec::with_capacity(rows.len());
        for (key, value) in rows {
            if key.len() == SNAPSHOT_HEADER_KEY_LEN {
                header = Some(decode(&value)?);
                continue;
            }
            let pid = participant_of_record_key(&key).ok_or_else(|| {
                RegistryError::SnapshotIo(format!(
                    "unexpected row {} in snapshot {}",
                    hex::encode(&key),
                    block_hash.short()
                ))
            })?;
            let record: ParticipantRecord = decode(&value)?;
            if record.participant_id != pid {
                return Err(RegistryError::SnapshotIo(format!(
                    "snapshot {} row keyed {} holds participant {}",
                    block_hash.short(),
                    pid.short(),
                    record.participant_id.short()
                )));
            }
            records.push(record);
        }

        let header = header.ok_or_else(|| {
            RegistryError::SnapshotIo(format!("snapshot {} has no header", block_hash.short()))
        })?;
        ParticipantList::from_records(
            *block_hash,
            header.height,
            header.total_registered_count,
            records,
        )
        .map(Some)
    }

    pub fn snapshot_erase_ops(&self, block_hash: &Hash256) -> Result<Vec<WriteOp>> {
        Ok(self
            .kv
            .iterate_prefix(&snapshot_key(block_hash))?
            .into_iter()
            .map(|(k, _)| WriteOp::Delete(k))
            .collect())
    }

    /// Ops removing every row of a block: its diff and any snapshot.
    pub fn block_erase_ops(&self, block_hash: &Hash256) -> Result<Vec<WriteOp>> {
        let mut ops = vec![self.diff_erase_op(block_hash)];
        ops.extend(self.snapshot_erase_ops(block_hash)?);
        Ok(ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnlist_state::DiffEngine;
    use mnlist_storage::MemoryKvStore;
    use mnlist_test_utils::fixtures::{block_hash, participant_id, participant_record};
    use mnlist_test_utils::{assert_err, assert_matches, assert_ok};

    fn store() -> (Arc<MemoryKvStore>, RegistryStore) {
        let kv = Arc::new(MemoryKvStore::new());
        (kv.clone(), RegistryStore::new(kv))
    }

    fn list_at(height: i64, n: u64) -> ParticipantList {
        let mut list = ParticipantList::new(block_hash(height, 0), height);
        for i in 0..n {
            list = assert_ok!(list.with_added(participant_record(i, i, 0)));
        }
        list
    }

    #[test]
    fn test_snapshot_round_trip_keeps_total_count() {
        let (_, store) = store();
        let list = assert_ok!(list_at(4, 3).with_removed(&participant_id(2)));
        assert_eq!(list.total_registered_count(), 3);
        assert_eq!(assert_ok!(store.write_snapshot(&list)), 2);

        let loaded = assert_ok!(store.read_snapshot(&list.block_hash())).unwrap();
        assert_eq!(loaded, list);
        assert_eq!(loaded.total_registered_count(), 3);
        assert!(assert_ok!(store.read_snapshot(&block_hash(5, 0))).is_none());
    }

    #[test]
    fn test_rewriting_a_snapshot_drops_stale_rows() {
        let (_, store) = store();
        let full = list_at(4, 3);
        assert_ok!(store.write_snapshot(&full));
        let smaller = assert_ok!(full.with_removed(&participant_id(0)));
        assert_ok!(store.write_snapshot(&smaller));
        let loaded = assert_ok!(store.read_snapshot(&full.block_hash())).unwrap();
        assert_eq!(loaded.all_count(), 2);
    }

    #[test]
    fn test_diff_rows_and_erase() {
        let (kv, store) = store();
        let from = list_at(4, 2);
        let to = assert_ok!(from.with_block(block_hash(5, 0), 5).with_added(participant_record(7, 2, 5)));
        let diff = DiffEngine::diff(&from, &to);
        assert_ok!(store.write_diff(&to.block_hash(), &diff));
        assert_ok!(store.write_snapshot(&to));
        assert_eq!(assert_ok!(store.read_diff(&to.block_hash())), Some(diff));

        assert_ok!(store.commit(assert_ok!(store.block_erase_ops(&to.block_hash()))));
        assert!(!assert_ok!(store.has_diff(&to.block_hash())));
        assert!(!assert_ok!(store.has_snapshot(&to.block_hash())));
        assert!(kv.is_empty());
    }

    #[test]
    fn test_corrupt_rows_surface_as_snapshot_io() {
        let (kv, store) = store();
        let hash = block_hash(1, 0);
        kv.write_batch(vec![WriteOp::Put(diff_key(&hash), vec![0xff, 0xff])])
            .unwrap();
        let err = assert_err!(store.read_diff(&hash));
        assert_matches!(err, RegistryError::SnapshotIo(_));

        // Records without a header.
        kv.write_batch(vec![WriteOp::Put(
            snapshot_record_key(&hash, &participant_id(0)),
            encode(&participant_record(0, 0, 0)).unwrap(),
        )])
        .unwrap();
        let err = assert_err!(store.read_snapshot(&hash));
        assert!(!err.is_fatal());
    }
}
