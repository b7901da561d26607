// Path: crates/storage/src/memory.rs
use crate::metrics::record_batch;
use mnlist_api::storage::{KvStore, StorageError, WriteOp};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// A `KvStore` held entirely in memory. Batches are applied under one write
/// lock, so readers never observe half a batch.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Backend("memory store lock poisoned".into())
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let guard = self.entries.read().map_err(poisoned)?;
        Ok(guard.get(key).cloned())
    }

    fn write_batch(&self, ops: Vec<WriteOp>) -> Result<(), StorageError> {
        let mut guard = self.entries.write().map_err(poisoned)?;
        record_batch(&ops);
        for op in ops {
            match op {
                WriteOp::Put(k, v) => {
                    guard.insert(k, v);
                }
                WriteOp::Delete(k) => {
                    guard.remove(&k);
                }
            }
        }
        Ok(())
    }

    fn iterate_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let guard = self.entries.read().map_err(poisoned)?;
        Ok(guard
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_iteration_is_ordered_and_bounded() {
        let store = MemoryKvStore::new();
        store
            .write_batch(vec![
                WriteOp::Put(b"sb".to_vec(), b"2".to_vec()),
                WriteOp::Put(b"sa".to_vec(), b"1".to_vec()),
                WriteOp::Put(b"t".to_vec(), b"3".to_vec()),
                WriteOp::Put(b"r".to_vec(), b"0".to_vec()),
            ])
            .unwrap();
        let rows = store.iterate_prefix(b"s").unwrap();
        assert_eq!(
            rows,
            vec![
                (b"sa".to_vec(), b"1".to_vec()),
                (b"sb".to_vec(), b"2".to_vec())
            ]
        );
        assert_eq!(store.iterate_prefix(b"").unwrap().len(), 4);
    }

    #[test]
    fn test_batch_applies_in_order() {
        let store = MemoryKvStore::new();
        store
            .write_batch(vec![
                WriteOp::Put(b"k".to_vec(), b"1".to_vec()),
                WriteOp::Delete(b"k".to_vec()),
                WriteOp::Put(b"j".to_vec(), b"2".to_vec()),
                WriteOp::Delete(b"missing".to_vec()),
            ])
            .unwrap();
        assert_eq!(store.get(b"k").unwrap(), None);
        assert_eq!(store.get(b"j").unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.len(), 1);
    }
}
