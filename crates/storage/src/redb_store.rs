// Path: crates/storage/src/redb_store.rs
use crate::metrics::record_batch;
use mnlist_api::storage::{KvStore, StorageError, WriteOp};
use redb::{Database, ReadTransaction, ReadableTable, TableDefinition, WriteTransaction};
use std::path::Path;
use std::sync::Arc;

/// All registry rows live in one table; the leading tag byte of each key
/// separates diffs from snapshots.
const ROWS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("MNLIST_ROWS");

fn backend<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// A durable `KvStore` backed by a redb database file.
#[derive(Clone)]
pub struct RedbKvStore {
    db: Arc<Database>,
}

impl std::fmt::Debug for RedbKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbKvStore").finish_non_exhaustive()
    }
}

impl RedbKvStore {
    /// Opens (or creates) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(backend)?;

        // Ensure the table exists so readers never hit `TableDoesNotExist`.
        {
            let w = db.begin_write().map_err(backend)?;
            {
                w.open_table(ROWS).map_err(backend)?;
            }
            w.commit().map_err(backend)?;
        }
        tracing::info!(target: "storage", path = %path.as_ref().display(), "opened redb store");

        Ok(Self { db: Arc::new(db) })
    }

    fn read_txn(&self) -> Result<ReadTransaction<'_>, StorageError> {
        self.db.begin_read().map_err(backend)
    }

    fn write_txn(&self) -> Result<WriteTransaction<'_>, StorageError> {
        self.db.begin_write().map_err(backend)
    }
}

impl KvStore for RedbKvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let r = self.read_txn()?;
        let t = r.open_table(ROWS).map_err(backend)?;
        let out = t.get(key).map_err(backend)?.map(|v| v.value().to_vec());
        Ok(out)
    }

    fn write_batch(&self, ops: Vec<WriteOp>) -> Result<(), StorageError> {
        if ops.is_empty() {
            return Ok(());
        }
        let w = self.write_txn()?;
        {
            let mut table = w.open_table(ROWS).map_err(backend)?;
            for op in &ops {
                match op {
                    WriteOp::Put(k, v) => {
                        table.insert(k.as_slice(), v.as_slice()).map_err(backend)?;
                    }
                    WriteOp::Delete(k) => {
                        table.remove(k.as_slice()).map_err(backend)?;
                    }
                }
            }
        }
        w.commit().map_err(backend)?;
        record_batch(&ops);
        tracing::debug!(target: "storage", ops = ops.len(), "committed batch");
        Ok(())
    }

    fn iterate_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let r = self.read_txn()?;
        let table = r.open_table(ROWS).map_err(backend)?;
        let mut out = Vec::new();
        for entry in table.range(prefix..).map_err(backend)? {
            let (k, v) = entry.map_err(backend)?;
            if !k.value().starts_with(prefix) {
                break;
            }
            out.push((k.value().to_vec(), v.value().to_vec()));
        }
        Ok(out)
    }
}
