// Path: crates/manager/src/manager.rs
use crate::persist::RegistryStore;
use mnlist_api::chain::{BlockIndex, BlockRef};
use mnlist_api::storage::KvStore;
use mnlist_consensus::TransitionBuilder;
use mnlist_state::{DiffEngine, ParticipantList};
use mnlist_telemetry::time::Timer;
use mnlist_telemetry::{error_metrics, registry_metrics, storage_metrics};
use mnlist_types::app::{BlockContents, Hash256, RegistryDiff};
use mnlist_types::config::RegistryConfig;
use mnlist_types::error::{ErrorCode, RegistryError};
use mnlist_types::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// The result of connecting one block.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    /// The registry version after the block, stamped with its hash.
    pub list: ParticipantList,
    /// What the block changed.
    pub diff: Arc<RegistryDiff>,
    /// Skipped transactions, by index in the block.
    pub rejected: Vec<(usize, RegistryError)>,
}

#[derive(Debug)]
struct CachedDiff {
    height: i64,
    diff: Arc<RegistryDiff>,
}

#[derive(Debug, Default)]
struct CacheState {
    lists: HashMap<Hash256, ParticipantList>,
    diffs: HashMap<Hash256, CachedDiff>,
    tip: Option<ParticipantList>,
}

/// Keeps the registry in step with the chain.
///
/// Block connection and undo are expected to be serialised by the caller's
/// chain lock. The version cache has its own lock, and cache cleanup runs
/// under a third, so the maintenance task never waits on block processing
/// for longer than one cache update.
pub struct RegistryManager {
    config: RegistryConfig,
    builder: TransitionBuilder,
    store: RegistryStore,
    chain: Arc<dyn BlockIndex>,
    cache: Mutex<CacheState>,
    /// Tip height the cache was last cleaned for.
    cleanup: Mutex<i64>,
    /// Tip height published by `updated_block_tip`, waiting for cleanup.
    to_cleanup: AtomicI64,
}

impl std::fmt::Debug for RegistryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryManager")
            .field("config", &self.config)
            .field("to_cleanup", &self.to_cleanup.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn count_error(e: &RegistryError) {
    error_metrics().inc_error("registry", e.code());
}

impl RegistryManager {
    /// Creates a manager over `kv`. The config is expected to be validated.
    pub fn new(config: RegistryConfig, kv: Arc<dyn KvStore>, chain: Arc<dyn BlockIndex>) -> Self {
        Self {
            builder: TransitionBuilder::new(&config),
            config,
            store: RegistryStore::new(kv),
            chain,
            cache: Mutex::new(CacheState::default()),
            cleanup: Mutex::new(i64::MIN),
            to_cleanup: AtomicI64::new(i64::MIN),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    fn lock_cache(&self) -> MutexGuard<'_, CacheState> {
        // Cache entries are inserted whole, so a poisoned guard is still consistent.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of registry versions currently cached.
    pub fn cached_list_count(&self) -> usize {
        self.lock_cache().lists.len()
    }

    /// Connects a block: builds the next version, persists its diff (and a
    /// snapshot when one is due), caches it and makes it the tip.
    ///
    /// With `just_check` the version is built and returned but nothing is
    /// persisted or published.
    pub fn process_block(&self, block: &BlockContents, just_check: bool) -> Result<ProcessOutcome> {
        let _timer = (!just_check).then(|| Timer::new(registry_metrics()));

        let prev = if block.prev_block_hash.is_null() {
            ParticipantList::new(Hash256::ZERO, block.height - 1)
        } else {
            self.get_list_for_block(&block.prev_block_hash)?
        };
        let outcome = self.builder.build_next(&prev, block).inspect_err(count_error)?;
        let list = outcome.list.with_block_hash(block.block_hash);
        let diff = Arc::new(DiffEngine::diff(&prev, &list));

        if just_check {
            return Ok(ProcessOutcome {
                list,
                diff,
                rejected: outcome.rejected,
            });
        }

        self.store
            .write_diff(&block.block_hash, &diff)
            .inspect_err(count_error)?;
        if self.config.is_snapshot_height(list.height()) {
            self.write_snapshot(&list);
        }

        let new_bans = list
            .iter()
            .filter(|r| r.state.pose_ban_height == Some(list.height()))
            .count() as u64;
        {
            let mut cache = self.lock_cache();
            cache.lists.insert(block.block_hash, list.clone());
            cache.diffs.insert(
                block.block_hash,
                CachedDiff {
                    height: list.height(),
                    diff: Arc::clone(&diff),
                },
            );
            cache.tip = Some(list.clone());
            registry_metrics().set_cached_lists(cache.lists.len() as u64);
        }

        registry_metrics().inc_blocks_connected();
        registry_metrics().set_participants(list.all_count() as u64, list.valid_count() as u64);
        if new_bans > 0 {
            registry_metrics().inc_pose_bans(new_bans);
        }
        tracing::info!(
            target: "registry",
            height = list.height(),
            hash = %block.block_hash.short(),
            added = diff.added.len(),
            updated = diff.updated.len(),
            removed = diff.removed.len(),
            rejected = outcome.rejected.len(),
            "block connected"
        );

        Ok(ProcessOutcome {
            list,
            diff,
            rejected: outcome.rejected,
        })
    }

    /// Undoes the tip block, restoring the version before it. Returns that version.
    pub fn undo_block(&self, block_hash: &Hash256) -> Result<ParticipantList> {
        let tip_hash = self.lock_cache().tip.as_ref().map(|t| t.block_hash());
        if let Some(tip) = tip_hash {
            if tip != *block_hash {
                return Err(RegistryError::invariant(format!(
                    "undo of {} while the tip is {}",
                    block_hash.short(),
                    tip.short()
                )));
            }
        }

        let block = self.block_ref(block_hash)?;
        let diff = self.load_diff(&block)?;
        let current = self.get_list_for_block(block_hash)?;
        let prior = match block.prev_hash {
            Some(prev) => self.get_list_for_block(&prev)?,
            None => ParticipantList::new(Hash256::ZERO, block.height - 1),
        };
        let undone = DiffEngine::undo(&current, &diff, &prior).inspect_err(count_error)?;
        if undone != prior {
            let err = RegistryError::invariant(format!(
                "undo of block {} does not reproduce its parent",
                block_hash.short()
            ));
            count_error(&err);
            return Err(err);
        }

        let ops = self.store.block_erase_ops(block_hash)?;
        let rows = ops.len();
        self.store.commit(ops).inspect_err(count_error)?;
        {
            let mut cache = self.lock_cache();
            cache.lists.remove(block_hash);
            cache.diffs.remove(block_hash);
            cache.tip = Some(prior.clone());
            registry_metrics().set_cached_lists(cache.lists.len() as u64);
        }

        registry_metrics().inc_blocks_undone();
        registry_metrics().set_participants(prior.all_count() as u64, prior.valid_count() as u64);
        tracing::info!(
            target: "registry",
            height = block.height,
            hash = %block_hash.short(),
            rows_erased = rows,
            "block undone"
        );
        Ok(prior)
    }

    /// Records the new chain tip and publishes it for cache cleanup.
    pub fn updated_block_tip(&self, tip: &BlockRef) -> Result<()> {
        let list = self.get_list_for_block(&tip.hash)?;
        self.lock_cache().tip = Some(list);
        self.to_cleanup.fetch_max(tip.height, Ordering::AcqRel);
        Ok(())
    }

    /// The version at the current tip, or an empty list before the first block.
    pub fn get_list_at_tip(&self) -> ParticipantList {
        self.lock_cache()
            .tip
            .clone()
            .unwrap_or_else(|| ParticipantList::new(Hash256::ZERO, -1))
    }

    /// The version after `block_hash`.
    ///
    /// Served from the cache when possible. Otherwise the manager walks back
    /// through the block index to the nearest cached version or stored
    /// snapshot and replays the stored diffs forward, caching every version
    /// it rebuilds.
    pub fn get_list_for_block(&self, block_hash: &Hash256) -> Result<ParticipantList> {
        if block_hash.is_null() {
            return Ok(ParticipantList::new(Hash256::ZERO, -1));
        }
        if let Some(list) = self.lock_cache().lists.get(block_hash).cloned() {
            registry_metrics().inc_cache_hit();
            return Ok(list);
        }
        registry_metrics().inc_cache_miss();

        let mut pending: Vec<(BlockRef, Arc<RegistryDiff>)> = Vec::new();
        let mut cursor = *block_hash;
        let mut list = loop {
            if cursor.is_null() {
                let height = pending.last().map(|(b, _)| b.height - 1).unwrap_or(-1);
                break ParticipantList::new(Hash256::ZERO, height);
            }
            if !pending.is_empty() {
                if let Some(list) = self.lock_cache().lists.get(&cursor).cloned() {
                    break list;
                }
            }
            if let Some(list) = self.store.read_snapshot(&cursor).inspect_err(count_error)? {
                break list;
            }
            let block = self.block_ref(&cursor)?;
            pending.push((block, self.load_diff(&block)?));
            cursor = block.prev_hash.unwrap_or(Hash256::ZERO);
        };

        let mut rebuilt = Vec::with_capacity(pending.len() + 1);
        if !list.block_hash().is_null() {
            rebuilt.push(list.clone());
        }
        for (block, diff) in pending.iter().rev() {
            list = DiffEngine::apply(&list, diff)
                .inspect_err(count_error)?
                .with_block(block.hash, block.height);
            rebuilt.push(list.clone());
        }

        tracing::debug!(
            target: "cache",
            hash = %block_hash.short(),
            replayed = pending.len(),
            "rebuilt registry version"
        );
        let mut cache = self.lock_cache();
        for version in rebuilt {
            cache.lists.entry(version.block_hash()).or_insert(version);
        }
        registry_metrics().set_cached_lists(cache.lists.len() as u64);
        Ok(list)
    }

    /// Drops cached versions and diffs older than the cache window below
    /// `tip_height`. The tip version is always kept. Returns the number of
    /// evicted entries.
    pub fn cleanup_cache(&self, tip_height: i64) -> usize {
        let cutoff = tip_height.saturating_sub(self.config.cache_window());
        let mut cache = self.lock_cache();
        let tip_hash = cache.tip.as_ref().map(|t| t.block_hash());
        let before = cache.lists.len() + cache.diffs.len();
        cache
            .lists
            .retain(|hash, list| list.height() >= cutoff || Some(*hash) == tip_hash);
        cache
            .diffs
            .retain(|hash, d| d.height >= cutoff || Some(*hash) == tip_hash);
        let evicted = before - (cache.lists.len() + cache.diffs.len());
        registry_metrics().set_cached_lists(cache.lists.len() as u64);
        if evicted > 0 {
            tracing::debug!(target: "cache", cutoff, evicted, "cache cleaned");
        }
        evicted
    }

    /// Cleans the cache up to the most recently published tip, if that has
    /// not happened yet. Returns the number of evicted entries.
    pub fn do_maintenance(&self) -> usize {
        let mut cleaned = self.cleanup.lock().unwrap_or_else(|e| e.into_inner());
        let target = self.to_cleanup.load(Ordering::Acquire);
        if target <= *cleaned {
            return 0;
        }
        let evicted = self.cleanup_cache(target);
        *cleaned = target;
        evicted
    }

    fn block_ref(&self, hash: &Hash256) -> Result<BlockRef> {
        self.chain.block_ref(hash).ok_or_else(|| {
            RegistryError::SnapshotIo(format!("block {} is unknown to the block index", hash.short()))
        })
    }

    fn load_diff(&self, block: &BlockRef) -> Result<Arc<RegistryDiff>> {
        if let Some(cached) = self.lock_cache().diffs.get(&block.hash) {
            return Ok(Arc::clone(&cached.diff));
        }
        let diff = self
            .store
            .read_diff(&block.hash)?
            .map(Arc::new)
            .ok_or_else(|| {
                RegistryError::SnapshotIo(format!(
                    "no diff stored for block {} at height {}",
                    block.hash.short(),
                    block.height
                ))
            })?;
        self.lock_cache().diffs.insert(
            block.hash,
            CachedDiff {
                height: block.height,
                diff: Arc::clone(&diff),
            },
        );
        Ok(diff)
    }

    /// Writes a snapshot and prunes history it makes unnecessary. Failures
    /// are logged and counted; the diffs remain sufficient to rebuild state.
    fn write_snapshot(&self, list: &ParticipantList) {
        match self.store.write_snapshot(list) {
            Ok(rows) => {
                storage_metrics().inc_snapshots_written();
                tracing::info!(
                    target: "storage",
                    height = list.height(),
                    hash = %list.block_hash().short(),
                    rows,
                    "snapshot written"
                );
                if let Err(e) = self.prune_history(list) {
                    count_error(&e);
                    tracing::warn!(target: "storage", error = %e, "pruning old history failed");
                }
            }
            Err(e) => {
                storage_metrics().inc_snapshots_failed();
                count_error(&e);
                tracing::warn!(
                    target: "storage",
                    height = list.height(),
                    error = %e,
                    "snapshot write failed, will retry at the next period"
                );
            }
        }
    }

    /// Deletes the snapshot that fell out of the retained window and the
    /// diffs that only it could replay.
    fn prune_history(&self, list: &ParticipantList) -> Result<()> {
        let oldest_kept = list.height() - self.config.cache_window();
        let drop_at = oldest_kept - i64::from(self.config.snapshot_period);
        if drop_at < 0 {
            return Ok(());
        }
        let Some(kept) = self.chain.ancestor(&list.block_hash(), oldest_kept) else {
            return Ok(());
        };
        if !self.store.has_snapshot(&kept.hash)? {
            return Ok(());
        }

        let mut ops = Vec::new();
        let mut cursor = kept.prev_hash.and_then(|h| self.chain.block_ref(&h));
        while let Some(block) = cursor {
            if block.height < drop_at {
                break;
            }
            ops.push(self.store.diff_erase_op(&block.hash));
            if block.height == drop_at {
                ops.extend(self.store.snapshot_erase_ops(&block.hash)?);
            }
            cursor = block.prev_hash.and_then(|h| self.chain.block_ref(&h));
        }
        let rows = ops.len();
        self.store.commit(ops)?;
        tracing::info!(
            target: "storage",
            from = drop_at,
            to = oldest_kept,
            rows,
            "pruned history outside the retained window"
        );
        Ok(())
    }
}
