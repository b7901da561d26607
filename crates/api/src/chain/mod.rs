// Path: crates/api/src/chain/mod.rs

//! A read-only view of block ancestry, supplied by the host node.

use mnlist_types::app::Hash256;

/// The position of one block in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRef {
    /// The block hash.
    pub hash: Hash256,
    /// The block height.
    pub height: i64,
    /// The parent hash, `None` for the genesis block.
    pub prev_hash: Option<Hash256>,
}

/// Resolves block hashes to their place in the chain.
///
/// The registry walks back from a block to the nearest snapshot through this
/// trait. It only ever asks about blocks it was shown before, so an index
/// covering the active chain plus recent forks is sufficient.
pub trait BlockIndex: Send + Sync {
    /// Looks up a block by hash.
    fn block_ref(&self, hash: &Hash256) -> Option<BlockRef>;

    /// Returns the ancestor of `hash` at `height`, or `None` if `height` is
    /// above the block or the ancestry is unknown.
    fn ancestor(&self, hash: &Hash256, height: i64) -> Option<BlockRef> {
        let mut cur = self.block_ref(hash)?;
        if height > cur.height || height < 0 {
            return None;
        }
        while cur.height > height {
            let prev = cur.prev_hash?;
            cur = self.block_ref(&prev)?;
        }
        Some(cur)
    }

    /// Returns the parent of a block, if known.
    fn parent(&self, hash: &Hash256) -> Option<BlockRef> {
        let cur = self.block_ref(hash)?;
        self.block_ref(&cur.prev_hash?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Linear(HashMap<Hash256, BlockRef>);

    impl BlockIndex for Linear {
        fn block_ref(&self, hash: &Hash256) -> Option<BlockRef> {
            self.0.get(hash).copied()
        }
    }

    fn hash_at(h: i64) -> Hash256 {
        Hash256([h as u8 + 1; 32])
    }

    #[test]
    fn ancestor_walks_parents() {
        let mut map = HashMap::new();
        for h in 0..5 {
            map.insert(
                hash_at(h),
                BlockRef {
                    hash: hash_at(h),
                    height: h,
                    prev_hash: (h > 0).then(|| hash_at(h - 1)),
                },
            );
        }
        let index = Linear(map);
        assert_eq!(index.ancestor(&hash_at(4), 1).map(|b| b.hash), Some(hash_at(1)));
        assert_eq!(index.ancestor(&hash_at(4), 4).map(|b| b.height), Some(4));
        assert!(index.ancestor(&hash_at(2), 3).is_none());
        assert_eq!(index.parent(&hash_at(0)), None);
    }
}
