// Path: crates/manager/src/chain.rs
use mnlist_api::chain::{BlockIndex, BlockRef};
use mnlist_types::app::{BlockContents, Hash256};
use std::collections::HashMap;
use std::sync::RwLock;

/// A block index held in memory. Forks are fine: blocks are keyed by hash
/// and linked through their parent hash.
#[derive(Debug, Default)]
pub struct BlockTree {
    blocks: RwLock<HashMap<Hash256, BlockRef>>,
}

impl BlockTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a block.
    pub fn insert(&self, block: BlockRef) {
        let mut blocks = self.blocks.write().unwrap_or_else(|e| e.into_inner());
        blocks.insert(block.hash, block);
    }

    /// Records a block from its contents and returns its reference. A null
    /// parent hash marks the first block of the chain.
    pub fn push(&self, block: &BlockContents) -> BlockRef {
        let block_ref = BlockRef {
            hash: block.block_hash,
            height: block.height,
            prev_hash: (!block.prev_block_hash.is_null()).then_some(block.prev_block_hash),
        };
        self.insert(block_ref);
        block_ref
    }

    /// Number of known blocks.
    pub fn len(&self) -> usize {
        self.blocks.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlockIndex for BlockTree {
    fn block_ref(&self, hash: &Hash256) -> Option<BlockRef> {
        self.blocks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(hash)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnlist_test_utils::fixtures::{block_hash, empty_block, BlockBuilder};

    #[test]
    fn ancestry_is_walkable_across_forks() {
        let tree = BlockTree::new();
        for h in 0..10 {
            tree.push(&empty_block(h));
        }
        tree.push(&BlockBuilder::new(6).fork(1).build());
        assert_eq!(tree.len(), 11);

        let anc = tree.ancestor(&block_hash(9, 0), 3).unwrap();
        assert_eq!(anc.hash, block_hash(3, 0));
        assert_eq!(tree.block_ref(&block_hash(0, 0)).unwrap().prev_hash, None);
        assert_eq!(
            tree.parent(&block_hash(6, 1)).map(|b| b.hash),
            Some(block_hash(5, 0))
        );
    }
}
