// Path: crates/state/src/tree/avl/node.rs

use std::cmp::max;
use std::sync::Arc;

/// A shared, possibly empty, subtree.
pub(crate) type Link<K, V> = Option<Arc<Node<K, V>>>;

/// AVL tree node. Never mutated after construction; every change builds new
/// nodes along the path and shares the untouched subtrees.
#[derive(Debug)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) height: u32,
    pub(crate) size: usize,
    pub(crate) left: Link<K, V>,
    pub(crate) right: Link<K, V>,
}

pub(crate) fn height<K, V>(link: &Link<K, V>) -> u32 {
    link.as_ref().map_or(0, |n| n.height)
}

pub(crate) fn size<K, V>(link: &Link<K, V>) -> usize {
    link.as_ref().map_or(0, |n| n.size)
}

/// Builds a node over two subtrees, computing height and size.
pub(crate) fn make<K, V>(key: K, value: V, left: Link<K, V>, right: Link<K, V>) -> Arc<Node<K, V>> {
    Arc::new(Node {
        height: 1 + max(height(&left), height(&right)),
        size: 1 + size(&left) + size(&right),
        key,
        value,
        left,
        right,
    })
}

/// Right height minus left height.
fn balance_factor<K, V>(node: &Node<K, V>) -> i64 {
    i64::from(height(&node.right)) - i64::from(height(&node.left))
}

/// Builds a node over `left` and `right` and restores the AVL balance.
///
/// The subtrees may differ in height by at most two, which holds after a
/// single insert or remove below this node.
pub(crate) fn balanced<K: Clone, V: Clone>(
    key: K,
    value: V,
    left: Link<K, V>,
    right: Link<K, V>,
) -> Arc<Node<K, V>> {
    let lh = i64::from(height(&left));
    let rh = i64::from(height(&right));

    if rh - lh > 1 {
        if let Some(r) = right.as_ref() {
            if balance_factor(r) < 0 {
                // RL case
                if let Some(rl) = r.left.as_ref() {
                    let new_left = make(key, value, left, rl.left.clone());
                    let new_right = make(r.key.clone(), r.value.clone(), rl.right.clone(), r.right.clone());
                    return make(rl.key.clone(), rl.value.clone(), Some(new_left), Some(new_right));
                }
            }
            // RR case
            let new_left = make(key, value, left, r.left.clone());
            return make(r.key.clone(), r.value.clone(), Some(new_left), r.right.clone());
        }
    }
    if lh - rh > 1 {
        if let Some(l) = left.as_ref() {
            if balance_factor(l) > 0 {
                // LR case
                if let Some(lr) = l.right.as_ref() {
                    let new_left = make(l.key.clone(), l.value.clone(), l.left.clone(), lr.left.clone());
                    let new_right = make(key, value, lr.right.clone(), right);
                    return make(lr.key.clone(), lr.value.clone(), Some(new_left), Some(new_right));
                }
            }
            // LL case
            let new_right = make(key, value, l.right.clone(), right);
            return make(l.key.clone(), l.value.clone(), l.left.clone(), Some(new_right));
        }
    }
    make(key, value, left, right)
}

/// Inserts or replaces `key`. Returns the new subtree and whether the key was new.
pub(crate) fn insert<K: Ord + Clone, V: Clone>(link: &Link<K, V>, key: K, value: V) -> (Arc<Node<K, V>>, bool) {
    let Some(node) = link else {
        return (make(key, value, None, None), true);
    };
    match key.cmp(&node.key) {
        std::cmp::Ordering::Equal => (
            make(key, value, node.left.clone(), node.right.clone()),
            false,
        ),
        std::cmp::Ordering::Less => {
            let (new_left, added) = insert(&node.left, key, value);
            (
                balanced(node.key.clone(), node.value.clone(), Some(new_left), node.right.clone()),
                added,
            )
        }
        std::cmp::Ordering::Greater => {
            let (new_right, added) = insert(&node.right, key, value);
            (
                balanced(node.key.clone(), node.value.clone(), node.left.clone(), Some(new_right)),
                added,
            )
        }
    }
}

/// Removes the minimum entry of a non-empty subtree. Returns the new subtree
/// and the removed entry.
fn remove_min<K: Clone, V: Clone>(node: &Arc<Node<K, V>>) -> (Link<K, V>, K, V) {
    match node.left.as_ref() {
        None => (node.right.clone(), node.key.clone(), node.value.clone()),
        Some(left) => {
            let (new_left, k, v) = remove_min(left);
            (
                Some(balanced(node.key.clone(), node.value.clone(), new_left, node.right.clone())),
                k,
                v,
            )
        }
    }
}

/// Removes `key`. Returns `None` if the key was absent (the caller keeps the
/// old subtree), otherwise the new, possibly empty, subtree.
pub(crate) fn remove<K: Ord + Clone, V: Clone>(link: &Link<K, V>, key: &K) -> Option<Link<K, V>> {
    let node = link.as_ref()?;
    match key.cmp(&node.key) {
        std::cmp::Ordering::Less => {
            let new_left = remove(&node.left, key)?;
            Some(Some(balanced(node.key.clone(), node.value.clone(), new_left, node.right.clone())))
        }
        std::cmp::Ordering::Greater => {
            let new_right = remove(&node.right, key)?;
            Some(Some(balanced(node.key.clone(), node.value.clone(), node.left.clone(), new_right)))
        }
        std::cmp::Ordering::Equal => match (&node.left, &node.right) {
            (None, None) => Some(None),
            (Some(l), None) => Some(Some(l.clone())),
            (None, Some(r)) => Some(Some(r.clone())),
            (Some(_), Some(r)) => {
                let (new_right, k, v) = remove_min(r);
                Some(Some(balanced(k, v, node.left.clone(), new_right)))
            }
        },
    }
}
