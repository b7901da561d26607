// Path: crates/state/src/tree/avl/mod.rs

//! A persistent (immutable) ordered map.
//!
//! Every update returns a new map and leaves the receiver untouched. The two
//! versions share every subtree the update did not touch, so cloning a map is
//! O(1) and an update allocates O(log n) nodes. Registry versions cached for
//! thousands of heights therefore cost memory proportional to what changed
//! between them, not to their size.

mod node;

use node::{Link, Node};
use std::fmt;
use std::sync::Arc;

/// An immutable ordered map with structural sharing.
pub struct PersistentMap<K, V> {
    root: Link<K, V>,
}

impl<K, V> Clone for PersistentMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
        }
    }
}

impl<K, V> Default for PersistentMap<K, V> {
    fn default() -> Self {
        Self { root: None }
    }
}

impl<K, V> PersistentMap<K, V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries. O(1).
    pub fn len(&self) -> usize {
        node::size(&self.root)
    }

    /// Returns true if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// In-order iterator over the entries.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut iter = Iter {
            stack: Vec::new(),
            remaining: self.len(),
        };
        iter.push_left(self.root.as_deref());
        iter
    }

    /// In-order iterator over the keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    /// In-order iterator over the values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    /// Returns true if both maps share the same root node, which implies equal content.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<K: Ord + Clone, V: Clone> PersistentMap<K, V> {
    /// Looks up a key. O(log n).
    pub fn get(&self, key: &K) -> Option<&V> {
        let mut cur = self.root.as_deref();
        while let Some(n) = cur {
            match key.cmp(&n.key) {
                std::cmp::Ordering::Less => cur = n.left.as_deref(),
                std::cmp::Ordering::Greater => cur = n.right.as_deref(),
                std::cmp::Ordering::Equal => return Some(&n.value),
            }
        }
        None
    }

    /// Returns true if the key is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Returns a map with `key` set to `value`. O(log n).
    pub fn insert(&self, key: K, value: V) -> Self {
        let (root, _) = node::insert(&self.root, key, value);
        Self { root: Some(root) }
    }

    /// Returns a map without `key`. Removing an absent key returns a map
    /// sharing this map's root. O(log n).
    pub fn remove(&self, key: &K) -> Self {
        match node::remove(&self.root, key) {
            Some(root) => Self { root },
            None => self.clone(),
        }
    }

    /// Smallest entry.
    pub fn first(&self) -> Option<(&K, &V)> {
        let mut cur = self.root.as_deref()?;
        while let Some(l) = cur.left.as_deref() {
            cur = l;
        }
        Some((&cur.key, &cur.value))
    }

    /// Largest entry.
    pub fn last(&self) -> Option<(&K, &V)> {
        let mut cur = self.root.as_deref()?;
        while let Some(r) = cur.right.as_deref() {
            cur = r;
        }
        Some((&cur.key, &cur.value))
    }

    #[cfg(test)]
    pub(crate) fn check_balance(&self) -> bool {
        fn walk<K: Ord, V>(link: &Link<K, V>, lo: Option<&K>, hi: Option<&K>) -> Option<(u32, usize)> {
            let Some(n) = link else {
                return Some((0, 0));
            };
            if lo.is_some_and(|lo| n.key <= *lo) || hi.is_some_and(|hi| n.key >= *hi) {
                return None;
            }
            let (lh, ls) = walk(&n.left, lo, Some(&n.key))?;
            let (rh, rs) = walk(&n.right, Some(&n.key), hi)?;
            let ok = lh.abs_diff(rh) <= 1 && n.height == 1 + lh.max(rh) && n.size == 1 + ls + rs;
            ok.then_some((n.height, n.size))
        }
        walk(&self.root, None, None).is_some()
    }
}

impl<K: Ord + Clone, V: Clone> FromIterator<(K, V)> for PersistentMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |map, (k, v)| map.insert(k, v))
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for PersistentMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.len() == other.len() && self.iter().eq(other.iter()))
    }
}

impl<K: Eq, V: Eq> Eq for PersistentMap<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PersistentMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// In-order iterator over a `PersistentMap`.
pub struct Iter<'a, K, V> {
    stack: Vec<&'a Node<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn push_left(&mut self, mut cur: Option<&'a Node<K, V>>) {
        while let Some(n) = cur {
            self.stack.push(n);
            cur = n.left.as_deref();
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.stack.pop()?;
        self.push_left(n.right.as_deref());
        self.remaining = self.remaining.saturating_sub(1);
        Some((&n.key, &n.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}

impl<'a, K, V> IntoIterator for &'a PersistentMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests;
