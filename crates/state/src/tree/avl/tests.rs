use super::*;
use proptest::prelude::*;
use std::collections::BTreeMap;

#[test]
fn test_insert_get_remove() {
    let empty: PersistentMap<u32, &str> = PersistentMap::new();
    let one = empty.insert(1, "a");
    let two = one.insert(2, "b");
    let replaced = two.insert(1, "c");

    assert!(empty.is_empty());
    assert_eq!(one.get(&1), Some(&"a"));
    assert_eq!(two.len(), 2);
    assert_eq!(replaced.get(&1), Some(&"c"));
    assert_eq!(two.get(&1), Some(&"a"), "older version must be untouched");

    let removed = replaced.remove(&1);
    assert_eq!(removed.len(), 1);
    assert!(!removed.contains_key(&1));
    assert_eq!(replaced.len(), 2);
}

#[test]
fn test_remove_missing_key_shares_root() {
    let map: PersistentMap<u32, u32> = (0..10).map(|i| (i, i)).collect();
    let same = map.remove(&42);
    assert!(same.ptr_eq(&map));
}

#[test]
fn test_sequential_inserts_stay_balanced() {
    let mut map = PersistentMap::new();
    for i in 0..1024u32 {
        map = map.insert(i, i * 2);
    }
    assert!(map.check_balance());
    // A balanced tree over 1024 keys has height at most 1.44 * log2(n).
    assert!(map.root.as_ref().map_or(0, |n| n.height) <= 15);
    assert_eq!(map.first(), Some((&0, &0)));
    assert_eq!(map.last(), Some((&1023, &2046)));
}

#[test]
fn test_equality_ignores_construction_order() {
    let a: PersistentMap<u8, u8> = [(1, 1), (2, 2), (3, 3)].into_iter().collect();
    let b: PersistentMap<u8, u8> = [(3, 3), (1, 1), (2, 2)].into_iter().collect();
    assert_eq!(a, b);
    assert_ne!(a, b.insert(2, 9));
}

proptest! {
    #[test]
    fn matches_btreemap(ops in proptest::collection::vec((any::<bool>(), 0u16..64, any::<u32>()), 0..300)) {
        let mut model = BTreeMap::new();
        let mut map = PersistentMap::new();
        let mut versions = Vec::new();
        for (is_insert, key, value) in ops {
            versions.push((map.clone(), model.clone()));
            if is_insert {
                model.insert(key, value);
                map = map.insert(key, value);
            } else {
                model.remove(&key);
                map = map.remove(&key);
            }
            prop_assert!(map.check_balance());
            prop_assert_eq!(map.len(), model.len());
        }
        let collected: Vec<_> = map.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<_> = model.into_iter().collect();
        prop_assert_eq!(collected, expected);

        // Every earlier version still reads back exactly as it was.
        for (old_map, old_model) in versions {
            let old: Vec<_> = old_map.iter().map(|(k, v)| (*k, *v)).collect();
            let want: Vec<_> = old_model.into_iter().collect();
            prop_assert_eq!(old, want);
        }
    }
}
