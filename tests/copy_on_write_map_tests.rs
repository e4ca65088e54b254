//! Unit and concurrency tests for the copy-on-write maps.

use lazycow::cow::{Comparator, HashCopyOnWriteMap, Snapshot, TreeCopyOnWriteMap};
use lazycow::error::CacheError;
use rstest::rstest;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

// =============================================================================
// Basic Construction Tests
// =============================================================================

#[rstest]
fn test_new_creates_empty_maps() {
    let hash: HashCopyOnWriteMap<String, i32> = HashCopyOnWriteMap::new();
    let tree: TreeCopyOnWriteMap<i32, String> = TreeCopyOnWriteMap::default();
    assert!(hash.is_empty());
    assert_eq!(tree.len(), 0);
    assert_eq!(tree.first_key(), None);
}

#[rstest]
fn test_from_iterator_tree_is_sorted() {
    let tree: TreeCopyOnWriteMap<i32, &str> =
        [(3, "c"), (1, "a"), (2, "b")].into_iter().collect();
    assert_eq!(tree.keys().collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(tree.to_string(), "{1: a, 2: b, 3: c}");
}

#[rstest]
fn test_hash_iterates_in_insertion_order() {
    let hash: HashCopyOnWriteMap<&str, i32> = HashCopyOnWriteMap::new();
    hash.put("zulu", 1);
    hash.put("alpha", 2);
    hash.put("mike", 3);
    hash.put("zulu", 4);
    assert_eq!(
        hash.entries().collect::<Vec<_>>(),
        vec![("zulu", 4), ("alpha", 2), ("mike", 3)]
    );
}

// =============================================================================
// Write Tests
// =============================================================================

#[rstest]
fn test_put_returns_previous_value() {
    let map: TreeCopyOnWriteMap<i32, &str> = TreeCopyOnWriteMap::new();
    assert_eq!(map.put(1, "one"), None);
    assert_eq!(map.put(1, "uno"), Some("one"));
    assert_eq!(map.get(&1), Some("uno"));
}

#[rstest]
fn test_remove_returns_value() {
    let map: HashCopyOnWriteMap<i32, i32> = [(1, 10), (2, 20)].into_iter().collect();
    assert_eq!(map.remove(&1), Some(10));
    assert_eq!(map.remove(&1), None);
    assert!(!map.contains_key(&1));
    assert!(map.contains_value(&20));
}

#[rstest]
fn test_put_all_publishes_once() {
    let map: TreeCopyOnWriteMap<i32, i32> = TreeCopyOnWriteMap::new();
    let before = map.snapshot();
    map.put_all((0..5).map(|key| (key, key * key)));
    assert!(before.is_empty());
    assert_eq!(map.len(), 5);
    assert_eq!(map.get(&4), Some(16));
}

#[rstest]
fn test_replace_by_discards_previous_contents() {
    let map: TreeCopyOnWriteMap<i32, i32> = (0..3).map(|key| (key, key)).collect();
    map.replace_by([(10, 10), (11, 11)]);
    assert_eq!(map.keys().collect::<Vec<_>>(), vec![10, 11]);
}

#[rstest]
fn test_clear_keeps_comparator() {
    let map: TreeCopyOnWriteMap<i32, i32> =
        TreeCopyOnWriteMap::with_comparator(Comparator::natural().reversed());
    map.put(1, 1);
    map.clear();
    assert!(map.is_empty());
    map.put_all([(1, 1), (3, 3), (2, 2)]);
    assert_eq!(map.keys().collect::<Vec<_>>(), vec![3, 2, 1]);
}

#[rstest]
fn test_published_snapshot_is_not_mutated() {
    let map: HashCopyOnWriteMap<i32, i32> = [(1, 1)].into_iter().collect();
    let snapshot = map.snapshot();
    map.put(2, 2);
    map.remove(&1);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.get(&1), Some(&1));
    assert!(!snapshot.contains_key(&2));
}

#[rstest]
fn test_entries_ignore_later_writes() {
    let map: TreeCopyOnWriteMap<i32, i32> = (1..=3).map(|key| (key, key)).collect();
    let entries = map.entries();
    map.clear();
    assert_eq!(entries.count(), 3);
}

// =============================================================================
// Equality and Display Tests
// =============================================================================

#[rstest]
fn test_equality_delegates_to_snapshot() {
    let left: HashCopyOnWriteMap<i32, i32> = [(1, 1), (2, 2)].into_iter().collect();
    let right: HashCopyOnWriteMap<i32, i32> = [(2, 2), (1, 1)].into_iter().collect();
    assert_eq!(left, right);
    assert_eq!(left, *right.snapshot());
    right.put(3, 3);
    assert_ne!(left, right);
}

#[rstest]
fn test_tree_display_and_debug() {
    let map: TreeCopyOnWriteMap<&str, i32> = [("b", 2), ("a", 1)].into_iter().collect();
    assert_eq!(map.to_string(), "{a: 1, b: 2}");
    assert_eq!(format!("{map:?}"), r#"{"a": 1, "b": 2}"#);
}

// =============================================================================
// Navigation Tests
// =============================================================================

#[rstest]
fn test_first_and_last_entries() {
    let map: TreeCopyOnWriteMap<i32, char> = [(5, 'e'), (1, 'a'), (9, 'i')].into_iter().collect();
    assert_eq!(map.first_entry(), Some((1, 'a')));
    assert_eq!(map.last_entry(), Some((9, 'i')));
}

#[rstest]
#[case(4, Some((3, 30)), Some((5, 50)))]
#[case(3, Some((3, 30)), Some((3, 30)))]
#[case(0, None, Some((1, 10)))]
fn test_floor_and_ceiling_entries(
    #[case] target: i32,
    #[case] floor: Option<(i32, i32)>,
    #[case] ceiling: Option<(i32, i32)>,
) {
    let map: TreeCopyOnWriteMap<i32, i32> = [1, 3, 5].iter().map(|&key| (key, key * 10)).collect();
    assert_eq!(map.floor_entry(&target), floor);
    assert_eq!(map.ceiling_entry(&target), ceiling);
}

#[rstest]
fn test_pop_is_unsupported() {
    let map: TreeCopyOnWriteMap<i32, i32> = [(1, 1)].into_iter().collect();
    assert_eq!(
        map.pop_first(),
        Err(CacheError::UnsupportedOperation("pop_first"))
    );
    assert_eq!(
        map.tail_map(0, true).pop_last(),
        Err(CacheError::UnsupportedOperation("pop_last"))
    );
    assert_eq!(map.len(), 1);
}

#[rstest]
fn test_views_are_pinned_to_their_snapshot() {
    let map: TreeCopyOnWriteMap<i32, i32> = (1..=5).map(|key| (key, key)).collect();
    let head = map.head_map(3, true);
    map.remove(&2);
    map.put(0, 0);
    assert_eq!(head.keys().collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(map.head_map(3, true).keys().collect::<Vec<_>>(), vec![0, 1, 3]);
}

#[rstest]
fn test_from_sorted_keeps_view_order() {
    let source: TreeCopyOnWriteMap<i32, i32> = (1..=4).map(|key| (key, key)).collect();
    let copy = TreeCopyOnWriteMap::from_sorted(&source.descending_map());
    assert_eq!(copy.keys().collect::<Vec<_>>(), vec![4, 3, 2, 1]);
    copy.put(5, 5);
    assert_eq!(copy.first_key(), Some(5));
}

#[rstest]
fn test_navigable_key_set() {
    let map: TreeCopyOnWriteMap<i32, ()> = [2, 4, 6].into_iter().map(|key| (key, ())).collect();
    let keys = map.navigable_key_set();
    assert_eq!(keys.len(), 3);
    assert_eq!(keys.floor(&5), Some(4));
    assert_eq!(keys.higher(&6), None);
    assert_eq!(keys.descending_set().iter().collect::<Vec<_>>(), vec![6, 4, 2]);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[rstest]
fn test_replace_by_is_atomic_for_readers() {
    let before: BTreeSet<i32> = (0..100).collect();
    let after: BTreeSet<i32> = (1000..1050).collect();
    let map: Arc<TreeCopyOnWriteMap<i32, i32>> =
        Arc::new(before.iter().map(|&key| (key, key)).collect());
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let map = Arc::clone(&map);
        let done = Arc::clone(&done);
        let (before, after) = (before.clone(), after.clone());
        thread::spawn(move || {
            let mut observed = 0;
            while !done.load(Ordering::Acquire) {
                let keys: BTreeSet<i32> = map.snapshot().iter().map(|(key, _)| *key).collect();
                assert!(keys == before || keys == after, "observed a partial snapshot");
                observed += 1;
            }
            observed
        })
    };

    for round in 0..200 {
        let source = if round % 2 == 0 { &after } else { &before };
        map.replace_by(source.iter().map(|&key| (key, key)));
    }
    done.store(true, Ordering::Release);

    assert!(reader.join().expect("Reader panicked") > 0);
    assert_eq!(map.snapshot().iter().map(|(key, _)| *key).collect::<BTreeSet<_>>(), before);
}

#[rstest]
fn test_concurrent_puts_are_both_published() {
    let map: Arc<HashCopyOnWriteMap<String, i32>> = Arc::new(HashCopyOnWriteMap::new());
    let empty = map.snapshot();

    let writers: Vec<_> = [("a", 1), ("b", 2)]
        .into_iter()
        .map(|(key, value)| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                map.put(key.to_string(), value);
            })
        })
        .collect();
    for writer in writers {
        writer.join().expect("Writer panicked");
    }

    let expected: HashCopyOnWriteMap<String, i32> =
        [("a".to_string(), 1), ("b".to_string(), 2)].into_iter().collect();
    assert_eq!(*map, expected);
    assert!(empty.is_empty());
}

#[rstest]
fn test_many_writers_lose_no_updates() {
    let map: Arc<TreeCopyOnWriteMap<usize, usize>> = Arc::new(TreeCopyOnWriteMap::new());
    let writers: Vec<_> = (0..8)
        .map(|writer| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for offset in 0..50 {
                    let key = writer * 50 + offset;
                    map.put(key, key);
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().expect("Writer panicked");
    }
    assert_eq!(map.len(), 400);
    assert_eq!(map.first_key(), Some(0));
    assert_eq!(map.last_key(), Some(399));
}
