use super::*;
use crate::rbtree::tests::{dump, height, validate};
use quickcheck_macros::quickcheck;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use std::{collections::BTreeMap, prelude::v1::*, sync::Arc, thread};

impl<K: Ord, V> RbMap<K, V> {
    fn validate(&self) {
        let count = validate(&self.records, &self.root, K::cmp);
        assert_eq!(count, self.len());
    }
}

#[quickcheck]
fn qc_map(cmds: Vec<u8>) {
    let mut cmds = cmds.into_iter();
    let mut map = RbMap::new();
    let mut expected = BTreeMap::new();

    log::info!("Command: {:?}", cmds);

    (|| -> Option<()> {
        while let Some(cmd) = cmds.next() {
            let key = cmds.next()?;
            match cmd % 4 {
                0 => {
                    log::debug!("Insert {:?}", key);
                    let result = map.insert(key, cmd).map(|value| *value);
                    if expected.contains_key(&key) {
                        assert_eq!(result, Err(Error::DuplicateKey));
                    } else {
                        assert_eq!(result, Ok(cmd));
                        expected.insert(key, cmd);
                    }
                }
                1 => {
                    log::debug!("Upsert {:?}", key);
                    assert_eq!(map.upsert(key, cmd), expected.insert(key, cmd));
                }
                2 => {
                    log::debug!("Remove {:?}", key);
                    assert_eq!(map.remove(&key).ok(), expected.remove(&key));
                }
                _ => {
                    assert_eq!(map.get(&key), expected.get(&key));
                    assert_eq!(map.contains_key(&key), expected.contains_key(&key));
                }
            }

            {
                let mut st = String::new();
                dump(&map.records, map.root.node(), 1, &mut st).unwrap();
                log::trace!("Tree = \n{}", st);
            }

            map.validate();
            assert_eq!(map.len(), expected.len());
            assert!(map.iter().eq(expected.iter()));
            assert!(map.iter().rev().eq(expected.iter().rev()));
        }

        Some(())
    })();
}

#[quickcheck]
fn qc_range(keys: Vec<u8>, start: u8, end: u8) {
    let map: RbMap<_, _> = keys.iter().map(|&k| (k, ())).collect();
    let expected: BTreeMap<_, _> = keys.iter().map(|&k| (k, ())).collect();

    let (start, end) = (start.min(end), start.max(end));
    assert!(map.range(start..end).eq(expected.range(start..end)));
    assert!(map.range(start..=end).eq(expected.range(start..=end)));
    assert!(map.range(..end).eq(expected.range(..end)));
    assert!(map.range(start..).eq(expected.range(start..)));
    assert!(map.range(start..end).rev().eq(expected.range(start..end).rev()));
    assert!(map
        .range((Bound::Excluded(start), Bound::Included(end)))
        .eq(expected.range((Bound::Excluded(start), Bound::Included(end)))));
}

#[test]
fn insert_rejects_duplicates() {
    let mut map = RbMap::new();
    *map.insert("a", 1).unwrap() += 10;
    assert_eq!(map.insert("a", 2), Err(Error::DuplicateKey));
    assert_eq!(map.get("a"), Some(&11));
    assert_eq!(map.len(), 1);
    map.validate();
}

#[test]
fn upsert_keeps_position() {
    let mut map: RbMap<_, _> = (0..10).map(|i| (i, i)).collect();
    assert_eq!(map.upsert(5, 50), Some(5));
    assert_eq!(map.upsert(10, 100), None);
    assert_eq!(map.get(&5), Some(&50));
    assert_eq!(map.keys().cloned().collect::<Vec<_>>(), (0..=10).collect::<Vec<_>>());
    map.validate();
}

#[test]
fn remove_reports_missing_keys() {
    let mut map: RbMap<_, _> = [(10, "x"), (20, "y")].into_iter().collect();
    assert_eq!(map.remove(&15), Err(Error::NotFound));
    assert_eq!(map.remove_entry(&20), Ok((20, "y")));
    assert_eq!(map.remove(&20), Err(Error::NotFound));
    assert_eq!(map.len(), 1);
    map.validate();
}

#[test]
fn borrowed_lookup() {
    let mut map = RbMap::new();
    map.insert(String::from("beta"), 2).unwrap();
    map.insert(String::from("alpha"), 1).unwrap();

    assert_eq!(map.get("alpha"), Some(&1));
    *map.get_mut("beta").unwrap() += 1;
    assert_eq!(map.get_key_value("beta"), Some((&String::from("beta"), &3)));
    assert_eq!(map.remove("alpha"), Ok(1));
    assert!(!map.contains_key("alpha"));
}

#[test]
fn first_last_and_pop() {
    let mut map: RbMap<_, _> = [3, 1, 4, 5, 9, 2, 6].into_iter().map(|k| (k, k * 10)).collect();
    assert_eq!(map.first_key_value(), Some((&1, &10)));
    assert_eq!(map.last_key_value(), Some((&9, &90)));

    assert_eq!(map.pop_first(), Some((1, 10)));
    assert_eq!(map.pop_last(), Some((9, 90)));
    map.validate();
    assert_eq!(map.values().cloned().collect::<Vec<_>>(), [20, 30, 40, 50, 60]);

    map.clear();
    assert!(map.is_empty());
    assert_eq!(map.pop_first(), None);
    assert_eq!(map.first_key_value(), None);
}

#[test]
fn empty_and_inverted_ranges() {
    let map: RbMap<_, _> = (0..20).step_by(2).map(|k| (k, ())).collect();
    assert_eq!(map.range(5..5).count(), 0);
    assert_eq!(map.range(5..6).count(), 0);
    assert_eq!(map.range(7..3).count(), 0);
    assert_eq!(map.range(100..).count(), 0);
    assert_eq!(map.range(..0).count(), 0);
    assert_eq!(
        map.range(3..=8).map(|(k, _)| *k).collect::<Vec<_>>(),
        [4, 6, 8]
    );
}

#[test]
fn freed_slots_are_reused() {
    let mut map = RbMap::with_capacity(4);
    for i in 0..4 {
        map.insert(i, i).unwrap();
    }
    map.remove(&1).unwrap();
    map.remove(&2).unwrap();
    map.insert(7, 7).unwrap();
    map.insert(8, 8).unwrap();
    assert_eq!(map.insert(8, 8), Err(Error::DuplicateKey));

    assert_eq!(map.records.slots.len(), 5);
    assert_eq!(map.len(), 4);
    map.validate();
}

#[test]
fn debug_format() {
    let map: RbMap<_, _> = [(2, 'b'), (1, 'a')].into_iter().collect();
    assert_eq!(std::format!("{:?}", map), "{1: 'a', 2: 'b'}");
}

#[test]
fn ascending_insertion_stays_balanced() {
    let mut map = RbMap::new();
    for i in 0..1000u32 {
        map.insert(i, ()).unwrap();
    }
    map.validate();
    // 2 * log2(1001) = 19.93
    assert!(height(&map.records, map.root.node()) <= 19);
}

#[test]
fn random_insert_remove() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut map = RbMap::new();
    let mut expected = BTreeMap::new();

    for _ in 0..2000 {
        let key: u16 = rng.gen_range(0..300);
        if rng.gen_bool(0.6) {
            assert_eq!(map.upsert(key, key), expected.insert(key, key));
        } else {
            assert_eq!(map.remove(&key).ok(), expected.remove(&key));
        }
    }
    map.validate();
    assert!(map.iter().eq(expected.iter()));

    let mut keys: Vec<_> = expected.keys().cloned().collect();
    keys.shuffle(&mut rng);
    for key in keys {
        assert_eq!(map.remove(&key), Ok(key));
    }
    assert!(map.is_empty());
    assert!(map.root.is_empty());
}

/// The map doesn't synchronize by itself; an external lock provides the
/// readers-writer discipline.
#[test]
fn shared_behind_rwlock() {
    let map = Arc::new(parking_lot::RwLock::new(RbMap::new()));

    let writers: Vec<_> = (0..4u32)
        .map(|t| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for i in 0..100 {
                    map.write().insert(t * 100 + i, t).unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let readers: Vec<_> = (0..4u32)
        .map(|t| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                let map = map.read();
                for i in 0..100 {
                    assert_eq!(map.get(&(t * 100 + i)), Some(&t));
                }
                map.len()
            })
        })
        .collect();
    for reader in readers {
        assert_eq!(reader.join().unwrap(), 400);
    }

    map.read().validate();
}
