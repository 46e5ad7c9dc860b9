use crate::collections::bst_map::*;
use crate::error::Error;

const N: usize = if cfg!(miri) { 100 } else { 10000 };

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sample() -> BstMap<i32, i32> {
    let mut map = BstMap::new();
    for k in [5, 3, 8, 1, 4, 7, 9] {
        assert!(map.insert(k, k * 10));
    }
    map
}

fn ascending<K: Ord + Copy, V>(map: &BstMap<K, V>) -> Vec<K> {
    let mut keys = Vec::new();
    map.for_each(|k, _| keys.push(*k));
    keys
}

/// Checks the search tree property and the length, without using cursors.
fn check<K: Ord + Copy, V>(map: &BstMap<K, V>) {
    let keys = ascending(map);
    assert!(keys.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(keys.len(), map.len());
    assert_eq!(map.keys().count(), map.len());
    for k in &keys {
        assert!(map.contains_key(k));
    }
}

#[test]
fn preorder_and_inorder_test() {
    let map = sample();
    let pre: Vec<i32> = map.keys().copied().collect();
    assert_eq!(pre, [5, 3, 1, 4, 8, 7, 9]);
    assert_eq!(ascending(&map), [1, 3, 4, 5, 7, 8, 9]);
    let iter: Vec<i32> = map.iter().map(|(k, _)| *k).collect();
    assert_eq!(iter, [1, 3, 4, 5, 7, 8, 9]);
    let rev: Vec<i32> = map.iter().rev().map(|(k, _)| *k).collect();
    assert_eq!(rev, [9, 8, 7, 5, 4, 3, 1]);
}

#[test]
fn layered_test() {
    let map = sample();
    let mut seen = Vec::new();
    map.for_each_layered(|k, v, depth| {
        assert_eq!(*v, *k * 10);
        seen.push((*k, depth));
    });
    assert_eq!(
        seen,
        [(5, 0), (3, 1), (8, 1), (1, 2), (4, 2), (7, 2), (9, 2)]
    );
    assert_eq!(map.height(), 3);
}

#[test]
fn for_each_mut_test() {
    let mut map = sample();
    map.for_each_mut(|k, v| *v = *k + 1);
    map.for_each(|k, v| assert_eq!(*v, *k + 1));
    map.for_each_layered_mut(|_, v, depth| *v = depth as i32);
    assert_eq!(map[&5], 0);
    assert_eq!(map[&8], 1);
    assert_eq!(map[&9], 2);
}

#[test]
fn duplicate_insert_test() {
    let mut map = BstMap::new();
    assert!(map.insert("a", 1));
    assert!(!map.insert("a", 2));
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("a"), Some(&1));
}

#[test]
fn erase_two_children_test() {
    init_logging();
    let mut map = BstMap::new();
    for k in [10, 5, 15, 3, 7, 12, 18] {
        map.insert(k, k.to_string());
    }
    assert!(map.erase(&10));
    assert!(!map.contains_key(&10));
    assert_eq!(map.len(), 6);
    assert_eq!(ascending(&map), [3, 5, 7, 12, 15, 18]);
    // The successor's key moved into the root node.
    assert_eq!(map.keys().next(), Some(&12));
    assert_eq!(map.get(&12).map(String::as_str), Some("12"));
    check(&map);
}

#[test]
fn erase_cases_test() {
    init_logging();
    let mut map = sample();
    assert!(!map.erase(&6));
    assert_eq!(map.len(), 7);

    // Leaf.
    assert_eq!(map.remove(&1), Some(10));
    // One child (3 now has only 4).
    assert_eq!(map.remove_entry(&3), Some((3, 30)));
    assert_eq!(map.keys().copied().collect::<Vec<_>>(), [5, 4, 8, 7, 9]);
    // Root with two children, successor is a leaf.
    assert!(map.erase(&5));
    assert_eq!(map.keys().copied().collect::<Vec<_>>(), [7, 4, 8, 9]);
    // Successor with a right child is spliced out.
    assert!(map.erase(&7));
    assert_eq!(map.keys().copied().collect::<Vec<_>>(), [8, 4, 9]);
    check(&map);
    for k in [8, 4, 9] {
        assert!(map.erase(&k));
    }
    assert!(map.is_empty());
    assert_eq!(map.height(), 0);
    assert!(map.begin() == map.end());
}

#[test]
fn random_ops_test() {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let mut map = BstMap::new();
    let mut oracle = std::collections::BTreeMap::new();
    let (mut inserted, mut erased) = (0, 0);
    for _ in 0..N {
        let k: u16 = rng.gen_range(0..1000);
        if rng.gen_bool(0.6) {
            let ok = map.insert(k, k);
            assert_eq!(ok, !oracle.contains_key(&k));
            oracle.entry(k).or_insert(k);
            inserted += usize::from(ok);
        } else {
            let ok = map.erase(&k);
            assert_eq!(ok, oracle.remove(&k).is_some());
            erased += usize::from(ok);
        }
        assert_eq!(map.len(), inserted - erased);
    }
    check(&map);
    assert!(map.iter().eq(oracle.iter()));
}

#[test]
fn at_test() {
    let mut map = sample();
    assert_eq!(map.at(&4), Ok(&40));
    assert_eq!(map.at(&6), Err(Error::KeyNotFound));
    *map.at_mut(&4).unwrap() = 41;
    assert_eq!(map[&4], 41);
    assert_eq!(map.at_mut(&6).err(), Some(Error::KeyNotFound));
    assert!(!Error::KeyNotFound.is_invalid_state());
}

#[test]
#[should_panic(expected = "no entry found for key")]
fn index_missing_test() {
    let map = sample();
    let _v = &map[&6];
}

#[test]
fn get_or_default_test() {
    let mut map: BstMap<&str, usize> = BstMap::new();
    for w in "the cat and the hat".split(' ') {
        *map.get_or_default(w) += 1;
    }
    assert_eq!(map.len(), 4);
    assert_eq!(map["the"], 2);
    assert_eq!(map["cat"], 1);
}

#[test]
fn cursor_walk_test() {
    let map = sample();
    let mut c = map.begin();
    for _ in 0..map.len() {
        assert!(!c.is_end());
        c.advance().unwrap();
    }
    assert!(c == map.end());

    let mut c = map.rbegin();
    let mut keys = Vec::new();
    for _ in 0..map.len() {
        keys.push(*c.key().unwrap());
        c.advance().unwrap();
    }
    assert!(c == map.rend());
    assert_eq!(keys, [9, 8, 7, 5, 4, 3, 1]);
}

#[test]
fn cursor_round_trip_test() {
    let map: BstMap<usize, usize> = (0..100).map(|i| ((i * 37) % 100, i)).collect();
    check(&map);
    let mut c = map.begin();
    while !c.is_end() {
        let mut d = c.clone();
        d.advance().unwrap();
        d.retreat().unwrap();
        assert!(d == c);
        c.advance().unwrap();
    }
    let mut c = map.rbegin();
    while !c.is_end() {
        let mut d = c.clone();
        d.advance().unwrap();
        d.retreat().unwrap();
        assert!(d == c);
        c.advance().unwrap();
    }
}

#[test]
fn cursor_bounds_test() {
    let map = sample();

    let mut c = map.begin();
    assert_eq!(c.retreat(), Err(Error::BeforeBegin));
    assert_eq!(c.key(), Ok(&1));

    let mut c = map.end();
    assert_eq!(c.get(), Err(Error::EndPosition));
    assert_eq!(c.advance(), Err(Error::PastEnd));
    assert!(c.advance().unwrap_err().is_invalid_state());
    c.retreat().unwrap();
    assert_eq!(c.key(), Ok(&9));

    let mut c = map.rbegin();
    assert_eq!(c.retreat(), Err(Error::BeforeBegin));
    let mut c = map.rend();
    assert_eq!(c.advance(), Err(Error::PastEnd));
    c.retreat().unwrap();
    assert_eq!(c.key(), Ok(&1));

    // Running off the end and coming back returns to the last element.
    let mut c = map.find(&8);
    c.advance().unwrap();
    c.advance().unwrap();
    assert!(c.is_end());
    c.retreat().unwrap();
    assert_eq!(c.key(), Ok(&9));

    let empty: BstMap<i32, i32> = BstMap::new();
    assert!(empty.begin() == empty.end());
    assert_eq!(empty.end().retreat(), Err(Error::BeforeBegin));
}

#[test]
fn find_test() {
    let map = sample();
    let c = map.find(&4);
    assert_eq!(c.get(), Ok((&4, &40)));
    assert_eq!(map.last_visits(), 3);
    let mut c = map.find(&6);
    assert!(c == map.end());
    assert_eq!(c.retreat(), Err(Error::BeforeBegin));

    // Walking from a found position uses the path recorded by find.
    let mut c = map.find(&4);
    c.advance().unwrap();
    assert_eq!(c.key(), Ok(&5));
    c.retreat().unwrap();
    c.retreat().unwrap();
    assert_eq!(c.key(), Ok(&3));
}

#[test]
fn cursor_order_test() {
    let map = sample();
    let a = map.find(&3);
    let b = map.find(&7);
    assert!(a < b);
    assert!(b < map.end());
    assert!(map.end() <= map.end());

    let mut r = map.rbegin();
    let first = r.clone();
    r.advance().unwrap();
    assert!(first < r);
    assert!(r < map.rend());
    assert_eq!(a.partial_cmp(&r), None);

    let other = sample();
    assert!(map.find(&3) != other.find(&3));
    assert_eq!(map.find(&3).partial_cmp(&other.find(&3)), None);
}

#[test]
fn cursor_mut_test() {
    let mut map = sample();
    let mut c = map.begin_mut();
    while !c.is_end() {
        let (k, v) = c.get_mut().unwrap();
        *v = *k * 100;
        c.advance().unwrap();
    }
    assert_eq!(c.get_mut().err(), Some(Error::EndPosition));
    c.retreat().unwrap();
    assert_eq!(c.get(), Ok((&9, &900)));
    assert!(c.as_cursor().key() == Ok(&9));

    let mut c = map.rbegin_mut();
    c.advance().unwrap();
    *c.get_mut().unwrap().1 = 0;
    assert_eq!(c.direction(), Direction::Reverse);
    assert_eq!(map[&8], 0);

    let (_, v) = map.find_mut(&3).into_mut().unwrap();
    *v = 3;
    assert_eq!(map[&3], 3);
    assert!(map.find_mut(&6).is_end());
    assert!(map.end_mut().retreat().is_ok());
    assert!(map.rend_mut().is_end());
}

#[test]
fn iter_test() {
    let mut map = sample();
    let mut it = map.iter();
    assert_eq!(it.len(), 7);
    assert_eq!(it.next(), Some((&1, &10)));
    assert_eq!(it.next_back(), Some((&9, &90)));
    assert_eq!(it.len(), 5);
    let middle: Vec<i32> = it.map(|(k, _)| *k).collect();
    assert_eq!(middle, [3, 4, 5, 7, 8]);

    for (k, v) in &mut map {
        *v = -*k;
    }
    let mut it = map.iter_mut();
    let (_, v) = it.next_back().unwrap();
    *v = 0;
    assert_eq!(it.count(), 6);
    assert_eq!(map[&9], 0);
    assert_eq!(map[&1], -1);
}

#[test]
fn degenerate_test() {
    init_logging();
    let n = N;
    let mut map = BstMap::new();
    for i in 0..n {
        map.insert(i, i);
    }
    assert_eq!(map.height(), n);
    assert!(map.contains_key(&(n - 1)));
    assert_eq!(map.last_visits(), n);
    assert_eq!(map.iter().count(), n);
    assert_eq!(map.rbegin().key(), Ok(&(n - 1)));
    print_memory();
    map.clear();
    assert!(map.is_empty());
    assert_eq!(map.height(), 0);
    for i in 0..n {
        map.insert(n - i, i);
    }
    // Dropping a long chain must not recurse.
    drop(map);
}

#[test]
fn last_visits_test() {
    let mut map = sample();
    assert!(map.insert(6, 60));
    assert_eq!(map.last_visits(), 3);
    assert!(!map.insert(5, 0));
    assert_eq!(map.last_visits(), 1);
    assert!(map.contains_key(&9));
    assert_eq!(map.last_visits(), 3);
    assert!(!map.contains_key(&2));
    assert_eq!(map.last_visits(), 3);
}

#[test]
fn clone_test() {
    let map = sample();
    let mut copy = map.clone();
    assert!(copy == map);
    assert!(copy.keys().eq(map.keys()));
    copy.erase(&5);
    assert_eq!(copy.len(), 6);
    assert_eq!(map.len(), 7);
    assert!(copy != map);

    let moved = copy;
    assert_eq!(moved.len(), 6);
    let mut taken = std::mem::take(&mut BstMap::from([(1, 'a'), (2, 'b')]));
    assert_eq!(taken.len(), 2);
    taken.clear();
    assert!(taken.is_empty());
}

#[test]
fn from_extend_test() {
    let mut map = BstMap::from([(2, "b"), (1, "a"), (2, "z")]);
    assert_eq!(map.len(), 2);
    assert_eq!(map[&2], "b");
    map.extend([(3, "c"), (1, "y")]);
    assert_eq!(map.first_key_value(), Some((&1, &"a")));
    assert_eq!(map.last_key_value(), Some((&3, &"c")));
    assert_eq!(format!("{map:?}"), r#"{1: "a", 2: "b", 3: "c"}"#);
}

#[test]
#[cfg(feature = "serde")]
fn serde_test() {
    let mut map = BstMap::new();
    for i in 0..N as u32 {
        map.insert((i * 7919) % N as u32, 1u8);
    }
    let ser = bincode::serialize(&map).unwrap();
    let back: BstMap<u32, u8> = bincode::deserialize(&ser).unwrap();
    assert!(back == map);
    assert!(back.keys().eq(map.keys()));
    assert_eq!(back.height(), map.height());
}

#[test]
/// Not really a test, just prints the size of various types.
fn sizes() {
    type K = u64;
    type V = u64;
    println!("size of Node={}", std::mem::size_of::<Node<K, V>>());
    println!("size of BstMap={}", std::mem::size_of::<BstMap<K, V>>());
    println!("size of Cursor={}", std::mem::size_of::<Cursor<'static, K, V>>());
}
