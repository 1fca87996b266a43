//! End-to-end scenarios exercising the table as a whole, as opposed to the
//! per-module unit tests living alongside `src/*.rs`.

use kvtable::{AddOrFind, HashTable, InsertLookup, ResizePolicy, TableOps};
use rand::Rng;
use std::collections::HashSet;

struct IntSet;
impl TableOps for IntSet {
    type Element = Box<u64>;
    type Key = u64;
    fn key_of(elem: &Box<u64>) -> &u64 {
        elem
    }
}

/// Forces every key into bucket 0 regardless of table size, by zeroing out
/// all the low bits a mask could ever select.
struct CollidingSet;
impl TableOps for CollidingSet {
    type Element = Box<u64>;
    type Key = u64;
    fn key_of(elem: &Box<u64>) -> &u64 {
        elem
    }
    fn hash(key: &u64) -> u64 {
        key << 32
    }
}

#[test]
fn scenario_1_bulk_insert_and_odd_delete() {
    let mut t = HashTable::<IntSet>::new();
    for k in 1..=1000u64 {
        assert!(t.add(Box::new(k)));
    }
    for k in 1..=1000u64 {
        assert_eq!(*t.find(&k).unwrap(), k);
    }
    for k in (1..=1000u64).filter(|k| k % 2 == 1) {
        assert!(t.delete(&k));
    }
    assert_eq!(t.len(), 500);
    assert!(t.find(&2).is_some());
    assert!(t.find(&3).is_none());
}

#[test]
fn scenario_2_everfull_chain_and_drain() {
    let mut t = HashTable::<CollidingSet>::new();
    for k in 0..10u64 {
        assert!(t.add(Box::new(k)));
    }
    for k in 0..10u64 {
        assert_eq!(*t.find(&k).unwrap(), k);
    }
    let stats = t.stats();
    assert!(
        stats.main.everfull_buckets >= 1,
        "colliding inserts must leave at least one ever-full bucket behind"
    );
    for k in 0..10u64 {
        assert!(t.delete(&k));
    }
    for k in 0..10u64 {
        assert!(t.find(&k).is_none());
    }
}

#[test]
fn scenario_3_avoid_policy_defers_then_allow_resumes() {
    kvtable::set_resize_policy(ResizePolicy::Avoid);
    let mut t = HashTable::<IntSet>::new();
    // fill to roughly 80% of a small table: above the soft (~77%) limit
    // used under ALLOW, below the hard (~90%) limit used under AVOID.
    t.expand(32);
    let cap_before = t.stats().main.total_slots.max(t.stats().rehash_target.total_slots);
    let target = (cap_before * 80) / 100;
    for k in 0..target as u64 {
        t.add(Box::new(k));
    }
    assert!(
        !t.stats().rehashing,
        "under AVOID, 80% fill must not yet have triggered a resize"
    );

    kvtable::set_resize_policy(ResizePolicy::Allow);
    let before: HashSet<u64> = t.iter().map(|e| **e).collect();
    t.expand_if_needed();
    // drive any incremental rehash to completion via repeated finds
    for _ in 0..10_000 {
        if !t.stats().rehashing {
            break;
        }
        t.find(&0);
    }
    let after: HashSet<u64> = t.iter().map(|e| **e).collect();
    assert_eq!(before, after);

    kvtable::set_resize_policy(ResizePolicy::Allow);
}

#[test]
fn scenario_4_scan_survives_interleaved_mutation() {
    let mut t = HashTable::<IntSet>::new();
    for k in 0..200u64 {
        t.add(Box::new(k));
    }
    let mut counts = std::collections::HashMap::new();
    let mut cursor = 0usize;
    let mut round = 0;
    loop {
        cursor = t.scan(cursor, kvtable::ScanFlags::NONE, |e| {
            *counts.entry(**e).or_insert(0u32) += 1;
        });
        if round == 0 {
            for k in 200..250u64 {
                t.add(Box::new(k));
            }
            for k in 0..50u64 {
                t.delete(&k);
            }
        }
        round += 1;
        if cursor == 0 || round > 10_000 {
            break;
        }
    }
    for k in 50..200u64 {
        assert!(counts.get(&k).copied().unwrap_or(0) >= 1, "missing {k}");
    }
    for (&k, &c) in &counts {
        assert!(c <= 2, "key {k} emitted {c} times");
    }
}

#[test]
fn scenario_5_two_phase_insert() {
    let mut t = HashTable::<IntSet>::new();
    match t.find_position_for_insert(&42) {
        InsertLookup::Vacant(pos) => t.insert_at_position(pos, Box::new(42)),
        InsertLookup::Occupied(_) => panic!("42 should not exist yet"),
    }
    assert_eq!(*t.find(&42).unwrap(), 42);

    match t.find_position_for_insert(&42) {
        InsertLookup::Vacant(_) => panic!("42 already exists"),
        InsertLookup::Occupied(existing) => assert_eq!(**existing, 42),
    }
}

#[test]
fn scenario_6_unchecked_iteration_tolerates_in_place_replace() {
    let mut t = HashTable::<IntSet>::new();
    for k in 0..16u64 {
        t.add(Box::new(k));
    }
    let mut emitted = Vec::new();
    let mut it = unsafe { t.iter_unchecked() };
    while let Some(ptr) = it.next() {
        // SAFETY: no resize has happened since `iter_unchecked`, and we
        // only read before the replace below.
        let v: u64 = unsafe { **ptr };
        emitted.push(v);
        if emitted.len() == 3 {
            t.replace(Box::new(v));
        }
    }
    emitted.sort_unstable();
    emitted.dedup();
    assert_eq!(emitted.len(), 16);
}

#[test]
fn add_or_find_does_not_overwrite() {
    let mut t = HashTable::<IntSet>::new();
    t.add(Box::new(7));
    match t.add_or_find(Box::new(7)) {
        AddOrFind::Existing(v) => assert_eq!(**v, 7),
        AddOrFind::Inserted => panic!("7 already existed"),
    }
    assert_eq!(t.len(), 1);
}

#[test]
fn pop_returns_ownership_without_running_destroy() {
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counted(Rc<Cell<u32>>, u64);

    struct CountingSet;
    impl TableOps for CountingSet {
        type Element = Box<Counted>;
        type Key = u64;
        fn key_of(elem: &Box<Counted>) -> &u64 {
            &elem.1
        }
        fn destroy(elem: Box<Counted>) {
            elem.0.set(elem.0.get() + 1);
        }
    }

    let destroyed = Rc::new(Cell::new(0u32));
    let mut t = HashTable::<CountingSet>::new();
    t.add(Box::new(Counted(destroyed.clone(), 1)));
    t.add(Box::new(Counted(destroyed.clone(), 2)));

    let popped = t.pop(&1).unwrap();
    assert_eq!(popped.1, 1);
    assert_eq!(destroyed.get(), 0, "pop must not call destroy");

    assert!(t.delete(&2));
    assert_eq!(destroyed.get(), 1, "delete must call destroy exactly once");
}

/// P9: `sample_elements(N)` returns exactly `min(N, size())`, regardless of
/// how sparse the table is or how the random draws happen to land.
#[test]
fn sample_elements_matches_min_n_size() {
    let mut t = HashTable::<IntSet>::new();
    for k in 0..30u64 {
        t.add(Box::new(k));
    }
    assert_eq!(t.sample_elements(10).len(), 10);
    assert_eq!(t.sample_elements(100).len(), 30);

    let mut empty = HashTable::<IntSet>::new();
    assert_eq!(empty.sample_elements(5).len(), 0);
}

/// P4: the fill ratio of the live write-side table never exceeds the hard
/// upper limit, checked after every single add/delete in a mixed workload
/// (including across resizes and an in-progress rehash).
#[test]
fn fill_ratio_never_exceeds_hard_limit_after_any_operation() {
    const HARD_LIMIT: f64 = 0.90;
    let mut rng = rand::thread_rng();
    let mut t = HashTable::<IntSet>::new();
    for _ in 0..20_000 {
        let key = rng.gen_range(0..4_000u64);
        if rng.gen_bool(0.65) {
            t.add(Box::new(key));
        } else {
            t.delete(&key);
        }
        let stats = t.stats();
        assert!(
            stats.main.fill_ratio() <= HARD_LIMIT,
            "main table fill ratio {} exceeds hard limit",
            stats.main.fill_ratio()
        );
        assert!(
            stats.rehash_target.fill_ratio() <= HARD_LIMIT,
            "rehash target fill ratio {} exceeds hard limit",
            stats.rehash_target.fill_ratio()
        );
    }
}

/// P7: scanning an unmutated container with `iter_unchecked` emits every
/// element exactly once, distinct from the resize-detection and
/// in-place-mutation-tolerance behavior exercised elsewhere.
#[test]
fn unchecked_iteration_over_an_unmutated_table_emits_each_element_exactly_once() {
    let mut t = HashTable::<IntSet>::new();
    for k in 0..500u64 {
        t.add(Box::new(k));
    }
    let mut emitted = Vec::new();
    let mut it = unsafe { t.iter_unchecked() };
    while let Some(ptr) = it.next() {
        // SAFETY: no mutation happens anywhere in this loop.
        let v: u64 = unsafe { **ptr };
        emitted.push(v);
    }
    assert_eq!(emitted.len(), 500, "must emit every element exactly once");
    emitted.sort_unstable();
    emitted.dedup();
    assert_eq!(emitted.len(), 500, "must not emit any element more than once");
}

/// Property P1/P5 under a randomized add/delete workload: size always
/// matches the reference set, and every surviving key is still findable.
#[test]
fn fuzzed_add_delete_matches_reference_set() {
    let mut rng = rand::thread_rng();
    let mut t = HashTable::<IntSet>::new();
    let mut reference: HashSet<u64> = HashSet::new();

    for _ in 0..20_000 {
        let key = rng.gen_range(0..2_000u64);
        if rng.gen_bool(0.6) {
            let inserted = t.add(Box::new(key));
            assert_eq!(inserted, reference.insert(key));
        } else {
            let removed = t.delete(&key);
            assert_eq!(removed, reference.remove(&key));
        }
    }

    assert_eq!(t.len(), reference.len());
    for key in &reference {
        assert_eq!(*t.find(key).unwrap(), *key);
    }
}
