//! The container: two tables, a rehash cursor, and the pause semaphores.
//!
//! This module implements lookup, insertion, deletion, the two-phase
//! insert/pop protocol, resize planning and the incremental rehasher.
//! Scanning, iteration and sampling are implemented as further `impl`
//! blocks over the same type, in their own modules (mirroring the way the
//! teacher splits a single logical type's API across `mod.rs`, `iter.rs`,
//! `access.rs` and `patch.rs`).

use crate::bucket::Bucket;
use crate::cursor::{next_cursor, prev_cursor};
use crate::error::{ExpandOutcome, TableError};
use crate::ops::TableOps;
use crate::policy::{resize_policy, ResizePolicy};
use crate::position::Position;
use crate::stats::{table_stats, Stats};
use crate::table::{Table, MIN_EXPONENT};
use std::marker::PhantomData;

// fill ratios, expressed as whole-percent numerators over a denominator of 100
const SOFT_MAX_FILL_NUM: usize = 77;
const HARD_MAX_FILL_NUM: usize = 90;
const SOFT_MIN_FILL_NUM: usize = 13;
const HARD_MIN_FILL_NUM: usize = 3;

/// Either the vacant slot an insert would land in, or the element already
/// occupying it. Returned by [`HashTable::find_position_for_insert`].
pub enum InsertLookup<'a, E> {
    Vacant(Position),
    Occupied(&'a E),
}

/// Either a freshly-inserted element, or the element that was already
/// present (in which case nothing changed). Returned by
/// [`HashTable::add_or_find`].
pub enum AddOrFind<'a, E> {
    Inserted,
    Existing(&'a E),
}

/// A cache-line-conscious open-addressing hash table with incremental
/// rehashing and a stateless, cursor-based scan.
///
/// Generic over [`TableOps`], the callback set describing how to extract a
/// key from an element, hash and compare keys, and tear an element down.
/// Scheduling is single-threaded and cooperative: callers are expected to
/// serialize access, matching the crate's stated non-goal of thread-safe
/// concurrent mutation.
pub struct HashTable<O: TableOps> {
    pub(crate) tables: [Table<O::Element>; 2],
    /// Next source bucket to rehash, in cursor order; `-1` when not
    /// rehashing.
    pub(crate) rehash_idx: isize,
    pub(crate) pause_rehash: u32,
    pub(crate) pause_auto_shrink: u32,
    _marker: PhantomData<O>,
}

impl<O: TableOps> HashTable<O> {
    pub fn new() -> Self {
        HashTable {
            tables: [Table::empty(), Table::empty()],
            rehash_idx: -1,
            pause_rehash: 0,
            pause_auto_shrink: 0,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tables[0].used() + self.tables[1].used()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub(crate) fn is_rehashing(&self) -> bool {
        self.rehash_idx >= 0
    }

    #[inline]
    fn write_table_idx(&self) -> usize {
        if self.is_rehashing() {
            1
        } else {
            0
        }
    }

    pub fn stats(&self) -> Stats {
        Stats {
            size: self.len(),
            rehashing: self.is_rehashing(),
            main: table_stats(&self.tables[0]),
            rehash_target: table_stats(&self.tables[1]),
        }
    }

    // ---- lookup -----------------------------------------------------

    pub fn find(&mut self, key: &O::Key) -> Option<&O::Element> {
        self.step_rehash_if_due(false);
        let (t, b, s) = self.locate_readonly(key)?;
        Some(self.tables[t].bucket(b).get(s))
    }

    pub fn contains_key(&mut self, key: &O::Key) -> bool {
        self.find(key).is_some()
    }

    /// Pure lookup, no rehash-step side effect — used by the stepping
    /// logic itself and by callers that already stepped.
    pub(crate) fn locate_readonly(&self, key: &O::Key) -> Option<(usize, usize, usize)> {
        let hash = O::hash(key);
        if self.is_rehashing() {
            // destination table first: typically sparser, so fewer
            // ever-full buckets to probe through.
            if let Some((b, s)) = self.probe_find(1, hash, key) {
                return Some((1, b, s));
            }
            if let Some((b, s)) = self.probe_find(0, hash, key) {
                return Some((0, b, s));
            }
            None
        } else {
            self.probe_find(0, hash, key).map(|(b, s)| (0, b, s))
        }
    }

    fn probe_find(&self, table_idx: usize, hash: u64, key: &O::Key) -> Option<(usize, usize)> {
        let table = &self.tables[table_idx];
        if table.is_empty_table() {
            return None;
        }
        let mask = table.mask();
        let fp = (hash >> 56) as u8;
        let mut cursor = (hash as usize) & mask;
        let mut steps = 0usize;
        loop {
            let bucket = table.bucket(cursor);
            for slot in bucket.occupied_slots() {
                if bucket.fingerprint(slot) == fp {
                    let elem = bucket.get(slot);
                    if O::eq(O::key_of(elem), key) {
                        return Some((cursor, slot));
                    }
                }
            }
            if !bucket.is_everfull() {
                return None;
            }
            steps += 1;
            if steps > mask {
                // visited every bucket in the table without stopping;
                // defensive bound, should be unreachable given the
                // ever-full discipline.
                return None;
            }
            cursor = next_cursor(cursor, mask);
        }
    }

    fn find_bucket_for_insert(&mut self, table_idx: usize, primary: usize) -> (usize, usize) {
        let mask = self.tables[table_idx].mask();
        let mut cursor = primary;
        let mut steps = 0usize;
        loop {
            if let Some(slot) = self.tables[table_idx].bucket(cursor).first_empty_slot() {
                return (cursor, slot);
            }
            debug_assert!(self.tables[table_idx].bucket(cursor).is_everfull());
            steps += 1;
            assert!(
                steps <= mask + 1,
                "no empty slot found in a full sweep of the table; the fill-ratio invariant was violated"
            );
            cursor = next_cursor(cursor, mask);
        }
    }

    // ---- rehashing ----------------------------------------------------

    /// Runs one rehash step when the process-wide policy and the operation
    /// kind call for it: every call under `Allow`, writes only under
    /// `Avoid`, never under `Forbid` or while paused.
    pub(crate) fn step_rehash_if_due(&mut self, is_write: bool) {
        if self.pause_rehash > 0 || !self.is_rehashing() {
            return;
        }
        let due = match resize_policy() {
            ResizePolicy::Forbid => false,
            ResizePolicy::Allow => true,
            ResizePolicy::Avoid => is_write,
        };
        if due {
            self.rehash_step();
        }
    }

    fn fast_forward_rehash(&mut self) {
        while self.is_rehashing() {
            self.rehash_step();
        }
    }

    fn rehash_step(&mut self) {
        debug_assert!(self.is_rehashing());
        let src_idx = self.rehash_idx as usize;
        let src_mask = self.tables[0].mask();
        let shrinking = self.tables[1].num_buckets() < self.tables[0].num_buckets();
        let reuse_hash = shrinking && {
            let pred = prev_cursor(src_idx, src_mask);
            !self.tables[0].bucket(pred).is_everfull()
        };

        let occupied: Vec<usize> = self.tables[0].bucket(src_idx).occupied_slots().collect();
        for slot in occupied {
            let fp = self.tables[0].bucket(src_idx).fingerprint(slot);
            let dest_mask = self.tables[1].mask();
            let dest_primary = if reuse_hash {
                src_idx & dest_mask
            } else {
                let elem = self.tables[0].bucket(src_idx).get(slot);
                let key = O::key_of(elem);
                (O::hash(key) as usize) & dest_mask
            };
            let (dbucket, dslot) = self.find_bucket_for_insert(1, dest_primary);
            let elem = self.tables[0].bucket_mut(src_idx).take(slot);
            self.tables[1].bucket_mut(dbucket).place(dslot, fp, elem);
            self.tables[0].decr_used();
            self.tables[1].incr_used();
        }
        // the bucket is fully drained; this is the one point where the
        // ever-full tombstone is allowed to clear.
        self.tables[0].bucket_mut(src_idx).clear_everfull();

        let next = next_cursor(src_idx, src_mask);
        if next == 0 {
            let buckets = self.tables[1].num_buckets();
            let used = self.tables[1].used();
            log::debug!("rehash complete: {buckets} buckets, {used} elements");
            O::rehashing_completed();
            // `take` already leaves `tables[1]` empty; the old, by-now
            // fully-drained `tables[0]` is simply dropped here.
            self.tables[0] = self.tables[1].take();
            self.rehash_idx = -1;
        } else {
            self.rehash_idx = next as isize;
        }
    }

    // ---- resize planning ------------------------------------------------

    fn target_num_buckets(capacity: usize) -> usize {
        let epb = Bucket::<O::Element>::CAPACITY;
        let denom = epb * SOFT_MAX_FILL_NUM;
        let needed = (capacity.saturating_mul(100) + denom - 1) / denom;
        needed
            .max(1)
            .next_power_of_two()
            .max(1usize << MIN_EXPONENT)
    }

    fn begin_resize_to(&mut self, wanted_buckets: usize) -> bool {
        let exponent = wanted_buckets.trailing_zeros() as i8;
        match Table::try_with_exponent(exponent) {
            Some(t) => {
                let from = self.tables[0].num_buckets();
                log::trace!("beginning resize: {from} -> {wanted_buckets} buckets");
                self.tables[1] = t;
                self.rehash_idx = 0;
                O::rehashing_started(self.tables[1].num_buckets());
                if O::INSTANT_REHASHING {
                    self.fast_forward_rehash();
                }
                true
            }
            None => {
                log::warn!("failed to allocate {wanted_buckets} buckets for resize");
                false
            }
        }
    }

    /// Attempts to ensure the table can hold at least `min_capacity`
    /// elements without exceeding the soft fill limit. Resolves the
    /// ambiguity noted against the source's `hashtabExpand` (which
    /// conflated "already large enough" with "exponent unchanged") by
    /// returning the two cases the caller actually needs to distinguish,
    /// with allocation failure carried as `Err` instead of a third variant.
    pub fn try_expand(&mut self, min_capacity: usize) -> Result<ExpandOutcome, TableError> {
        let wanted = Self::target_num_buckets(min_capacity);
        if self.tables[0].is_empty_table() {
            let exponent = wanted.trailing_zeros() as i8;
            return match Table::try_with_exponent(exponent) {
                Some(t) => {
                    self.tables[0] = t;
                    Ok(ExpandOutcome::Grew)
                }
                None => Err(TableError::AllocFailed),
            };
        }
        if self.is_rehashing() {
            self.fast_forward_rehash();
        }
        if wanted <= self.tables[0].num_buckets() {
            return Ok(ExpandOutcome::AlreadyAdequate);
        }
        if self.begin_resize_to(wanted) {
            Ok(ExpandOutcome::Grew)
        } else {
            Err(TableError::AllocFailed)
        }
    }

    /// Like [`Self::try_expand`], but treats allocation failure as fatal —
    /// the same policy the auto-resize paths driven by insert/delete use.
    pub fn expand(&mut self, min_capacity: usize) {
        self.try_expand(min_capacity)
            .expect("allocation failure while expanding the hash table");
    }

    pub fn expand_if_needed(&mut self) {
        let policy = resize_policy();
        let max_fill_num = if policy == ResizePolicy::Avoid {
            HARD_MAX_FILL_NUM
        } else {
            SOFT_MAX_FILL_NUM
        };
        let active = self.write_table_idx();
        let cap = self.tables[active].total_slots();
        let size_after = self.len() + 1;
        let needs_resize = cap == 0 || size_after * 100 > max_fill_num * cap;
        if needs_resize {
            self.try_expand(size_after)
                .expect("allocation failure while auto-expanding the hash table");
        }
    }

    pub fn shrink_if_needed(&mut self) {
        if self.is_rehashing() || self.pause_auto_shrink > 0 {
            return;
        }
        let policy = resize_policy();
        if policy == ResizePolicy::Forbid {
            return;
        }
        let min_fill_num = if policy == ResizePolicy::Avoid {
            HARD_MIN_FILL_NUM
        } else {
            SOFT_MIN_FILL_NUM
        };
        let cap = self.tables[0].total_slots();
        if cap == 0 {
            return;
        }
        let used0 = self.tables[0].used();
        if used0 * 100 < min_fill_num * cap {
            let wanted = Self::target_num_buckets(used0.max(1));
            if wanted >= self.tables[0].num_buckets() {
                return;
            }
            let from = self.tables[0].num_buckets();
            log::trace!("shrinking: fill {used0}/{cap} below {min_fill_num}%, {from} -> {wanted} buckets");
            if !self.begin_resize_to(wanted) {
                panic!("allocation failure while auto-shrinking the hash table");
            }
        }
    }

    // ---- pause semaphores ----------------------------------------------

    pub fn pause_rehashing(&mut self) {
        self.pause_rehash += 1;
    }

    pub fn resume_rehashing(&mut self) {
        assert!(
            self.pause_rehash > 0,
            "resume_rehashing called without a matching pause_rehashing"
        );
        self.pause_rehash -= 1;
    }

    pub fn pause_auto_shrink(&mut self) {
        self.pause_auto_shrink += 1;
    }

    pub fn resume_auto_shrink(&mut self) {
        assert!(
            self.pause_auto_shrink > 0,
            "resume_auto_shrink called without a matching pause_auto_shrink"
        );
        self.pause_auto_shrink -= 1;
    }

    // ---- writes ----------------------------------------------------------

    fn insert_new(&mut self, hash: u64, elem: O::Element) {
        self.expand_if_needed();
        let table_idx = self.write_table_idx();
        let mask = self.tables[table_idx].mask();
        let primary = (hash as usize) & mask;
        let (bucket_idx, slot) = self.find_bucket_for_insert(table_idx, primary);
        let fp = (hash >> 56) as u8;
        self.tables[table_idx]
            .bucket_mut(bucket_idx)
            .place(slot, fp, elem);
        self.tables[table_idx].incr_used();
    }

    /// Inserts `elem` if its key is not already present. Returns `false`
    /// (and drops `elem` via its ordinary `Drop`, not [`TableOps::destroy`],
    /// since it was never held by the table) if the key already exists.
    pub fn add(&mut self, elem: O::Element) -> bool {
        self.step_rehash_if_due(true);
        let key = O::key_of(&elem);
        let hash = O::hash(key);
        if self.locate_readonly(key).is_some() {
            return false;
        }
        self.insert_new(hash, elem);
        true
    }

    /// Inserts `elem` if absent; otherwise returns the existing element
    /// without touching it.
    pub fn add_or_find(&mut self, elem: O::Element) -> AddOrFind<'_, O::Element> {
        self.step_rehash_if_due(true);
        let key = O::key_of(&elem);
        let hash = O::hash(key);
        if let Some((t, b, s)) = self.locate_readonly(key) {
            return AddOrFind::Existing(self.tables[t].bucket(b).get(s));
        }
        self.insert_new(hash, elem);
        AddOrFind::Inserted
    }

    /// Inserts `elem`, running [`TableOps::destroy`] on any existing
    /// key-equal element first. Returns `true` if this was a fresh insert,
    /// `false` if an existing element was replaced.
    pub fn replace(&mut self, elem: O::Element) -> bool {
        self.step_rehash_if_due(true);
        let key = O::key_of(&elem);
        let hash = O::hash(key);
        if let Some((t, b, s)) = self.locate_readonly(key) {
            let old = self.tables[t].bucket_mut(b).take(s);
            O::destroy(old);
            let fp = (hash >> 56) as u8;
            self.tables[t].bucket_mut(b).place(s, fp, elem);
            false
        } else {
            self.insert_new(hash, elem);
            true
        }
    }

    /// Removes and returns the element for `key`, without running
    /// [`TableOps::destroy`] — the caller now owns it.
    pub fn pop(&mut self, key: &O::Key) -> Option<O::Element> {
        self.step_rehash_if_due(true);
        let (t, b, s) = self.locate_readonly(key)?;
        let elem = self.tables[t].bucket_mut(b).take(s);
        self.tables[t].decr_used();
        self.shrink_if_needed();
        Some(elem)
    }

    /// Removes the element for `key`, running [`TableOps::destroy`] on it.
    /// Returns whether anything was removed.
    pub fn delete(&mut self, key: &O::Key) -> bool {
        self.step_rehash_if_due(true);
        let Some((t, b, s)) = self.locate_readonly(key) else {
            return false;
        };
        let elem = self.tables[t].bucket_mut(b).take(s);
        self.tables[t].decr_used();
        O::destroy(elem);
        self.shrink_if_needed();
        true
    }

    // ---- two-phase protocols ---------------------------------------------

    /// Locates `key` and pauses rehashing so the returned [`Position`]
    /// stays valid until [`Self::two_phase_pop_delete`] resumes it. No
    /// other operation may run on the table in between.
    pub fn two_phase_pop_find(&mut self, key: &O::Key) -> Option<(&O::Element, Position)> {
        self.step_rehash_if_due(false);
        let (t, b, s) = self.locate_readonly(key)?;
        let fp = self.tables[t].bucket(b).fingerprint(s);
        self.pause_rehash += 1;
        let pos = Position::encode(t, b, s, fp);
        Some((self.tables[t].bucket(b).get(s), pos))
    }

    /// Completes a two-phase pop: removes the element named by `pos`
    /// (without running [`TableOps::destroy`] — same contract as [`Self::pop`])
    /// and resumes rehashing.
    pub fn two_phase_pop_delete(&mut self, pos: Position) -> O::Element {
        let (t, b, s, _fp) = pos.decode();
        let elem = self.tables[t].bucket_mut(b).take(s);
        self.tables[t].decr_used();
        assert!(
            self.pause_rehash > 0,
            "two_phase_pop_delete called without a matching two_phase_pop_find"
        );
        self.pause_rehash -= 1;
        self.shrink_if_needed();
        elem
    }

    /// Locates the slot a fresh key would occupy, pre-writing its
    /// fingerprint so [`Self::insert_at_position`] never has to re-hash.
    /// The contract forbids any intervening table operation, including a
    /// read that might trigger a rehash step — that would invalidate the
    /// token.
    pub fn find_position_for_insert(&mut self, key: &O::Key) -> InsertLookup<'_, O::Element> {
        self.step_rehash_if_due(true);
        let hash = O::hash(key);
        if let Some((t, b, s)) = self.locate_readonly(key) {
            return InsertLookup::Occupied(self.tables[t].bucket(b).get(s));
        }
        self.expand_if_needed();
        let table_idx = self.write_table_idx();
        let mask = self.tables[table_idx].mask();
        let primary = (hash as usize) & mask;
        let (bucket_idx, slot) = self.find_bucket_for_insert(table_idx, primary);
        let fp = (hash >> 56) as u8;
        self.tables[table_idx]
            .bucket_mut(bucket_idx)
            .prewrite_fingerprint(slot, fp);
        InsertLookup::Vacant(Position::encode(table_idx, bucket_idx, slot, fp))
    }

    /// Completes a two-phase insert at a token from
    /// [`Self::find_position_for_insert`].
    pub fn insert_at_position(&mut self, pos: Position, elem: O::Element) {
        let (t, b, s, fp) = pos.decode();
        self.tables[t].bucket_mut(b).place(s, fp, elem);
        self.tables[t].incr_used();
    }

    // ---- bulk teardown -----------------------------------------------

    /// Destroys every element (running [`TableOps::destroy`] on each) and
    /// frees both internal tables. The only long-running operation this
    /// crate exposes; `progress` is invoked every 65,536 buckets visited.
    pub fn clear_with_progress(&mut self, mut progress: impl FnMut(usize)) {
        self.destroy_all(&mut progress);
    }

    pub fn clear(&mut self) {
        self.destroy_all(&mut |_| {});
    }

    fn destroy_all(&mut self, progress: &mut dyn FnMut(usize)) {
        let mut buckets_done = 0usize;
        for t in 0..2 {
            let n = self.tables[t].num_buckets();
            for i in 0..n {
                let slots: Vec<usize> = self.tables[t].bucket(i).occupied_slots().collect();
                for s in slots {
                    let elem = self.tables[t].bucket_mut(i).take(s);
                    O::destroy(elem);
                }
                buckets_done += 1;
                if buckets_done % 65536 == 0 {
                    progress(buckets_done);
                }
            }
        }
        self.tables[0] = Table::empty();
        self.tables[1] = Table::empty();
        self.rehash_idx = -1;
    }
}

impl<O: TableOps> Default for HashTable<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: TableOps> Drop for HashTable<O> {
    fn drop(&mut self) {
        self.destroy_all(&mut |_| {});
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct IntTable;
    impl TableOps for IntTable {
        type Element = Box<u64>;
        type Key = u64;
        fn key_of(elem: &Box<u64>) -> &u64 {
            elem
        }
    }

    /// P3: the fingerprint byte stored alongside an occupied slot is always
    /// the top byte of that element's full hash, for every slot in both
    /// tables, including mid-rehash.
    #[test]
    fn stored_fingerprint_matches_top_byte_of_hash() {
        let mut t = HashTable::<IntTable>::new();
        for k in 0..2000u64 {
            t.add(Box::new(k));
        }
        t.expand(4096);
        for k in 0..2000u64 {
            let (ti, b, s) = t.locate_readonly(&k).expect("key must be found");
            let expected = (IntTable::hash(&k) >> 56) as u8;
            assert_eq!(
                t.tables[ti].bucket(b).fingerprint(s),
                expected,
                "fingerprint mismatch for key {k}"
            );
        }
    }
}
