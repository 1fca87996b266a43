//! Random element selection.
//!
//! Two flavors, trading uniformity for cost: [`HashTable::random_element`]
//! ("weak" random) picks one occupied bucket at a random cursor and returns
//! whatever it finds there first, biased toward elements in sparsely
//! chained buckets; [`HashTable::fair_random_element`] resamples until it
//! actually lands on an occupied slot, which is uniform over elements (not
//! buckets) at the cost of an unbounded — though practically short — retry
//! loop. [`HashTable::sample_elements`] builds a fixed-size sample out of
//! single-bucket [`crate::scan::ScanFlags::SINGLE_STEP`] scans from
//! independently-chosen cursors.

use crate::container::HashTable;
use crate::ops::TableOps;
use crate::scan::ScanFlags;
use rand::Rng;

impl<O: TableOps> HashTable<O> {
    /// Returns an arbitrary element, or `None` if the table is empty.
    /// Cheap — a single randomly-chosen bucket, with a bounded forward
    /// probe if that bucket happens to be empty — but biased toward
    /// elements that share a bucket with few others.
    pub fn random_element(&mut self) -> Option<&O::Element> {
        if self.is_empty() {
            return None;
        }
        self.step_rehash_if_due(false);
        let mut rng = rand::thread_rng();
        let table_idx = if self.is_rehashing() {
            rng.gen_range(0..2usize)
        } else {
            0
        };
        let table_idx = if self.tables[table_idx].is_empty_table() {
            1 - table_idx
        } else {
            table_idx
        };
        let mask = self.tables[table_idx].mask();
        let start = rng.gen::<usize>() & mask;
        let mut b = start;
        loop {
            if let Some(slot) = self.tables[table_idx].bucket(b).occupied_slots().next() {
                return Some(self.tables[table_idx].bucket(b).get(slot));
            }
            b = (b + 1) & mask;
            if b == start {
                return None;
            }
        }
    }

    /// Returns an element chosen uniformly at random among all elements
    /// currently present, by resampling bucket indices until one is
    /// occupied. Returns `None` only if the table is empty.
    pub fn fair_random_element(&mut self) -> Option<&O::Element> {
        if self.is_empty() {
            return None;
        }
        let mut rng = rand::thread_rng();
        loop {
            let table_idx = if self.is_rehashing() {
                rng.gen_range(0..2usize)
            } else {
                0
            };
            if self.tables[table_idx].is_empty_table() {
                continue;
            }
            let mask = self.tables[table_idx].mask();
            let cursor = rng.gen::<usize>() & mask;
            let bucket = self.tables[table_idx].bucket(cursor);
            let count = bucket.occupied_count();
            if count == 0 {
                continue;
            }
            let which = rng.gen_range(0..count);
            let slot = bucket
                .occupied_slots()
                .nth(which as usize)
                .expect("occupied_count and occupied_slots must agree");
            return Some(self.tables[table_idx].bucket(cursor).get(slot));
        }
    }

    /// Collects `min(n, len())` distinct elements: first via repeated
    /// single-bucket scans from independently-chosen cursors (cheap, and
    /// sufficient in practice), then — only if that random phase fell short,
    /// e.g. because the table is sparse and most draws landed on empty
    /// buckets — a deterministic full sweep from cursor 0 to make up the
    /// rest, so the result count never depends on how the random draws
    /// happened to land.
    pub fn sample_elements(&mut self, n: usize) -> Vec<&O::Element>
    where
        O::Key: Clone + std::hash::Hash + Eq,
    {
        let target = n.min(self.len());
        let mut seen = std::collections::HashSet::new();
        let mut out_keys = Vec::with_capacity(target);
        let budget = n.saturating_mul(10).max(1);
        let mut rng = rand::thread_rng();
        for _ in 0..budget {
            if out_keys.len() >= target {
                break;
            }
            let cursor = rng.gen::<usize>();
            self.scan(cursor, ScanFlags::SINGLE_STEP, |elem| {
                let key = O::key_of(elem).clone();
                if seen.insert(key.clone()) && out_keys.len() < target {
                    out_keys.push(key);
                }
            });
        }
        if out_keys.len() < target {
            let mut cursor = 0usize;
            loop {
                cursor = self.scan(cursor, ScanFlags::NONE, |elem| {
                    let key = O::key_of(elem).clone();
                    if seen.insert(key.clone()) && out_keys.len() < target {
                        out_keys.push(key);
                    }
                });
                if cursor == 0 || out_keys.len() >= target {
                    break;
                }
            }
        }
        out_keys
            .into_iter()
            .filter_map(|k| {
                let (t, b, s) = self.locate_readonly(&k)?;
                Some(self.tables[t].bucket(b).get(s))
            })
            .collect()
    }
}
