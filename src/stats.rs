//! Size accounting and bucket-chain introspection.
//!
//! Unlike the teacher's debug-only `CHTRuntimeLog` (gated behind
//! `cfg(debug_assertions)`), the spec lists stats as a first-class exposed
//! component, so these are always-on, cheap-to-compute snapshots rather than
//! a debug aid: every number here is derived from state the table already
//! tracks (`used`, `exponent`, per-bucket presence/ever-full bits), nothing
//! is counted incrementally on the hot path.

use crate::cursor::prev_cursor;
use crate::table::Table;

/// A snapshot of one internal table's occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    pub num_buckets: usize,
    pub total_slots: usize,
    pub used: usize,
    pub everfull_buckets: usize,
    /// `chain_histogram[n]` = number of primary buckets whose probe chain
    /// (walking ever-full buckets) is exactly `n` buckets long before
    /// reaching a non-ever-full bucket.
    pub chain_histogram: Vec<usize>,
}

impl TableStats {
    pub fn fill_ratio(&self) -> f64 {
        if self.total_slots == 0 {
            0.0
        } else {
            self.used as f64 / self.total_slots as f64
        }
    }
}

/// A snapshot of both internal tables plus whether a rehash is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub size: usize,
    pub rehashing: bool,
    pub main: TableStats,
    pub rehash_target: TableStats,
}

pub(crate) fn table_stats<T>(table: &Table<T>) -> TableStats {
    let num_buckets = table.num_buckets();
    let mut everfull_buckets = 0usize;
    let mut chain_histogram = Vec::new();
    for i in 0..num_buckets {
        let bucket = table.bucket(i);
        if bucket.is_everfull() {
            everfull_buckets += 1;
        }
    }
    if num_buckets > 0 {
        let mask = num_buckets - 1;
        // A bucket's probe chain is the run of ever-full buckets a lookup
        // walks past before reaching it, in cursor order (the order probing
        // actually advances in, not linear index order). Attribute the run
        // length to the non-ever-full bucket that terminates it.
        for i in 0..num_buckets {
            if !table.bucket(i).is_everfull() {
                let mut len = 1usize;
                let mut j = prev_cursor(i, mask);
                while j != i && table.bucket(j).is_everfull() {
                    len += 1;
                    j = prev_cursor(j, mask);
                }
                if chain_histogram.len() <= len {
                    chain_histogram.resize(len + 1, 0);
                }
                chain_histogram[len] += 1;
            }
        }
    }
    TableStats {
        num_buckets,
        total_slots: table.total_slots(),
        used: table.used(),
        everfull_buckets,
        chain_histogram,
    }
}
