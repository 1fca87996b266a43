//! Stateless, cursor-based scanning.
//!
//! The cursor is just a bucket index in the reverse-bit order from
//! [`crate::cursor`]; the caller stores nothing between calls except the
//! `usize` handed back. Every element present in the table for the whole
//! duration of a full sweep (successive calls from `0` back to `0`) is
//! emitted at least once; an element that is rehashed into a different
//! bucket mid-sweep may be emitted twice, never more.

use crate::container::HashTable;
use crate::cursor::next_cursor;
use crate::ops::TableOps;

/// Bit flags controlling a single [`HashTable::scan`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanFlags(u32);

impl ScanFlags {
    pub const NONE: ScanFlags = ScanFlags(0);
    /// Disables probe-chain continuation: normally, if the bucket addressed
    /// by the cursor is ever-full, `scan` keeps advancing and emitting
    /// internally (within the same call) until it reaches a non-ever-full
    /// bucket, so a caller never has to know about the ever-full discipline
    /// to get the liveness guarantee. `SINGLE_STEP` disables that internal
    /// loop and returns after exactly one bucket's worth of work (or, while
    /// rehashing, one small-table bucket plus its corresponding run in the
    /// larger table) regardless of the ever-full bit — trading the liveness
    /// guarantee for a smaller, bounded per-call footprint. Used by
    /// sampling, which wants one bucket's worth of candidates per call, not
    /// full chain coverage.
    pub const SINGLE_STEP: ScanFlags = ScanFlags(1 << 0);

    #[inline]
    pub const fn contains(self, other: ScanFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ScanFlags {
    type Output = ScanFlags;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        ScanFlags(self.0 | rhs.0)
    }
}

impl<O: TableOps> HashTable<O> {
    /// Visits the bucket(s) addressed by `cursor` and returns the next
    /// cursor to pass in. A returned cursor of `0` means a full sweep has
    /// completed (the same convention `0` uses as a starting cursor, so a
    /// caller simply loops "call with 0, then with whatever comes back,
    /// until 0 comes back again").
    pub fn scan(
        &mut self,
        cursor: usize,
        flags: ScanFlags,
        mut emit: impl FnMut(&O::Element),
    ) -> usize {
        self.step_rehash_if_due(false);
        if self.tables[0].is_empty_table() {
            return 0;
        }
        let single_step = flags.contains(ScanFlags::SINGLE_STEP);
        let mut cursor = cursor;
        loop {
            let (next, addressed_everfull) = self.scan_one_step(cursor, single_step, &mut emit);
            cursor = next;
            // Step 4: an ever-full addressed bucket means there may be live
            // elements further along this probe chain that a caller relying
            // only on this cursor value would otherwise miss — keep going
            // within this same call rather than handing back a cursor that
            // would skip them if the caller never called `scan` again.
            // `SINGLE_STEP` opts out of this for a bounded per-call cost.
            // `cursor == 0` always stops: a full sweep has wrapped, and
            // looping further could re-emit without terminating.
            if single_step || !addressed_everfull || cursor == 0 {
                return cursor;
            }
        }
    }

    /// Performs one cursor step's worth of emission (the non-rehashing
    /// single-bucket visit, or the rehashing dual-table visit), returning
    /// the next cursor and whether the bucket addressed by `cursor` (the
    /// one whose ever-full bit governs continuation) was ever-full.
    fn scan_one_step(
        &mut self,
        cursor: usize,
        single_step: bool,
        emit: &mut dyn FnMut(&O::Element),
    ) -> (usize, bool) {
        if !self.is_rehashing() {
            let mask = self.tables[0].mask();
            let b = cursor & mask;
            for slot in self.tables[0]
                .bucket(b)
                .occupied_slots()
                .collect::<Vec<_>>()
            {
                emit(self.tables[0].bucket(b).get(slot));
            }
            let everfull = self.tables[0].bucket(b).is_everfull();
            return (next_cursor(cursor, mask), everfull);
        }

        let (small, large) = if self.tables[0].num_buckets() <= self.tables[1].num_buckets() {
            (0usize, 1usize)
        } else {
            (1usize, 0usize)
        };
        let m0 = self.tables[small].mask();
        let m1 = self.tables[large].mask();

        let v0 = cursor & m0;
        for slot in self.tables[small]
            .bucket(v0)
            .occupied_slots()
            .collect::<Vec<_>>()
        {
            emit(self.tables[small].bucket(v0).get(slot));
        }
        let addressed_everfull = self.tables[small].bucket(v0).is_everfull();

        if single_step {
            return (next_cursor(cursor, m0), addressed_everfull);
        }

        let mut v = cursor;
        loop {
            let v1 = v & m1;
            for slot in self.tables[large]
                .bucket(v1)
                .occupied_slots()
                .collect::<Vec<_>>()
            {
                emit(self.tables[large].bucket(v1).get(slot));
            }
            v = ((v | m0).wrapping_add(1) & !m0) | (v & m0);
            if v & (m0 ^ m1) == 0 {
                break;
            }
        }
        (next_cursor(cursor, m0), addressed_everfull)
    }
}
