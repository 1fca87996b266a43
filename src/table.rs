//! A single table: a contiguous array of buckets plus its size accounting.
//!
//! The container always holds two of these (`main` and `rehash_target`).
//! An empty table is represented by `exponent == -1` and no allocated
//! buckets, matching the spec's lifecycle: the container is created with
//! both tables empty, and the first insertion allocates table 0 at the
//! minimum bucket count.

use crate::bucket::Bucket;

pub(crate) const MIN_EXPONENT: i8 = 2; // 4 buckets minimum once allocated

pub(crate) struct Table<T> {
    buckets: Vec<Bucket<T>>,
    exponent: i8,
    used: usize,
}

impl<T> Table<T> {
    pub(crate) fn empty() -> Self {
        Table {
            buckets: Vec::new(),
            exponent: -1,
            used: 0,
        }
    }

    pub(crate) fn with_exponent(exponent: i8) -> Self {
        debug_assert!(exponent >= 0);
        let n = 1usize << exponent;
        let mut buckets = Vec::with_capacity(n);
        buckets.resize_with(n, Bucket::empty);
        Table {
            buckets,
            exponent,
            used: 0,
        }
    }

    /// Fallible allocation path: returns `None` instead of aborting when the
    /// allocator can't satisfy the request, so callers can surface
    /// [`crate::TableError::AllocFailed`] instead of taking the process down.
    pub(crate) fn try_with_exponent(exponent: i8) -> Option<Self> {
        debug_assert!(exponent >= 0);
        let n = 1usize << exponent;
        let mut buckets = Vec::new();
        buckets.try_reserve_exact(n).ok()?;
        buckets.resize_with(n, Bucket::empty);
        Some(Table {
            buckets,
            exponent,
            used: 0,
        })
    }

    #[inline]
    pub(crate) fn is_empty_table(&self) -> bool {
        self.exponent < 0
    }

    #[inline]
    pub(crate) fn exponent(&self) -> i8 {
        self.exponent
    }

    #[inline]
    pub(crate) fn num_buckets(&self) -> usize {
        if self.exponent < 0 {
            0
        } else {
            1usize << self.exponent
        }
    }

    #[inline]
    pub(crate) fn mask(&self) -> usize {
        self.num_buckets().wrapping_sub(1)
    }

    #[inline]
    pub(crate) fn used(&self) -> usize {
        self.used
    }

    #[inline]
    pub(crate) fn total_slots(&self) -> usize {
        self.num_buckets() * Bucket::<T>::CAPACITY
    }

    #[inline]
    pub(crate) fn bucket(&self, idx: usize) -> &Bucket<T> {
        &self.buckets[idx]
    }

    #[inline]
    pub(crate) fn bucket_mut(&mut self, idx: usize) -> &mut Bucket<T> {
        &mut self.buckets[idx]
    }

    pub(crate) fn incr_used(&mut self) {
        self.used += 1;
    }

    pub(crate) fn decr_used(&mut self) {
        debug_assert!(self.used > 0);
        self.used -= 1;
    }

    /// Replaces this table with a fresh empty one, returning the old
    /// buckets so the caller can drop them (running element destructors via
    /// `Bucket`'s own `Drop`, if any remain — by the time this is called
    /// during a completed rehash sweep, none should).
    pub(crate) fn take(&mut self) -> Table<T> {
        std::mem::replace(self, Table::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_has_no_buckets() {
        let t = Table::<usize>::empty();
        assert!(t.is_empty_table());
        assert_eq!(t.num_buckets(), 0);
        assert_eq!(t.used(), 0);
    }

    #[test]
    fn allocated_table_sizes_match_exponent() {
        let t = Table::<usize>::with_exponent(3);
        assert_eq!(t.num_buckets(), 8);
        assert_eq!(t.mask(), 7);
    }
}
