//! Process-wide resize policy and hash seed.
//!
//! These two pieces of state are process-wide rather than container-scoped
//! because they track process-level events: the resize policy tracks the
//! fork lifecycle of a snapshotting child, and the hash seed is chosen once
//! at process start. Every [`crate::HashTable`] reads the same values; an
//! implementation could make either container-scoped instead without
//! changing observable behavior, provided every container agrees.
//!
//! Realized with plain atomics rather than a `parking_lot` mutex: both
//! values are read on (nearly) every table operation and never held across
//! any blocking section, so a lock-free load is strictly cheaper and fits
//! the single-threaded-cooperative model the rest of the crate assumes.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Global policy governing when a table is allowed to migrate elements
/// between its two internal tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResizePolicy {
    /// One rehash step runs per read; writes also step if one is in progress.
    Allow = 0,
    /// Rehashing only proceeds one step at a time, driven by writes, and
    /// only once the hard fill limit forces it. Used while a snapshot child
    /// is sharing pages copy-on-write, to avoid dirtying them via migration.
    Avoid = 1,
    /// No incremental rehashing occurs at all; resizes still happen, but a
    /// resize first fast-forwards any in-flight rehash synchronously.
    Forbid = 2,
}

impl ResizePolicy {
    const fn from_u8(v: u8) -> Self {
        match v {
            0 => ResizePolicy::Allow,
            1 => ResizePolicy::Avoid,
            _ => ResizePolicy::Forbid,
        }
    }
}

static POLICY: AtomicU8 = AtomicU8::new(ResizePolicy::Allow as u8);
static SEED_LO: AtomicU64 = AtomicU64::new(0x9E37_79B9_7F4A_7C15);
static SEED_HI: AtomicU64 = AtomicU64::new(0x517C_C1B7_2722_0A95);

/// Sets the process-wide resize policy. Expected to be called by the
/// process supervising the fork lifecycle (e.g. entering `Avoid` just
/// before forking a snapshot child, `Allow` again once it exits).
pub fn set_resize_policy(policy: ResizePolicy) {
    POLICY.store(policy as u8, Ordering::SeqCst);
}

/// Reads the current process-wide resize policy.
pub fn resize_policy() -> ResizePolicy {
    ResizePolicy::from_u8(POLICY.load(Ordering::SeqCst))
}

/// Sets the 16-byte seed mixed into the default hash function's initial
/// state. Has no effect on tables whose [`crate::TableOps::hash`] override
/// ignores it.
pub fn set_hash_function_seed(seed: [u8; 16]) {
    let mut lo = [0u8; 8];
    let mut hi = [0u8; 8];
    lo.copy_from_slice(&seed[..8]);
    hi.copy_from_slice(&seed[8..]);
    SEED_LO.store(u64::from_ne_bytes(lo), Ordering::SeqCst);
    SEED_HI.store(u64::from_ne_bytes(hi), Ordering::SeqCst);
}

/// Reads the current 16-byte hash seed.
pub fn get_hash_function_seed() -> [u8; 16] {
    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&SEED_LO.load(Ordering::SeqCst).to_ne_bytes());
    out[8..].copy_from_slice(&SEED_HI.load(Ordering::SeqCst).to_ne_bytes());
    out
}

pub(crate) fn hash_seed_words() -> (u64, u64) {
    (
        SEED_LO.load(Ordering::SeqCst),
        SEED_HI.load(Ordering::SeqCst),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_round_trips() {
        let seed = [7u8; 16];
        set_hash_function_seed(seed);
        assert_eq!(get_hash_function_seed(), seed);
        // restore defaults so other tests in this process aren't affected
        set_hash_function_seed({
            let mut s = [0u8; 16];
            s[..8].copy_from_slice(&0x9E37_79B9_7F4A_7C15u64.to_ne_bytes());
            s[8..].copy_from_slice(&0x517C_C1B7_2722_0A95u64.to_ne_bytes());
            s
        });
    }

    #[test]
    fn policy_round_trips() {
        set_resize_policy(ResizePolicy::Avoid);
        assert_eq!(resize_policy(), ResizePolicy::Avoid);
        set_resize_policy(ResizePolicy::Allow);
        assert_eq!(resize_policy(), ResizePolicy::Allow);
    }
}
