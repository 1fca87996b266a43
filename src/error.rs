//! Error types for the table's few genuinely fallible paths.
//!
//! Most of the vocabulary in the spec this crate implements ("key absent",
//! "key already present") is not an error at all — it's a plain `Option` or
//! `bool` result. The only real failure mode is allocator exhaustion during
//! a resize, and contract violations (a stale position token, a negative
//! pause counter, rehash accounting drift) are programmer errors reported
//! via `assert!`/`debug_assert!`, not `Result`.

/// The single real failure mode exposed by this crate's fallible entry
/// point, [`crate::HashTable::try_expand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TableError {
    /// Allocating the new table for a resize failed.
    AllocFailed,
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::AllocFailed => write!(f, "failed to allocate the resized table"),
        }
    }
}

impl std::error::Error for TableError {}

/// Result of a successful expand attempt. Resolves the spec's noted
/// ambiguity around `hashtabExpand`'s boolean return, which conflated
/// "already large enough" with "exponent unchanged": the two cases the
/// caller actually cares about are separate variants here, and allocation
/// failure is carried as the `Err` side of `try_expand`'s `Result` instead
/// of a third variant — the idiomatic split for something that either
/// succeeds in one of two ways or fails outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandOutcome {
    /// A new, larger table was allocated and incremental rehashing began.
    Grew,
    /// The table was already large enough; nothing changed.
    AlreadyAdequate,
}
