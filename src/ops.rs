//! The type descriptor: the typed callback set every [`crate::HashTable`] is
//! generic over, mirroring the spec's `hash`/`key_compare`/`element_get_key`/
//! `element_destructor`/`get_metadata_size`/`rehashing_started`/
//! `rehashing_completed`/`instant_rehashing` callback table.
//!
//! Every callback except the two rehashing hooks has a sensible default, so
//! a minimal implementor need only provide `Element`, `Key` and `key_of`.

use crate::hash;
use std::hash::Hash;

/// Callback set a [`crate::HashTable`] is generic over. The container never
/// inspects an element except through these methods.
pub trait TableOps: Sized {
    /// The opaque, pointer-sized value stored in each slot.
    type Element;
    /// The key extracted from an element and used for lookup/equality.
    type Key: ?Sized + Eq + Hash;

    /// Extracts the key from a stored element. If keys and elements
    /// coincide, implement this as `elem` itself (see the `Element = Key`
    /// blanket pattern in the crate-level docs).
    fn key_of(elem: &Self::Element) -> &Self::Key;

    /// Hashes a key to 64 bits. Defaults to this crate's non-cryptographic
    /// [`hash::hash_one`]; override for an attacker-resistant function.
    fn hash(key: &Self::Key) -> u64 {
        hash::hash_one(key)
    }

    /// Compares two keys for equality. Defaults to `PartialEq`.
    fn eq(a: &Self::Key, b: &Self::Key) -> bool {
        a == b
    }

    /// Runs when an element is removed via `delete` or overwritten via
    /// `replace`. Not called by `pop`, which hands the element back to the
    /// caller instead. Defaults to an ordinary drop.
    fn destroy(_elem: Self::Element) {}

    /// Size, in bytes, of caller-reserved metadata appended to the
    /// container's allocation. Defaults to none.
    fn metadata_size() -> usize {
        0
    }

    /// Called once when a resize begins allocating the second table.
    fn rehashing_started(_new_bucket_count: usize) {}

    /// Called once when the rehash sweep completes and the old table is
    /// freed.
    fn rehashing_completed() {}

    /// When `true`, resizes always rehash synchronously to completion
    /// rather than incrementally, regardless of the process-wide resize
    /// policy. Used by callers who know the table is never under
    /// copy-on-write pressure (e.g. a purely in-memory auxiliary index).
    const INSTANT_REHASHING: bool = false;
}
