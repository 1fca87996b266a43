//! A cache-line conscious open-addressing hash table.
//!
//! [`HashTable`] packs elements into 64-byte buckets (one cache line each)
//! using linear probing in a reverse-bit cursor order rather than the
//! insertion order a plain linear scan would give — the same order used by
//! [`HashTable::scan`], so a scan cursor and a probe position are
//! interchangeable concepts. Resizes proceed incrementally: a fixed number
//! of buckets move from the old table to the new one per read or write
//! (configurable via [`policy::set_resize_policy`]) rather than all at
//! once, which keeps any one operation's latency bounded even for very
//! large tables, at the cost of every operation potentially doing a little
//! bit of someone else's migration work.
//!
//! The container never touches an element directly; everything it needs —
//! extracting a key, hashing, comparing, tearing down — goes through the
//! [`TableOps`] trait it is generic over:
//!
//! ```
//! use kvtable::{HashTable, TableOps};
//!
//! // `Element` must be pointer-sized: `Box<String>` is a thin pointer even
//! // though `String` itself is not, so it qualifies; `Box<str>` would not,
//! // since a boxed `str` carries its length alongside the pointer.
//! struct StringSet;
//! impl TableOps for StringSet {
//!     type Element = Box<String>;
//!     type Key = str;
//!     fn key_of(elem: &Box<String>) -> &str {
//!         elem.as_str()
//!     }
//! }
//!
//! let mut set = HashTable::<StringSet>::new();
//! set.add(Box::new("hello".to_string()));
//! assert!(set.contains_key("hello"));
//! ```
//!
//! See [`TableOps`] for the full callback set and their defaults, and the
//! crate's `DESIGN.md` for how each piece here is grounded.

mod bucket;
mod container;
mod cursor;
mod error;
mod hash;
mod iter;
mod ops;
mod policy;
mod position;
mod sample;
mod scan;
mod stats;
mod table;

pub use container::{AddOrFind, HashTable, InsertLookup};
pub use error::{ExpandOutcome, TableError};
pub use hash::{hash_one, TableHasher};
pub use iter::{Iter, UnsafeIter};
pub use ops::TableOps;
pub use policy::{
    get_hash_function_seed, resize_policy, set_hash_function_seed, set_resize_policy, ResizePolicy,
};
pub use position::Position;
pub use scan::ScanFlags;
pub use stats::{Stats, TableStats};
