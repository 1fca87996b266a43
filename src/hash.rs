//! Default hash function.
//!
//! The core hash table treats hashing as an opaque collaborator (see
//! [`crate::TableOps::hash`]) — SipHash or any attacker-resistant function
//! is explicitly out of scope for this crate. Something has to back the
//! default, though, so this module ships a small non-cryptographic
//! multiplicative hasher in the style of the golden-ratio/archimedes word
//! mixers used elsewhere in this codebase's hash utilities, folding in the
//! process-wide seed from [`crate::policy`].

use crate::policy;
use std::hash::{Hash, Hasher};

const ROTATE: u32 = 5;
const PRIME: u64 = 0x517C_C1B7_2722_0A95; // archimedes

#[inline]
fn mix(state: u64, word: u64) -> u64 {
    (state.rotate_left(ROTATE) ^ word).wrapping_mul(PRIME)
}

/// A small multiplicative [`Hasher`], seeded from the process-wide hash
/// seed. This is the default used by [`crate::TableOps::hash`] when a type
/// does not override it.
pub struct TableHasher(u64);

impl TableHasher {
    pub fn new() -> Self {
        let (lo, hi) = policy::hash_seed_words();
        TableHasher(mix(lo, hi))
    }
}

impl Default for TableHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for TableHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, mut bytes: &[u8]) {
        let mut state = self.0;
        while bytes.len() >= 8 {
            let word = u64::from_ne_bytes(bytes[..8].try_into().unwrap());
            state = mix(state, word);
            bytes = &bytes[8..];
        }
        if !bytes.is_empty() {
            let mut buf = [0u8; 8];
            buf[..bytes.len()].copy_from_slice(bytes);
            state = mix(state, u64::from_ne_bytes(buf));
        }
        self.0 = state;
    }

    fn write_u64(&mut self, i: u64) {
        self.0 = mix(self.0, i);
    }

    fn write_usize(&mut self, i: usize) {
        self.0 = mix(self.0, i as u64);
    }
}

/// Hashes a single `Hash` value with [`TableHasher`], the crate's default
/// hash function.
pub fn hash_one<K: Hash + ?Sized>(key: &K) -> u64 {
    let mut hasher = TableHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_fixed_seed() {
        policy::set_hash_function_seed([3u8; 16]);
        let a = hash_one(&"hello");
        let b = hash_one(&"hello");
        assert_eq!(a, b);
        let c = hash_one(&"world");
        assert_ne!(a, c);
    }
}
