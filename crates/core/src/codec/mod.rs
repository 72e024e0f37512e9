//! Instruction codec.
//!
//! Converts between bound instructions and machine words:
//! 1. **Bindings:** Operand name to value maps (register numbers, immediates).
//! 2. **Words:** 16/32-bit words with little-endian byte conversion.
//! 3. **Encode/Decode:** Field packing and mask-ordered decoding with
//!    guaranteed round trip for every legal binding.

use std::collections::BTreeMap;
use std::collections::btree_map;

/// Mask-ordered decoder.
pub mod decode;

/// Field-packing encoder.
pub mod encode;

/// Instruction words.
pub mod word;

pub use decode::{Decoded, decode, decode_bytes};
pub use encode::encode;
pub use word::{EncodedWord, WordSize};

/// Operand values of one instruction, keyed by operand name.
///
/// Registers are bound to their register number (`21` for `x21`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bindings(BTreeMap<String, i64>);

impl Bindings {
    /// Empty bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binding, builder style.
    #[must_use]
    pub fn with(mut self, name: &str, value: i64) -> Self {
        let _ = self.0.insert(name.to_owned(), value);
        self
    }

    /// Sets a binding, returning the previous value.
    pub fn insert(&mut self, name: &str, value: i64) -> Option<i64> {
        self.0.insert(name.to_owned(), value)
    }

    /// Value bound to `name`.
    pub fn get(&self, name: &str) -> Option<i64> {
        self.0.get(name).copied()
    }

    /// Bound names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `(name, value)` pairs, sorted by name.
    pub fn iter(&self) -> btree_map::Iter<'_, String, i64> {
        self.0.iter()
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, i64)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (S, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl<const N: usize> From<[(&str, i64); N]> for Bindings {
    fn from(pairs: [(&str, i64); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a Bindings {
    type Item = (&'a String, &'a i64);
    type IntoIter = btree_map::Iter<'a, String, i64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
