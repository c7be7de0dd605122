//! The persistent word store seam.

use crate::storage::StorageKey;

/// A fixed-width storage word.
pub type Word = [u8; 32];

/// The zero word. Absent keys read as this value.
pub const ZERO_WORD: Word = [0u8; 32];

/// A flat key→word store.
///
/// Implementations never fail: an absent key reads as [`ZERO_WORD`] and a
/// write always succeeds. Atomicity across a call is layered on top by
/// [`StorageTransaction`](crate::storage::StorageTransaction).
pub trait KeyValueStore {
    /// Reads the word stored at `key`.
    fn get(&self, key: &StorageKey) -> Word;

    /// Stores `value` at `key`.
    fn set(&mut self, key: StorageKey, value: Word);
}
