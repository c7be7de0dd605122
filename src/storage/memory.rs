//! In-memory word store.

use std::collections::BTreeMap;

use super::StorageKey;
use crate::traits::{KeyValueStore, Word, ZERO_WORD};

/// A [`KeyValueStore`] backed by an ordered map.
///
/// Writing the zero word removes the entry, so [`MemoryStore::len`] counts
/// only non-zero words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    words: BTreeMap<StorageKey, Word>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-zero words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &StorageKey) -> Word {
        self.words.get(key).copied().unwrap_or(ZERO_WORD)
    }

    fn set(&mut self, key: StorageKey, value: Word) {
        if value == ZERO_WORD {
            self.words.remove(&key);
        } else {
            self.words.insert(key, value);
        }
    }
}
