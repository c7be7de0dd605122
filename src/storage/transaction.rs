//! Write overlay giving each call all-or-nothing persistence.

use std::collections::BTreeMap;

use super::StorageKey;
use crate::traits::{KeyValueStore, Word};

/// Buffers writes on top of a read-only base store.
///
/// Reads see the buffered writes first. Nothing reaches the base store
/// until [`StorageTransaction::into_writes`] is applied with
/// [`apply_writes`]; dropping the transaction discards every write.
pub struct StorageTransaction<'a> {
    base: &'a dyn KeyValueStore,
    writes: BTreeMap<StorageKey, Word>,
}

impl<'a> StorageTransaction<'a> {
    /// Opens an overlay over `base`.
    #[must_use]
    pub fn new(base: &'a dyn KeyValueStore) -> Self {
        Self {
            base,
            writes: BTreeMap::new(),
        }
    }

    /// Number of distinct keys written.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.writes.len()
    }

    /// Consumes the overlay, returning its writes.
    #[must_use]
    pub fn into_writes(self) -> BTreeMap<StorageKey, Word> {
        self.writes
    }
}

impl KeyValueStore for StorageTransaction<'_> {
    fn get(&self, key: &StorageKey) -> Word {
        match self.writes.get(key) {
            Some(word) => *word,
            None => self.base.get(key),
        }
    }

    fn set(&mut self, key: StorageKey, value: Word) {
        self.writes.insert(key, value);
    }
}

/// Applies buffered writes to `store`.
pub fn apply_writes(store: &mut dyn KeyValueStore, writes: BTreeMap<StorageKey, Word>) {
    for (key, value) in writes {
        store.set(key, value);
    }
}
