//! One append-only, lazily cleaned provider queue.

use tracing::debug;

use crate::domain::{Address, ProviderId, QueueKind};
use crate::error::{Result, SwapError};
use crate::repository::Repository;
use crate::storage::{ArrayKey, Namespace, StorageKey, WordReader, WordWriter};
use crate::traits::ZERO_WORD;

/// An append-only sequence of provider ids.
///
/// Slots are never removed; a dead provider's slot is cleared to `None`.
/// Two positions track progress:
///
/// - `starting_index`, persisted: every slot below it is empty or dead.
/// - `cursor`, transient: where the next scan of this call resumes.
///
/// Scans never modify slots; only [`ProviderQueue::clean_up`] and
/// [`ProviderQueue::clear`] do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderQueue {
    kind: QueueKind,
    slots: ArrayKey,
    meta_key: StorageKey,
    length: u64,
    starting_index: u64,
    cursor: u64,
    cursor_advanced: bool,
    first_exhausted: Option<u64>,
}

impl ProviderQueue {
    /// Loads the queue of `kind` for `token`.
    ///
    /// # Errors
    ///
    /// Propagates decoding errors.
    pub fn load(repo: &Repository<'_>, token: &Address, kind: QueueKind) -> Result<Self> {
        let discriminator = [kind.tag()];
        let meta_key = StorageKey::for_token(Namespace::QueueMeta, token, &discriminator);
        let meta = repo.get(&meta_key);
        let mut reader = WordReader::new(&meta);
        let length = reader.u64()?;
        let starting_index = reader.u64()?;
        Ok(Self {
            kind,
            slots: ArrayKey::new(Namespace::QueueSlot, token, &discriminator),
            meta_key,
            length,
            starting_index,
            cursor: starting_index,
            cursor_advanced: false,
            first_exhausted: None,
        })
    }

    /// Queue kind.
    #[must_use]
    pub const fn kind(&self) -> QueueKind {
        self.kind
    }

    /// Number of slots ever appended.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.length
    }

    /// `true` if nothing was ever appended.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// First slot that may still hold a live provider.
    #[must_use]
    pub const fn starting_index(&self) -> u64 {
        self.starting_index
    }

    /// Provider at `index`, or `None` for an empty or out-of-range slot.
    #[must_use]
    pub fn get(&self, repo: &Repository<'_>, index: u64) -> Option<ProviderId> {
        if index >= self.length {
            return None;
        }
        let word = repo.get(&self.slots.element_key(index));
        if word == ZERO_WORD {
            None
        } else {
            Some(ProviderId::from_bytes(word))
        }
    }

    /// Appends `id`, returning its index.
    ///
    /// # Errors
    ///
    /// - [`SwapError::Invariant`] if `id` is the zero id.
    /// - [`SwapError::Overflow`] if the queue is full.
    pub fn push(&mut self, repo: &mut Repository<'_>, id: ProviderId) -> Result<u64> {
        if id.is_zero() {
            return Err(SwapError::Invariant("zero provider id cannot be queued"));
        }
        let index = self.length;
        repo.set(self.slots.element_key(index), id.to_bytes());
        self.length = self
            .length
            .checked_add(1)
            .ok_or(SwapError::Overflow("provider queue length"))?;
        Ok(index)
    }

    /// Empties the slot at `index`.
    pub fn clear(&mut self, repo: &mut Repository<'_>, index: u64) {
        if index < self.length {
            repo.set(self.slots.element_key(index), ZERO_WORD);
        }
    }

    /// Forces the next clean-up to start from the first slot.
    pub fn reset_starting_index(&mut self) {
        self.starting_index = 0;
        self.cursor = 0;
    }

    /// Advances `starting_index` past every empty or dead slot.
    ///
    /// Resumes from the persisted watermark, clears each dead slot it
    /// meets and stops at the first slot for which `is_live` holds.
    ///
    /// # Errors
    ///
    /// Propagates errors of `is_live`.
    pub fn clean_up<F>(&mut self, repo: &mut Repository<'_>, mut is_live: F) -> Result<()>
    where
        F: FnMut(&mut Repository<'_>, ProviderId) -> Result<bool>,
    {
        let mut index = self.starting_index;
        while index < self.length {
            if let Some(id) = self.get(repo, index) {
                if is_live(repo, id)? {
                    break;
                }
                debug!(queue = %self.kind, index, "clearing dead provider slot");
                self.clear(repo, index);
            }
            index += 1;
        }
        self.starting_index = index;
        self.cursor = index;
        Ok(())
    }

    /// Scan position of the current call.
    #[must_use]
    pub const fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Moves the scan cursor to `index`.
    pub fn advance_cursor(&mut self, index: u64) {
        if index > self.cursor {
            self.cursor = index;
            self.cursor_advanced = true;
        }
    }

    /// Notes a live provider the scan passed over, either because it had
    /// nothing spare or because its caller declined it. The persisted
    /// watermark never moves past it.
    pub fn note_exhausted(&mut self, index: u64) {
        if self.first_exhausted.map_or(true, |first| index < first) {
            self.first_exhausted = Some(index);
        }
    }

    /// Persists the queue metadata.
    ///
    /// If a scan advanced the cursor, the watermark moves to the last slot
    /// scanned, but never past a live provider that was skipped.
    ///
    /// # Errors
    ///
    /// Propagates packing errors, which cannot occur for this layout.
    pub fn save(&mut self, repo: &mut Repository<'_>) -> Result<()> {
        if self.cursor_advanced {
            let mut watermark = self.cursor.saturating_sub(1).max(self.starting_index);
            if let Some(first) = self.first_exhausted {
                watermark = watermark.min(first);
            }
            self.starting_index = watermark;
        }
        let mut writer = WordWriter::new();
        writer.put_u64(self.length)?;
        writer.put_u64(self.starting_index)?;
        repo.set(self.meta_key, writer.finish());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use primitive_types::U256;

    use crate::storage::MemoryStore;

    fn token() -> Address {
        Address::from_bytes([5u8; 32])
    }

    fn id(n: u64) -> ProviderId {
        ProviderId::from_u256(U256::from(n))
    }

    fn filled(repo: &mut Repository<'_>, ids: &[u64]) -> ProviderQueue {
        let Ok(mut queue) = ProviderQueue::load(repo, &token(), QueueKind::Normal) else {
            panic!("expected Ok");
        };
        for n in ids {
            let Ok(_) = queue.push(repo, id(*n)) else {
                panic!("expected Ok");
            };
        }
        queue
    }

    #[test]
    fn push_and_get() {
        let base = MemoryStore::new();
        let mut repo = Repository::new(&base, token());
        let queue = filled(&mut repo, &[1, 2]);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.get(&repo, 1), Some(id(2)));
        assert_eq!(queue.get(&repo, 2), None);
    }

    #[test]
    fn zero_id_rejected() {
        let base = MemoryStore::new();
        let mut repo = Repository::new(&base, token());
        let mut queue = filled(&mut repo, &[]);
        assert!(matches!(
            queue.push(&mut repo, id(0)),
            Err(SwapError::Invariant(_))
        ));
    }

    #[test]
    fn clean_up_stops_at_first_live_slot() {
        let base = MemoryStore::new();
        let mut repo = Repository::new(&base, token());
        let mut queue = filled(&mut repo, &[1, 2, 3, 4]);
        queue.clear(&mut repo, 1);
        let Ok(()) = queue.clean_up(&mut repo, |_, provider| Ok(provider == id(3))) else {
            panic!("expected Ok");
        };
        assert_eq!(queue.starting_index(), 2);
        assert_eq!(queue.get(&repo, 0), None);
        assert_eq!(queue.get(&repo, 2), Some(id(3)));
        assert_eq!(queue.get(&repo, 3), Some(id(4)));
    }

    #[test]
    fn clean_up_is_idempotent() {
        let base = MemoryStore::new();
        let mut repo = Repository::new(&base, token());
        let mut queue = filled(&mut repo, &[1, 2, 3]);
        let live =
            |_: &mut Repository<'_>, provider: ProviderId| -> Result<bool> { Ok(provider != id(1)) };
        let Ok(()) = queue.clean_up(&mut repo, live) else {
            panic!("expected Ok");
        };
        let first = queue.starting_index();
        let Ok(()) = queue.clean_up(&mut repo, live) else {
            panic!("expected Ok");
        };
        assert_eq!(queue.starting_index(), first);
    }

    #[test]
    fn all_dead_moves_to_end() {
        let base = MemoryStore::new();
        let mut repo = Repository::new(&base, token());
        let mut queue = filled(&mut repo, &[1, 2, 3]);
        let Ok(()) = queue.clean_up(&mut repo, |_, _| Ok(false)) else {
            panic!("expected Ok");
        };
        assert_eq!(queue.starting_index(), 3);
    }

    #[test]
    fn save_keeps_watermark_before_exhausted_provider() {
        let base = MemoryStore::new();
        let mut repo = Repository::new(&base, token());
        let mut queue = filled(&mut repo, &[1, 2, 3]);
        queue.note_exhausted(0);
        queue.advance_cursor(2);
        let Ok(()) = queue.save(&mut repo) else {
            panic!("expected Ok");
        };
        assert_eq!(queue.starting_index(), 0);
    }

    #[test]
    fn save_moves_watermark_to_last_returned() {
        let base = MemoryStore::new();
        let mut repo = Repository::new(&base, token());
        let mut queue = filled(&mut repo, &[1, 2, 3]);
        queue.advance_cursor(3);
        let Ok(()) = queue.save(&mut repo) else {
            panic!("expected Ok");
        };
        assert_eq!(queue.starting_index(), 2);

        let Ok(reloaded) = ProviderQueue::load(&repo, &token(), QueueKind::Normal) else {
            panic!("expected Ok");
        };
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.starting_index(), 2);
    }

    #[test]
    fn untouched_cursor_keeps_watermark() {
        let base = MemoryStore::new();
        let mut repo = Repository::new(&base, token());
        let mut queue = filled(&mut repo, &[1]);
        let Ok(()) = queue.save(&mut repo) else {
            panic!("expected Ok");
        };
        assert_eq!(queue.starting_index(), 0);
    }
}
