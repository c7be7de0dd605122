//! Reservations indexed by the block that created them.

use crate::domain::ReservationId;
use crate::error::{Result, SwapError};
use crate::repository::Repository;
use crate::storage::{decode_u128, decode_u64, encode_u128, encode_u64, ArrayKey, Namespace, StorageKey};
use crate::traits::ZERO_WORD;

/// A reservation id recorded in a block's list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEntry {
    /// Position in the block's list; stored on the reservation as its
    /// purge index.
    pub index: u32,
    /// Reservation id.
    pub id: ReservationId,
}

/// Per-block reservation lists plus the ordered list of blocks that carry
/// reservations and a purge cursor into it.
///
/// Each block holds an id array and a parallel active-flag array. A swap
/// clears its entry's flag; purging replays only entries still active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReservations {
    blocks: ArrayKey,
    cursor_key: StorageKey,
    block_count: u64,
    purge_cursor: u64,
}

impl BlockReservations {
    /// Loads the index of `repo`'s token.
    #[must_use]
    pub fn load(repo: &Repository<'_>) -> Self {
        let token = repo.token();
        let blocks = ArrayKey::new(Namespace::ReservedBlocks, &token, b"blocks");
        let cursor_key = StorageKey::for_token(Namespace::PoolScalar, &token, b"purge_cursor");
        Self {
            block_count: decode_u64(&repo.get(&blocks.len_key())),
            purge_cursor: decode_u64(&repo.get(&cursor_key)),
            blocks,
            cursor_key,
        }
    }

    fn ids(repo: &Repository<'_>, block: u64) -> ArrayKey {
        ArrayKey::new(Namespace::BlockReservations, &repo.token(), &block.to_be_bytes())
    }

    fn flags(repo: &Repository<'_>, block: u64) -> ArrayKey {
        ArrayKey::new(
            Namespace::BlockReservationActive,
            &repo.token(),
            &block.to_be_bytes(),
        )
    }

    /// Records `id` as created in `block`, returning its purge index.
    ///
    /// # Errors
    ///
    /// [`SwapError::Overflow`] if the block's list exceeds `u32` entries.
    pub fn push(&mut self, repo: &mut Repository<'_>, block: u64, id: ReservationId) -> Result<u32> {
        let last = self
            .block_count
            .checked_sub(1)
            .map(|i| decode_u64(&repo.get(&self.blocks.element_key(i))));
        if last != Some(block) {
            repo.set(self.blocks.element_key(self.block_count), encode_u64(block));
            self.block_count += 1;
            repo.set(self.blocks.len_key(), encode_u64(self.block_count));
        }

        let ids = Self::ids(repo, block);
        let flags = Self::flags(repo, block);
        let count = decode_u64(&repo.get(&ids.len_key()));
        let index =
            u32::try_from(count).map_err(|_| SwapError::Overflow("block reservation list"))?;
        repo.set(ids.element_key(count), encode_u128(id.get()));
        repo.set(flags.element_key(count), encode_u64(1));
        repo.set(ids.len_key(), encode_u64(count + 1));
        Ok(index)
    }

    /// Clears the active flag of entry `index` of `block`.
    pub fn deactivate(repo: &mut Repository<'_>, block: u64, index: u32) {
        let flags = Self::flags(repo, block);
        repo.set(flags.element_key(u64::from(index)), ZERO_WORD);
    }

    /// Returns `true` if entry `index` of `block` is still active.
    #[must_use]
    pub fn is_active(repo: &Repository<'_>, block: u64, index: u32) -> bool {
        let flags = Self::flags(repo, block);
        repo.get(&flags.element_key(u64::from(index))) != ZERO_WORD
    }

    /// Active entries of `block`, in creation order.
    #[must_use]
    pub fn active_entries(repo: &Repository<'_>, block: u64) -> Vec<BlockEntry> {
        let ids = Self::ids(repo, block);
        let count = decode_u64(&repo.get(&ids.len_key()));
        (0..count)
            .filter_map(|i| {
                let index = u32::try_from(i).ok()?;
                Self::is_active(repo, block, index).then(|| BlockEntry {
                    index,
                    id: ReservationId::from_u128(decode_u128(&repo.get(&ids.element_key(i)))),
                })
            })
            .collect()
    }

    /// Next block whose reservations have all expired at `current_block`,
    /// i.e. `block + expiry < current_block`.
    #[must_use]
    pub fn next_expired_block(&self, repo: &Repository<'_>, current_block: u64, expiry: u64) -> Option<u64> {
        if self.purge_cursor >= self.block_count {
            return None;
        }
        let block = decode_u64(&repo.get(&self.blocks.element_key(self.purge_cursor)));
        (block.saturating_add(expiry) < current_block).then_some(block)
    }

    /// Marks the block at the purge cursor as purged.
    pub fn advance(&mut self) {
        if self.purge_cursor < self.block_count {
            self.purge_cursor += 1;
        }
    }

    /// Persists the purge cursor.
    pub fn save(&self, repo: &mut Repository<'_>) {
        repo.set(self.cursor_key, encode_u64(self.purge_cursor));
    }
}
