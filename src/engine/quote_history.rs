//! Per-block quote history and the volatility estimate built on it.

use primitive_types::U256;

use crate::domain::Quote;
use crate::repository::Repository;
use crate::storage::{decode_u256, decode_u64, encode_u256, encode_u64, ArrayKey, Namespace, StorageKey};

/// Volatility is expressed in basis points of the older quote.
const VOLATILITY_SCALE: u64 = 10_000;

fn key(repo: &Repository<'_>, block: u64) -> StorageKey {
    StorageKey::for_token(Namespace::QuoteHistory, &repo.token(), &block.to_be_bytes())
}

fn recorded_blocks(repo: &Repository<'_>) -> ArrayKey {
    ArrayKey::new(Namespace::QuoteBlocks, &repo.token(), b"blocks")
}

/// Records the quote observed in `block`.
///
/// Blocks are recorded in increasing order; a second quote in the same
/// block replaces the first.
pub fn record_quote(repo: &mut Repository<'_>, block: u64, quote: Quote) {
    let slot = key(repo, block);
    repo.set(slot, encode_u256(quote.scaled()));

    let blocks = recorded_blocks(repo);
    let count = decode_u64(&repo.get(&blocks.len_key()));
    let last = count
        .checked_sub(1)
        .map(|index| decode_u64(&repo.get(&blocks.element_key(index))));
    if last.map_or(true, |last| block > last) {
        repo.set(blocks.element_key(count), encode_u64(block));
        repo.set(blocks.len_key(), encode_u64(count.saturating_add(1)));
    }
}

/// Latest block at or before `block` that has a recorded quote.
#[must_use]
pub fn recorded_at_or_before(repo: &Repository<'_>, block: u64) -> Option<u64> {
    let blocks = recorded_blocks(repo);
    let at = |index: u64| decode_u64(&repo.get(&blocks.element_key(index)));
    // first index whose block is past `block`
    let (mut low, mut high) = (0u64, decode_u64(&repo.get(&blocks.len_key())));
    while low < high {
        let mid = low + (high - low) / 2;
        if at(mid) <= block {
            low = mid + 1;
        } else {
            high = mid;
        }
    }
    low.checked_sub(1).map(at)
}

/// Quote recorded for `block`; zero if none was recorded.
#[must_use]
pub fn quote_at(repo: &Repository<'_>, block: u64) -> Quote {
    Quote::from_scaled(decode_u256(&repo.get(&key(repo, block))))
}

/// `|q_now - q_old| * 10_000 / q_old`, where `q_old` is the latest quote
/// recorded at least `window` blocks before `block`. Zero when either
/// quote is missing.
#[must_use]
pub fn volatility(repo: &Repository<'_>, block: u64, window: u64) -> u64 {
    let Some(old_block) = block
        .checked_sub(window)
        .and_then(|limit| recorded_at_or_before(repo, limit))
    else {
        return 0;
    };
    let now = quote_at(repo, block).scaled();
    let old = quote_at(repo, old_block).scaled();
    if now.is_zero() || old.is_zero() {
        return 0;
    }
    let delta = if now > old { now - old } else { old - now };
    let scaled = delta
        .checked_mul(U256::from(VOLATILITY_SCALE))
        .map_or(U256::MAX, |product| product / old);
    if scaled > U256::from(u64::MAX) {
        u64::MAX
    } else {
        scaled.low_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Address;
    use crate::storage::MemoryStore;

    fn q(value: u64) -> Quote {
        Quote::from_scaled(U256::from(value))
    }

    #[test]
    fn missing_quote_reads_zero() {
        let base = MemoryStore::new();
        let repo = Repository::new(&base, Address::zero());
        assert!(quote_at(&repo, 7).is_zero());
    }

    #[test]
    fn volatility_in_basis_points() {
        let base = MemoryStore::new();
        let mut repo = Repository::new(&base, Address::zero());
        record_quote(&mut repo, 10, q(1_000));
        record_quote(&mut repo, 15, q(1_100));
        assert_eq!(volatility(&repo, 15, 5), 1_000);
    }

    #[test]
    fn volatility_is_symmetric_in_direction() {
        let base = MemoryStore::new();
        let mut repo = Repository::new(&base, Address::zero());
        record_quote(&mut repo, 10, q(1_000));
        record_quote(&mut repo, 15, q(900));
        assert_eq!(volatility(&repo, 15, 5), 1_000);
    }

    #[test]
    fn sparse_history_uses_latest_older_quote() {
        let base = MemoryStore::new();
        let mut repo = Repository::new(&base, Address::zero());
        record_quote(&mut repo, 2, q(500));
        record_quote(&mut repo, 7, q(1_000));
        record_quote(&mut repo, 40, q(1_100));
        // nothing recorded at 35; block 7 is the latest at or before it
        assert_eq!(volatility(&repo, 40, 5), 1_000);
    }

    #[test]
    fn recorded_block_lookup() {
        let base = MemoryStore::new();
        let mut repo = Repository::new(&base, Address::zero());
        for block in [3, 9, 9, 20] {
            record_quote(&mut repo, block, q(1_000));
        }
        assert_eq!(recorded_at_or_before(&repo, 2), None);
        assert_eq!(recorded_at_or_before(&repo, 3), Some(3));
        assert_eq!(recorded_at_or_before(&repo, 19), Some(9));
        assert_eq!(recorded_at_or_before(&repo, 100), Some(20));
    }

    #[test]
    fn volatility_zero_without_history() {
        let base = MemoryStore::new();
        let mut repo = Repository::new(&base, Address::zero());
        record_quote(&mut repo, 15, q(900));
        assert_eq!(volatility(&repo, 15, 5), 0);
        assert_eq!(volatility(&repo, 3, 5), 0);
    }
}
