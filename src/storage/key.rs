//! Storage keys and namespaces.

use core::fmt;

use sha2::{Digest, Sha256};

use crate::domain::Address;

/// Top-level partition of the key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum Namespace {
    /// Per-pool scalar fields.
    PoolScalar = 1,
    /// Packed provider word.
    ProviderWord = 2,
    /// Cumulative liquidity provided by an LP.
    ProviderProvided = 3,
    /// Persisted queue slot of a provider.
    ProviderSlot = 4,
    /// Payout address of a provider.
    ProviderReceiver = 5,
    /// Owner address of a provider.
    ProviderOwner = 6,
    /// Packed reservation header.
    ReservationHeader = 7,
    /// Reservation legs.
    ReservationLegs = 8,
    /// Queue length and starting index.
    QueueMeta = 9,
    /// Queue slots.
    QueueSlot = 10,
    /// BTC owed to removed providers.
    BtcOwed = 11,
    /// BTC owed but already reserved by a buyer.
    BtcOwedReserved = 12,
    /// Reservation ids created in a block.
    BlockReservations = 13,
    /// Active flags parallel to [`Namespace::BlockReservations`].
    BlockReservationActive = 14,
    /// Ordered list of blocks that carry reservations.
    ReservedBlocks = 15,
    /// Quote recorded per block.
    QuoteHistory = 16,
    /// Ordered list of blocks with a recorded quote.
    QuoteBlocks = 17,
}

impl Namespace {
    /// Numeric namespace tag.
    #[must_use]
    pub const fn tag(self) -> u16 {
        self as u16
    }
}

/// Address of one storage word: a namespace and a 32-byte sub-key.
///
/// Sub-keys are SHA-256 digests of the parts identifying the record, so
/// every record lands on exactly one word regardless of how many parts
/// locate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorageKey {
    /// Namespace tag.
    pub namespace: u16,
    /// Digest of the identifying parts.
    pub sub_key: [u8; 32],
}

impl StorageKey {
    /// Derives the key for `parts` inside `namespace`.
    #[must_use]
    pub fn derive(namespace: Namespace, parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part);
        }
        Self {
            namespace: namespace.tag(),
            sub_key: hasher.finalize().into(),
        }
    }

    /// Key of a record identified by its token and one discriminator.
    #[must_use]
    pub fn for_token(namespace: Namespace, token: &Address, discriminator: &[u8]) -> Self {
        Self::derive(namespace, &[&token.as_bytes(), discriminator])
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.namespace)?;
        for byte in &self.sub_key[..6] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Location of a persisted array: a length word plus one word per element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayKey {
    namespace: Namespace,
    prefix: Vec<u8>,
}

impl ArrayKey {
    /// Array identified by `token` and `discriminator` within `namespace`.
    #[must_use]
    pub fn new(namespace: Namespace, token: &Address, discriminator: &[u8]) -> Self {
        let mut prefix = Vec::with_capacity(32 + discriminator.len());
        prefix.extend_from_slice(&token.as_bytes());
        prefix.extend_from_slice(discriminator);
        Self { namespace, prefix }
    }

    /// Key of the length word.
    #[must_use]
    pub fn len_key(&self) -> StorageKey {
        StorageKey::derive(self.namespace, &[&self.prefix, b"len"])
    }

    /// Key of element `index`.
    #[must_use]
    pub fn element_key(&self, index: u64) -> StorageKey {
        StorageKey::derive(self.namespace, &[&self.prefix, &index.to_be_bytes()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        let token = Address::from_bytes([7u8; 32]);
        assert_eq!(
            StorageKey::for_token(Namespace::PoolScalar, &token, b"a"),
            StorageKey::for_token(Namespace::PoolScalar, &token, b"a")
        );
    }

    #[test]
    fn part_boundaries_matter() {
        let a = StorageKey::derive(Namespace::PoolScalar, &[b"ab", b"c"]);
        let b = StorageKey::derive(Namespace::PoolScalar, &[b"a", b"bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn namespaces_partition_keys() {
        let a = StorageKey::derive(Namespace::BtcOwed, &[b"x"]);
        let b = StorageKey::derive(Namespace::BtcOwedReserved, &[b"x"]);
        assert_ne!(a, b);
        assert_eq!(a.sub_key, b.sub_key);
    }

    #[test]
    fn array_keys_distinct() {
        let arr = ArrayKey::new(Namespace::QueueSlot, &Address::zero(), b"q");
        assert_ne!(arr.len_key(), arr.element_key(0));
        assert_ne!(arr.element_key(0), arr.element_key(1));
    }
}
