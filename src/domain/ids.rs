//! Derived identifiers for providers and reservations.

use core::fmt;

use primitive_types::U256;
use sha2::{Digest, Sha256};

use super::Address;

/// Identifier of a provider: SHA-256 of `owner ‖ token` read as a
/// big-endian 256-bit integer.
///
/// The zero id is used as the tombstone value in persisted queue slots and
/// is never produced by [`ProviderId::derive`] in practice.
///
/// # Examples
///
/// ```
/// use native_swap::domain::{Address, ProviderId};
///
/// let owner = Address::from_bytes([1u8; 32]);
/// let token = Address::from_bytes([2u8; 32]);
/// let id = ProviderId::derive(&owner, &token);
/// assert_eq!(id, ProviderId::derive(&owner, &token));
/// assert!(!id.is_zero());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProviderId(U256);

impl ProviderId {
    /// Derives the provider id for `owner` listing `token`.
    #[must_use]
    pub fn derive(owner: &Address, token: &Address) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(owner.as_bytes());
        hasher.update(token.as_bytes());
        let digest: [u8; 32] = hasher.finalize().into();
        Self(U256::from_big_endian(&digest))
    }

    /// Wraps a raw 256-bit value.
    #[must_use]
    pub const fn from_u256(value: U256) -> Self {
        Self(value)
    }

    /// Returns the raw 256-bit value.
    #[must_use]
    pub const fn get(&self) -> U256 {
        self.0
    }

    /// Returns `true` for the tombstone id.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Big-endian byte representation.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        self.0.to_big_endian(&mut out);
        out
    }

    /// Rebuilds an id from its big-endian bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(U256::from_big_endian(&bytes))
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Identifier of a reservation: the first 16 bytes of
/// SHA-256(`token ‖ buyer`).
///
/// A buyer holds at most one live reservation per token, so the id doubles
/// as the storage key of that buyer's reservation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReservationId(u128);

impl ReservationId {
    /// Derives the reservation id of `buyer` on `token`.
    #[must_use]
    pub fn derive(token: &Address, buyer: &Address) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hasher.update(buyer.as_bytes());
        let digest: [u8; 32] = hasher.finalize().into();
        let mut head = [0u8; 16];
        head.copy_from_slice(&digest[..16]);
        Self(u128::from_be_bytes(head))
    }

    /// Wraps a raw 128-bit value.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(value)
    }

    /// Returns the raw 128-bit value.
    #[must_use]
    pub const fn get(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#034x}", self.0)
    }
}
