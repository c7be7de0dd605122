//! Ledger addresses for owners, buyers and tokens.

use core::fmt;

/// A 32-byte ledger identity.
///
/// Owners, buyers and token contracts are all addressed this way.  All
/// 32-byte sequences are valid, so construction is infallible.  BTC payout
/// addresses are plain strings and are not modelled by this type.
///
/// # Examples
///
/// ```
/// use native_swap::domain::Address;
///
/// let addr = Address::from_bytes([1u8; 32]);
/// assert_eq!(addr.as_bytes(), [1u8; 32]);
/// assert!(!addr.is_zero());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; 32]);

impl Address {
    /// Creates an `Address` from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying 32-byte representation.
    #[must_use]
    pub const fn as_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Returns the all-zero address.
    #[must_use]
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Returns `true` for the all-zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..")?;
        for byte in &self.0[28..] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Validates a BTC payout address string.
///
/// Only structural checks are done here: non-empty, printable ASCII, no
/// whitespace, and at most [`MAX_RECEIVER_LEN`] bytes.  Script-level
/// validation belongs to the host.
#[must_use]
pub fn is_valid_receiver(receiver: &str) -> bool {
    !receiver.is_empty()
        && receiver.len() <= MAX_RECEIVER_LEN
        && receiver.bytes().all(|b| b.is_ascii_graphic())
}

/// Longest accepted payout address, in bytes.
pub const MAX_RECEIVER_LEN: usize = 128;
