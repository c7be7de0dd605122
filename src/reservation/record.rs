//! Bit-exact encodings of the reservation words.

use crate::domain::{ProviderSlot, QueueKind};
use crate::error::{Result, SwapError};
use crate::storage::{WordReader, WordWriter};
use crate::traits::Word;

const FOR_LIQUIDITY_POOL: u8 = 1 << 0;
const TIMEOUT: u8 = 1 << 1;

/// Bytes left in a leg word after index, amount and kind.
const OWED_SATOSHIS_WIDTH: usize = 7;

/// The reservation header word.
///
/// | bytes | field |
/// |-------|-------|
/// | 0 | flags: bit0 reserved-for-LP, bit1 timeout |
/// | 1..9 | expiration block |
/// | 9..17 | creation block |
/// | 17..21 | purge index |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackedReservation {
    /// Reservation feeds an LP deposit rather than a swap.
    pub for_liquidity_pool: bool,
    /// Reservation lapsed and its buyer is timed out.
    pub timeout: bool,
    /// Last block in which the reservation can be executed.
    pub expiration_block: u64,
    /// Block the reservation was made in.
    pub creation_block: u64,
    /// Position in the creation block's reservation list.
    pub purge_index: u32,
}

impl PackedReservation {
    /// Encodes the header.
    ///
    /// # Errors
    ///
    /// Propagates packing errors, which cannot occur for this layout.
    pub fn to_word(&self) -> Result<Word> {
        let mut flags = 0u8;
        if self.for_liquidity_pool {
            flags |= FOR_LIQUIDITY_POOL;
        }
        if self.timeout {
            flags |= TIMEOUT;
        }
        let mut writer = WordWriter::new();
        writer.put_u8(flags)?;
        writer.put_u64(self.expiration_block)?;
        writer.put_u64(self.creation_block)?;
        writer.put_u32(self.purge_index)?;
        Ok(writer.finish())
    }

    /// Decodes the header.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Invariant`] if unknown flag bits are set.
    pub fn from_word(word: &Word) -> Result<Self> {
        let mut reader = WordReader::new(word);
        let flags = reader.u8()?;
        if flags & !(FOR_LIQUIDITY_POOL | TIMEOUT) != 0 {
            return Err(SwapError::Invariant("unknown reservation flag bits"));
        }
        Ok(Self {
            for_liquidity_pool: flags & FOR_LIQUIDITY_POOL != 0,
            timeout: flags & TIMEOUT != 0,
            expiration_block: reader.u64()?,
            creation_block: reader.u64()?,
            purge_index: reader.u32()?,
        })
    }
}

/// One provider allocation inside a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationLeg {
    /// Where the provider was scheduled from.
    pub slot: ProviderSlot,
    /// Tokens reserved from that provider.
    pub amount: u128,
    /// Satoshis of a removal-queue provider's BTC debt held by this leg.
    /// Zero for listing legs.
    pub owed_satoshis: u64,
}

impl ReservationLeg {
    /// Queue kind used for settlement.
    #[must_use]
    pub const fn kind(&self) -> QueueKind {
        self.slot.kind()
    }

    /// Encodes `index u64 ‖ amount u128 ‖ kind u8 ‖ owed satoshis u56`.
    ///
    /// # Errors
    ///
    /// [`SwapError::Overflow`] if the owed satoshis need more than 56 bits.
    pub fn to_word(&self) -> Result<Word> {
        let mut writer = WordWriter::new();
        writer.put_u64(self.slot.wire_index())?;
        writer.put_uint(self.amount, 16)?;
        writer.put_u8(self.kind().tag())?;
        writer.put_uint(u128::from(self.owed_satoshis), OWED_SATOSHIS_WIDTH)?;
        Ok(writer.finish())
    }

    /// Decodes a leg word.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Invariant`] for an unknown queue kind.
    pub fn from_word(word: &Word) -> Result<Self> {
        let mut reader = WordReader::new(word);
        let index = reader.u64()?;
        let amount = reader.uint(16)?;
        let kind = QueueKind::from_tag(reader.u8()?)
            .ok_or(SwapError::Invariant("unknown reservation leg kind"))?;
        let owed_satoshis = u64::try_from(reader.uint(OWED_SATOSHIS_WIDTH)?)
            .map_err(|_| SwapError::Invariant("owed satoshis wider than u64"))?;
        Ok(Self {
            slot: ProviderSlot::from_wire(index, kind),
            amount,
            owed_satoshis,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let header = PackedReservation {
            for_liquidity_pool: true,
            timeout: true,
            expiration_block: 0x0102,
            creation_block: 0x0304,
            purge_index: 0x05,
        };
        let Ok(word) = header.to_word() else {
            panic!("fits");
        };
        assert_eq!(word[0], 0b11);
        assert_eq!(&word[7..9], &[0x01, 0x02]);
        assert_eq!(&word[15..17], &[0x03, 0x04]);
        assert_eq!(word[20], 0x05);
        assert!(word[21..].iter().all(|b| *b == 0));
        assert_eq!(PackedReservation::from_word(&word).ok(), Some(header));
    }

    #[test]
    fn initial_provider_leg_uses_sentinel_index() {
        let leg = ReservationLeg {
            slot: ProviderSlot::InitialProvider,
            amount: 55,
            owed_satoshis: 0,
        };
        let Ok(word) = leg.to_word() else {
            panic!("fits");
        };
        assert!(word[..8].iter().all(|b| *b == 0xff));
        assert_eq!(ReservationLeg::from_word(&word).ok(), Some(leg));
    }

    #[test]
    fn removal_leg_keeps_kind() {
        let leg = ReservationLeg {
            slot: ProviderSlot::queued(QueueKind::Removal, 3),
            amount: 1,
            owed_satoshis: 10_001,
        };
        let Ok(word) = leg.to_word() else {
            panic!("fits");
        };
        assert_eq!(word[24], QueueKind::Removal.tag());
        assert_eq!(&word[30..], &10_001u16.to_be_bytes());
        assert_eq!(ReservationLeg::from_word(&word).ok(), Some(leg));
    }

    #[test]
    fn owed_satoshis_limited_to_56_bits() {
        let leg = ReservationLeg {
            slot: ProviderSlot::queued(QueueKind::Removal, 0),
            amount: 1,
            owed_satoshis: 1 << 56,
        };
        assert!(matches!(leg.to_word(), Err(SwapError::Overflow(_))));
    }

    #[test]
    fn bad_kind_rejected() {
        let mut word = [0u8; 32];
        word[24] = 7;
        assert!(ReservationLeg::from_word(&word).is_err());
    }
}
