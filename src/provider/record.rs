//! Bit-exact encodings of the provider words.

use crate::domain::{ProviderSlot, QueueKind};
use crate::error::{Result, SwapError};
use crate::storage::{WordReader, WordWriter};
use crate::traits::Word;

const ACTIVE: u8 = 1 << 0;
const PRIORITY: u8 = 1 << 1;
const CAN_PROVIDE_LIQUIDITY: u8 = 1 << 2;
const IS_LP: u8 = 1 << 3;
const PENDING_REMOVAL: u8 = 1 << 4;

/// Width of the packed `reserved` field: 120 bits.
const RESERVED_WIDTH: usize = 15;

/// The main provider word.
///
/// | bytes | field |
/// |-------|-------|
/// | 0 | flags: bit0 active, bit1 priority, bit2 can-provide-liquidity, bit3 is-LP, bit4 pending-removal |
/// | 1..17 | liquidity, `u128` big-endian |
/// | 17..32 | reserved, 120-bit big-endian |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackedProvider {
    /// Listing is live.
    pub active: bool,
    /// Listing sits in the priority queue.
    pub priority: bool,
    /// Listing has been folded into the virtual reserves.
    pub can_provide_liquidity: bool,
    /// Provider deposited liquidity through an LP reservation.
    pub is_lp: bool,
    /// Provider withdrew its deposit and is still owed BTC.
    pub pending_removal: bool,
    /// Listed tokens, including reserved ones.
    pub liquidity: u128,
    /// Tokens held by live reservations.
    pub reserved: u128,
}

impl PackedProvider {
    /// Encodes the record.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Overflow`] if `reserved` needs more than 120 bits.
    pub fn to_word(&self) -> Result<Word> {
        let mut flags = 0u8;
        for (set, bit) in [
            (self.active, ACTIVE),
            (self.priority, PRIORITY),
            (self.can_provide_liquidity, CAN_PROVIDE_LIQUIDITY),
            (self.is_lp, IS_LP),
            (self.pending_removal, PENDING_REMOVAL),
        ] {
            if set {
                flags |= bit;
            }
        }
        let mut writer = WordWriter::new();
        writer.put_u8(flags)?;
        writer.put_uint(self.liquidity, 16)?;
        writer.put_uint(self.reserved, RESERVED_WIDTH)?;
        Ok(writer.finish())
    }

    /// Decodes the record.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Invariant`] if unknown flag bits are set.
    pub fn from_word(word: &Word) -> Result<Self> {
        let mut reader = WordReader::new(word);
        let flags = reader.u8()?;
        if flags & !(ACTIVE | PRIORITY | CAN_PROVIDE_LIQUIDITY | IS_LP | PENDING_REMOVAL) != 0 {
            return Err(SwapError::Invariant("unknown provider flag bits"));
        }
        let liquidity = reader.uint(16)?;
        let reserved = reader.uint(RESERVED_WIDTH)?;
        Ok(Self {
            active: flags & ACTIVE != 0,
            priority: flags & PRIORITY != 0,
            can_provide_liquidity: flags & CAN_PROVIDE_LIQUIDITY != 0,
            is_lp: flags & IS_LP != 0,
            pending_removal: flags & PENDING_REMOVAL != 0,
            liquidity,
            reserved,
        })
    }
}

/// Encodes a persisted queue slot: tag byte then the `u64` index.
///
/// Tags: 0 none, 1 normal, 2 priority, 3 removal, 4 initial provider.
///
/// # Errors
///
/// Propagates packing errors, which cannot occur for this layout.
pub fn encode_slot(slot: Option<ProviderSlot>) -> Result<Word> {
    let (tag, index) = match slot {
        None => (0u8, 0u64),
        Some(ProviderSlot::InitialProvider) => (4, 0),
        Some(ProviderSlot::Queued { kind, index }) => (kind.tag() + 1, index),
    };
    let mut writer = WordWriter::new();
    writer.put_u8(tag)?;
    writer.put_u64(index)?;
    Ok(writer.finish())
}

/// Decodes a persisted queue slot.
///
/// # Errors
///
/// Returns [`SwapError::Invariant`] for an unknown tag.
pub fn decode_slot(word: &Word) -> Result<Option<ProviderSlot>> {
    let mut reader = WordReader::new(word);
    let tag = reader.u8()?;
    let index = reader.u64()?;
    match tag {
        0 => Ok(None),
        4 => Ok(Some(ProviderSlot::InitialProvider)),
        _ => {
            let kind = QueueKind::from_tag(tag - 1)
                .ok_or(SwapError::Invariant("unknown provider slot tag"))?;
            Ok(Some(ProviderSlot::queued(kind, index)))
        }
    }
}
