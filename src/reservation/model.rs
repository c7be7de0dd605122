//! The reservation entity and its lifecycle.

use super::record::{PackedReservation, ReservationLeg};
use crate::domain::{Address, ProviderSlot, ReservationId};
use crate::error::{Result, SwapError};
use crate::storage::{decode_u64, encode_u64, ArrayKey, Namespace, StorageKey};
use crate::traits::{KeyValueStore, ZERO_WORD};

/// A buyer's time-boxed claim on provider liquidity.
///
/// Lifecycle: absent → created (legs, unexpired) → swapped (deleted), or
/// expired and later purged with the timeout marker armed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    id: ReservationId,
    header: PackedReservation,
    legs: Vec<ReservationLeg>,
    stored_legs: u64,
}

impl Reservation {
    /// An empty reservation.
    #[must_use]
    pub fn new(id: ReservationId) -> Self {
        Self {
            id,
            header: PackedReservation::default(),
            legs: Vec::new(),
            stored_legs: 0,
        }
    }

    fn header_key(token: &Address, id: ReservationId) -> StorageKey {
        StorageKey::for_token(Namespace::ReservationHeader, token, &id.get().to_be_bytes())
    }

    fn legs_key(token: &Address, id: ReservationId) -> ArrayKey {
        ArrayKey::new(Namespace::ReservationLegs, token, &id.get().to_be_bytes())
    }

    pub(crate) fn load(store: &dyn KeyValueStore, token: &Address, id: ReservationId) -> Result<Self> {
        let header = PackedReservation::from_word(&store.get(&Self::header_key(token, id)))?;
        let legs_key = Self::legs_key(token, id);
        let count = decode_u64(&store.get(&legs_key.len_key()));
        let legs = (0..count)
            .map(|index| ReservationLeg::from_word(&store.get(&legs_key.element_key(index))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            id,
            header,
            legs,
            stored_legs: count,
        })
    }

    pub(crate) fn save(&self, store: &mut dyn KeyValueStore, token: &Address) -> Result<()> {
        store.set(Self::header_key(token, self.id), self.header.to_word()?);
        let legs_key = Self::legs_key(token, self.id);
        let count = self.legs.len() as u64;
        store.set(legs_key.len_key(), encode_u64(count));
        for (index, leg) in (0u64..).zip(&self.legs) {
            store.set(legs_key.element_key(index), leg.to_word()?);
        }
        for index in count..self.stored_legs {
            store.set(legs_key.element_key(index), ZERO_WORD);
        }
        Ok(())
    }

    /// Reservation id.
    #[must_use]
    pub const fn id(&self) -> ReservationId {
        self.id
    }

    /// Provider legs in scheduling order.
    #[must_use]
    pub fn legs(&self) -> &[ReservationLeg] {
        &self.legs
    }

    /// Total tokens reserved across all legs.
    #[must_use]
    pub fn total_reserved(&self) -> u128 {
        self.legs.iter().map(|leg| leg.amount).sum()
    }

    /// `true` once the reservation holds legs.
    #[must_use]
    pub fn has_legs(&self) -> bool {
        !self.legs.is_empty()
    }

    /// Last block in which the reservation can be executed.
    #[must_use]
    pub const fn expiration_block(&self) -> u64 {
        self.header.expiration_block
    }

    /// Block the reservation was made in.
    #[must_use]
    pub const fn creation_block(&self) -> u64 {
        self.header.creation_block
    }

    /// Position in the creation block's reservation list.
    #[must_use]
    pub const fn purge_index(&self) -> u32 {
        self.header.purge_index
    }

    /// Reservation feeds an LP deposit.
    #[must_use]
    pub const fn is_for_liquidity_pool(&self) -> bool {
        self.header.for_liquidity_pool
    }

    /// The buyer let a previous reservation lapse.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        self.header.timeout
    }

    /// `true` once `current_block` is past the expiration block.
    #[must_use]
    pub const fn is_expired(&self, current_block: u64) -> bool {
        self.header.expiration_block < current_block
    }

    /// Has legs and is not expired.
    #[must_use]
    pub fn is_valid(&self, current_block: u64) -> bool {
        self.has_legs() && !self.is_expired(current_block)
    }

    /// Last block of the timeout window, if the buyer is still inside it.
    #[must_use]
    pub const fn timed_out_until(&self, current_block: u64, window: u64) -> Option<u64> {
        if !self.header.timeout {
            return None;
        }
        let until = self.header.expiration_block.saturating_add(window);
        if current_block <= until {
            Some(until)
        } else {
            None
        }
    }

    /// Starts a fresh reservation created in `block`.
    pub fn open(&mut self, block: u64, expiration_block: u64, for_liquidity_pool: bool) {
        self.legs.clear();
        self.header = PackedReservation {
            for_liquidity_pool,
            timeout: false,
            expiration_block,
            creation_block: block,
            purge_index: 0,
        };
    }

    /// Records the position in the creation block's list.
    pub fn set_purge_index(&mut self, index: u32) {
        self.header.purge_index = index;
    }

    /// Appends a listing leg.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Invariant`] if `slot` already has a leg: a
    /// scheduling pass must never return the same provider twice.
    pub fn add_leg(&mut self, slot: ProviderSlot, amount: u128) -> Result<()> {
        self.push_leg(ReservationLeg {
            slot,
            amount,
            owed_satoshis: 0,
        })
    }

    /// Appends a removal-queue leg holding `owed_satoshis` of the
    /// provider's BTC debt.
    ///
    /// # Errors
    ///
    /// Same as [`Reservation::add_leg`].
    pub fn add_removal_leg(&mut self, slot: ProviderSlot, amount: u128, owed_satoshis: u64) -> Result<()> {
        self.push_leg(ReservationLeg {
            slot,
            amount,
            owed_satoshis,
        })
    }

    fn push_leg(&mut self, leg: ReservationLeg) -> Result<()> {
        if self.legs.iter().any(|existing| existing.slot == leg.slot) {
            return Err(SwapError::Invariant("provider scheduled twice in one reservation"));
        }
        self.legs.push(leg);
        Ok(())
    }

    /// Clears all legs.
    ///
    /// A timeout reset keeps the expiration block, which anchors the
    /// buyer's timeout window, and arms the timeout marker. Otherwise the
    /// header is cleared entirely.
    pub fn reset(&mut self, is_timeout: bool) {
        self.legs.clear();
        if is_timeout {
            self.header = PackedReservation {
                timeout: true,
                expiration_block: self.header.expiration_block,
                ..PackedReservation::default()
            };
        } else {
            self.header = PackedReservation::default();
        }
    }
}
