//! The provider entity.

use primitive_types::U256;

use super::record::{decode_slot, encode_slot, PackedProvider};
use crate::domain::{Address, ProviderId, ProviderSlot};
use crate::error::{Result, SwapError};
use crate::math::CheckedArithmetic;
use crate::storage::{decode_u256, encode_u256, load_string, save_string, ArrayKey, Namespace, StorageKey};
use crate::traits::KeyValueStore;

/// A seller of tokens, identified by `(owner, token)`.
///
/// # Invariant
///
/// `liquidity >= reserved` at all times. Every mutator that could break it
/// fails with [`SwapError::Invariant`] instead.
///
/// Providers are never deleted. [`Provider::reset`] zeroes them and clears
/// their queue slot; the record is reused if the owner lists again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    id: ProviderId,
    owner: Address,
    record: PackedProvider,
    liquidity_provided: U256,
    receiver: String,
    slot: Option<ProviderSlot>,
}

impl Provider {
    /// A zeroed provider.
    #[must_use]
    pub const fn new(id: ProviderId, owner: Address) -> Self {
        Self {
            id,
            owner,
            record: PackedProvider {
                active: false,
                priority: false,
                can_provide_liquidity: false,
                is_lp: false,
                pending_removal: false,
                liquidity: 0,
                reserved: 0,
            },
            liquidity_provided: U256::zero(),
            receiver: String::new(),
            slot: None,
        }
    }

    pub(crate) fn load(store: &dyn KeyValueStore, token: &Address, id: ProviderId) -> Result<Self> {
        let key = id.to_bytes();
        let record = PackedProvider::from_word(&store.get(&StorageKey::for_token(
            Namespace::ProviderWord,
            token,
            &key,
        )))?;
        let liquidity_provided = decode_u256(&store.get(&StorageKey::for_token(
            Namespace::ProviderProvided,
            token,
            &key,
        )));
        let slot = decode_slot(&store.get(&StorageKey::for_token(
            Namespace::ProviderSlot,
            token,
            &key,
        )))?;
        let owner = Address::from_bytes(store.get(&StorageKey::for_token(
            Namespace::ProviderOwner,
            token,
            &key,
        )));
        let receiver = load_string(store, &ArrayKey::new(Namespace::ProviderReceiver, token, &key))?;
        Ok(Self {
            id,
            owner,
            record,
            liquidity_provided,
            receiver,
            slot,
        })
    }

    pub(crate) fn save(&self, store: &mut dyn KeyValueStore, token: &Address) -> Result<()> {
        let key = self.id.to_bytes();
        store.set(
            StorageKey::for_token(Namespace::ProviderWord, token, &key),
            self.record.to_word()?,
        );
        store.set(
            StorageKey::for_token(Namespace::ProviderProvided, token, &key),
            encode_u256(self.liquidity_provided),
        );
        store.set(
            StorageKey::for_token(Namespace::ProviderSlot, token, &key),
            encode_slot(self.slot)?,
        );
        store.set(
            StorageKey::for_token(Namespace::ProviderOwner, token, &key),
            self.owner.as_bytes(),
        );
        save_string(
            store,
            &ArrayKey::new(Namespace::ProviderReceiver, token, &key),
            &self.receiver,
        );
        Ok(())
    }

    // -- identity -------------------------------------------------------------

    /// Provider id.
    #[must_use]
    pub const fn id(&self) -> ProviderId {
        self.id
    }

    /// Owner address; zero until first referenced by its owner.
    #[must_use]
    pub const fn owner(&self) -> Address {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Address) {
        self.owner = owner;
    }

    /// BTC payout address.
    #[must_use]
    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    /// Replaces the payout address.
    pub fn set_receiver(&mut self, receiver: &str) {
        receiver.clone_into(&mut self.receiver);
    }

    /// Queue slot, if the provider is scheduled.
    #[must_use]
    pub const fn slot(&self) -> Option<ProviderSlot> {
        self.slot
    }

    /// Records the queue slot.
    pub fn set_slot(&mut self, slot: Option<ProviderSlot>) {
        self.slot = slot;
    }

    // -- flags ----------------------------------------------------------------

    /// Listing is live.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.record.active
    }

    /// Listing sits in the priority queue.
    #[must_use]
    pub const fn is_priority(&self) -> bool {
        self.record.priority
    }

    /// Listing has been folded into the virtual reserves.
    #[must_use]
    pub const fn can_provide_liquidity(&self) -> bool {
        self.record.can_provide_liquidity
    }

    /// Provider holds an LP deposit.
    #[must_use]
    pub const fn is_lp(&self) -> bool {
        self.record.is_lp
    }

    /// Provider withdrew its deposit and waits for BTC.
    #[must_use]
    pub const fn is_pending_removal(&self) -> bool {
        self.record.pending_removal
    }

    /// Marks the listing live.
    pub fn activate(&mut self, priority: bool) {
        self.record.active = true;
        self.record.priority = priority;
    }

    /// Folds the listing into the virtual reserves on first consumption.
    pub fn enable_liquidity_provision(&mut self) {
        self.record.can_provide_liquidity = true;
    }

    /// Marks the provider as holding an LP deposit.
    pub fn mark_lp(&mut self) {
        self.record.is_lp = true;
    }

    /// Sets or clears the pending-removal flag.
    pub fn set_pending_removal(&mut self, pending: bool) {
        self.record.pending_removal = pending;
    }

    // -- amounts --------------------------------------------------------------

    /// Listed tokens, reserved ones included.
    #[must_use]
    pub const fn liquidity(&self) -> u128 {
        self.record.liquidity
    }

    /// Tokens held by live reservations.
    #[must_use]
    pub const fn reserved(&self) -> u128 {
        self.record.reserved
    }

    /// Tokens available for new reservations.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Invariant`] if `liquidity < reserved`.
    pub fn available(&self) -> Result<u128> {
        self.record
            .liquidity
            .checked_sub(self.record.reserved)
            .ok_or(SwapError::Invariant("provider liquidity below reserved"))
    }

    /// Cumulative LP deposit.
    #[must_use]
    pub const fn liquidity_provided(&self) -> U256 {
        self.liquidity_provided
    }

    /// Adds listed tokens.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Overflow`] on overflow.
    pub fn add_liquidity(&mut self, amount: u128) -> Result<()> {
        self.record.liquidity = self.record.liquidity.safe_add(&amount)?;
        Ok(())
    }

    /// Removes listed tokens.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Invariant`] if fewer than `amount` unreserved
    /// tokens remain.
    pub fn sub_liquidity(&mut self, amount: u128) -> Result<()> {
        let remaining = self
            .record
            .liquidity
            .checked_sub(amount)
            .ok_or(SwapError::Invariant("provider liquidity underflow"))?;
        if remaining < self.record.reserved {
            return Err(SwapError::Invariant("provider liquidity below reserved"));
        }
        self.record.liquidity = remaining;
        Ok(())
    }

    /// Reserves `amount` tokens.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Invariant`] if the reservation would exceed the
    /// provider's liquidity.
    pub fn add_reserved(&mut self, amount: u128) -> Result<()> {
        let reserved = self.record.reserved.safe_add(&amount)?;
        if reserved > self.record.liquidity {
            return Err(SwapError::Invariant("provider liquidity below reserved"));
        }
        self.record.reserved = reserved;
        Ok(())
    }

    /// Releases `amount` reserved tokens.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Invariant`] if fewer than `amount` are reserved.
    pub fn sub_reserved(&mut self, amount: u128) -> Result<()> {
        self.record.reserved = self
            .record
            .reserved
            .checked_sub(amount)
            .ok_or(SwapError::Invariant("provider reserved underflow"))?;
        Ok(())
    }

    /// Adds to the cumulative LP deposit.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Overflow`] on overflow.
    pub fn add_liquidity_provided(&mut self, amount: u128) -> Result<()> {
        self.liquidity_provided = self.liquidity_provided.safe_add(&U256::from(amount))?;
        Ok(())
    }

    /// Clears the cumulative LP deposit, returning its previous value.
    pub fn take_liquidity_provided(&mut self) -> U256 {
        core::mem::take(&mut self.liquidity_provided)
    }

    /// Zeroes flags, amounts and the queue slot, returning the liquidity
    /// that was still listed. The owner and payout address are kept.
    pub fn reset(&mut self) -> u128 {
        let remaining = self.record.liquidity;
        self.record = PackedProvider::default();
        self.liquidity_provided = U256::zero();
        self.slot = None;
        remaining
    }
}
