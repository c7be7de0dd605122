//! Read-only snapshots.
//!
//! Views run the same load as a mutating call, so they report the state a
//! call at the host's block would see, but their writes are discarded.

use primitive_types::U256;

use super::Call;
use crate::domain::{Address, ProviderId, ProviderSlot, Quote, ReservationId};
use crate::error::Result;
use crate::reservation::ReservationLeg;

/// Market snapshot of one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolView {
    /// Tokens per satoshi, scaled.
    pub quote: Quote,
    /// Floor quote set at creation.
    pub floor_price: Quote,
    /// Virtual BTC reserve.
    pub virtual_btc: U256,
    /// Virtual token reserve.
    pub virtual_tokens: U256,
    /// Tokens listed across all providers.
    pub liquidity: u128,
    /// Tokens held by live reservations.
    pub reserved_liquidity: u128,
    /// Volatility estimate in basis points.
    pub volatility: u64,
}

/// One provider's record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDetails {
    pub id: ProviderId,
    pub liquidity: u128,
    pub reserved: u128,
    pub liquidity_provided: U256,
    pub receiver: String,
    pub active: bool,
    pub priority: bool,
    pub liquidity_provider: bool,
    pub pending_removal: bool,
    pub slot: Option<ProviderSlot>,
    /// Satoshis owed through the removal queue.
    pub btc_owed: U256,
    /// Part of `btc_owed` held by live reservations.
    pub btc_owed_reserved: U256,
}

/// One buyer's reservation. An absent reservation reports no legs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationDetails {
    pub id: ReservationId,
    pub tokens: u128,
    pub legs: Vec<ReservationLeg>,
    pub creation_block: u64,
    pub expiration_block: u64,
    pub for_liquidity_pool: bool,
    /// Still payable at the host's block.
    pub valid: bool,
}

pub(super) fn pool_view(call: &mut Call<'_, '_>) -> Result<PoolView> {
    let queue = &*call.queue;
    Ok(PoolView {
        quote: queue.quote()?,
        floor_price: queue.pool().floor_price(),
        virtual_btc: queue.pool().virtual_btc(),
        virtual_tokens: queue.pool().virtual_tokens(),
        liquidity: queue.liquidity(),
        reserved_liquidity: queue.reserved_liquidity(),
        volatility: queue.volatility(),
    })
}

pub(super) fn provider_details(call: &mut Call<'_, '_>, owner: &Address) -> Result<ProviderDetails> {
    let provider = call.repo.provider_for_owner(owner)?.clone();
    let (btc_owed, btc_owed_reserved) = call.queue.btc_owed(call.repo, provider.id());
    Ok(ProviderDetails {
        id: provider.id(),
        liquidity: provider.liquidity(),
        reserved: provider.reserved(),
        liquidity_provided: provider.liquidity_provided(),
        receiver: provider.receiver().to_owned(),
        active: provider.is_active(),
        priority: provider.is_priority(),
        liquidity_provider: provider.is_lp(),
        pending_removal: provider.is_pending_removal(),
        slot: provider.slot(),
        btc_owed,
        btc_owed_reserved,
    })
}

pub(super) fn reservation_details(call: &mut Call<'_, '_>, buyer: &Address) -> Result<ReservationDetails> {
    let block = call.queue.block();
    let reservation = call.repo.reservation_for_buyer(buyer)?;
    Ok(ReservationDetails {
        id: reservation.id(),
        tokens: reservation.total_reserved(),
        legs: reservation.legs().to_vec(),
        creation_block: reservation.creation_block(),
        expiration_block: reservation.expiration_block(),
        for_liquidity_pool: reservation.is_for_liquidity_pool(),
        valid: reservation.is_valid(block),
    })
}
