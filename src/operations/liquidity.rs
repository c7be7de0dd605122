//! Liquidity-provider deposits and withdrawals.

use primitive_types::U256;

use super::swap::active_reservation;
use super::Call;
use crate::domain::is_valid_receiver;
use crate::error::{Result, SwapError};

/// Outcome of [`NativeSwap::remove_liquidity`](super::NativeSwap::remove_liquidity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedLiquidity {
    /// Tokens returned to the provider.
    pub tokens: u128,
    /// Satoshis the provider is owed through the removal queue.
    pub btc_owed: U256,
}

pub(super) fn add_liquidity(call: &mut Call<'_, '_>, receiver: &str) -> Result<u128> {
    if !is_valid_receiver(receiver) {
        return Err(SwapError::InvalidAddress("liquidity receiver"));
    }
    let reservation = active_reservation(call)?;
    if !reservation.is_for_liquidity_pool() {
        return Err(SwapError::ReservationInvalid(
            "reservation is not for liquidity provision",
        ));
    }
    let owner = call.sender();
    let provider = call.repo.provider_for_owner(&owner)?;
    if provider.is_pending_removal() {
        return Err(SwapError::Rejected("provider is pending removal"));
    }
    if provider.is_active() {
        return Err(SwapError::Rejected("provider has an active listing"));
    }

    let trade = call
        .queue
        .execute_trade(call.repo, call.env, &reservation, call.effects)?;
    let deposit = call.queue.credit_liquidity_provider(
        call.repo,
        &owner,
        receiver,
        &trade,
        call.effects,
    )?;
    call.queue.close_reservation(call.repo, &reservation)?;
    Ok(deposit)
}

pub(super) fn remove_liquidity(call: &mut Call<'_, '_>) -> Result<RemovedLiquidity> {
    let owner = call.sender();
    let (tokens, btc_owed) = call.queue.remove_liquidity(call.repo, &owner, call.effects)?;
    Ok(RemovedLiquidity { tokens, btc_owed })
}
