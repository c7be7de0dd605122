//! Listing and cancelling provider liquidity.

use super::Call;
use crate::domain::is_valid_receiver;
use crate::error::{Result, SwapError};

/// Priority listings also pay the priority fee in BTC to the fee recipient.
pub(super) fn list_liquidity(
    call: &mut Call<'_, '_>,
    receiver: &str,
    amount: u128,
    priority: bool,
) -> Result<u128> {
    if amount == 0 {
        return Err(SwapError::InvalidAmount("listing amount is zero"));
    }
    if !is_valid_receiver(receiver) {
        return Err(SwapError::InvalidAddress("listing receiver"));
    }
    if priority {
        let config = call.queue.config();
        call.env
            .require_payment(config.fee_recipient(), config.priority_listing_fee())?;
    }
    let owner = call.sender();
    call.queue
        .list_liquidity(call.repo, &owner, receiver, amount, priority, call.effects)
}

pub(super) fn cancel_listing(call: &mut Call<'_, '_>) -> Result<u128> {
    let owner = call.sender();
    call.queue.cancel_listing(call.repo, &owner, call.effects)
}
