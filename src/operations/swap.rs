use super::Call;
use crate::error::{Result, SwapError};
use crate::reservation::Reservation;

/// Live reservation of the sender, cloned out of the repository cache.
pub(super) fn active_reservation(call: &mut Call<'_, '_>) -> Result<Reservation> {
    let buyer = call.sender();
    let block = call.queue.block();
    let reservation = call.repo.reservation_for_buyer(&buyer)?;
    if !reservation.is_valid(block) {
        return Err(SwapError::ReservationInvalid("no active reservation"));
    }
    Ok(reservation.clone())
}

pub(super) fn swap(call: &mut Call<'_, '_>) -> Result<u128> {
    let reservation = active_reservation(call)?;
    if reservation.is_for_liquidity_pool() {
        return Err(SwapError::ReservationInvalid(
            "reservation is for liquidity provision",
        ));
    }
    let trade = call
        .queue
        .execute_trade(call.repo, call.env, &reservation, call.effects)?;
    let buyer = call.sender();
    let delivered = call.queue.settle_swap(&buyer, &trade, call.effects)?;
    call.queue.close_reservation(call.repo, &reservation)?;
    Ok(delivered)
}
