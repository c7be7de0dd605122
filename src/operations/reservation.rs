use super::Call;
use crate::engine::ReservedLiquidity;
use crate::error::{Result, SwapError};

pub(super) fn reserve_liquidity(
    call: &mut Call<'_, '_>,
    max_sats: u64,
    min_tokens: u128,
    for_liquidity_pool: bool,
) -> Result<ReservedLiquidity> {
    let config = call.queue.config();
    if max_sats < config.minimum_trade_size() {
        return Err(SwapError::InvalidAmount("order below minimum trade size"));
    }
    call.env
        .require_payment(config.fee_recipient(), config.reservation_fee())?;
    let buyer = call.sender();
    call.queue.reserve(
        call.repo,
        &buyer,
        max_sats,
        min_tokens,
        for_liquidity_pool,
        call.effects,
    )
}
