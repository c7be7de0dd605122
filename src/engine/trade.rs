//! Settlement of a reservation against the BTC outputs of a transaction.

use std::collections::BTreeMap;

use primitive_types::U256;
use tracing::debug;

use super::LiquidityQueue;
use crate::context::{CallEffects, CallEnv};
use crate::domain::{Address, ProviderId, QueueKind, Quote, Rounding};
use crate::error::{Result, SwapError};
use crate::events::SwapEvent;
use crate::fee::DynamicFee;
use crate::math::CheckedArithmetic;
use crate::repository::Repository;
use crate::reservation::{Reservation, ReservationLeg};

/// Totals of a settled reservation.
///
/// Tokens bought from listing providers are *purchased*; tokens credited
/// against the BTC debt of removal-queue providers are *refunded*.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletedTrade {
    /// Tokens taken from listing providers.
    pub tokens_purchased: u128,
    /// Satoshis paid to listing providers.
    pub satoshis_spent: u64,
    /// Tokens credited against removal-queue debt.
    pub tokens_refunded: u128,
    /// Satoshis paid to removal-queue providers.
    pub satoshis_refunded: u64,
}

impl CompletedTrade {
    /// Every token the buyer is owed.
    #[must_use]
    pub const fn total_tokens(&self) -> u128 {
        self.tokens_purchased.saturating_add(self.tokens_refunded)
    }

    /// Every satoshi matched to a leg.
    #[must_use]
    pub const fn total_satoshis(&self) -> u64 {
        self.satoshis_spent.saturating_add(self.satoshis_refunded)
    }
}

/// Satoshis of the transaction already matched to legs, per receiver.
#[derive(Debug, Default)]
struct PaymentLedger {
    attributed: BTreeMap<String, u64>,
}

impl PaymentLedger {
    fn unattributed(&self, env: &CallEnv, receiver: &str) -> Result<u64> {
        let paid = env.paid_to(receiver)?;
        let used = self.attributed.get(receiver).copied().unwrap_or_default();
        Ok(paid.saturating_sub(used))
    }

    fn attribute(&mut self, receiver: &str, satoshis: u64) -> Result<()> {
        let entry = self.attributed.entry(receiver.to_owned()).or_default();
        *entry = entry.safe_add(&satoshis)?;
        Ok(())
    }
}

/// Tokens bought by `paid` satoshis out of at most `cap` tokens, and the
/// satoshis that purchase actually uses.
fn fill(quote: Quote, paid: u64, cap: u128) -> Result<(u128, u64)> {
    let desired = quote.satoshis_to_tokens(paid, Rounding::Down)?;
    if desired <= cap {
        return Ok((desired, paid));
    }
    let used = quote.tokens_to_satoshis(cap, Rounding::Up)?.min(paid);
    Ok((cap, used))
}

impl LiquidityQueue {
    /// Settles every leg of `reservation` against the outputs of `env`.
    ///
    /// Legs are priced at the quote of the reservation's creation block.
    /// A leg whose provider received nothing releases its reservation; a
    /// paid leg transfers tokens in proportion to the payment, capped by
    /// the leg.
    ///
    /// # Errors
    ///
    /// - [`SwapError::NothingPurchased`] when no leg was paid.
    /// - [`SwapError::Invariant`] if a listing leg's slot is empty.
    pub fn execute_trade(
        &mut self,
        repo: &mut Repository<'_>,
        env: &CallEnv,
        reservation: &Reservation,
        effects: &mut CallEffects,
    ) -> Result<CompletedTrade> {
        let quote = self.quote_at_creation(repo, reservation)?;
        let mut ledger = PaymentLedger::default();
        let mut trade = CompletedTrade::default();

        for leg in reservation.legs() {
            if leg.kind() == QueueKind::Removal {
                self.settle_removal_leg(repo, env, quote, leg, &mut ledger, &mut trade, effects)?;
            } else {
                self.settle_listing_leg(repo, env, quote, leg, &mut ledger, &mut trade, effects)?;
            }
        }

        if trade.total_tokens() == 0 {
            return Err(SwapError::NothingPurchased);
        }
        debug!(
            reservation = %reservation.id(),
            purchased = trade.tokens_purchased,
            refunded = trade.tokens_refunded,
            satoshis = trade.total_satoshis(),
            "trade executed"
        );
        Ok(trade)
    }

    #[allow(clippy::too_many_arguments)]
    fn settle_listing_leg(
        &mut self,
        repo: &mut Repository<'_>,
        env: &CallEnv,
        quote: Quote,
        leg: &ReservationLeg,
        ledger: &mut PaymentLedger,
        trade: &mut CompletedTrade,
        effects: &mut CallEffects,
    ) -> Result<()> {
        let id = self
            .manager
            .resolve(repo, leg.slot)
            .ok_or(SwapError::Invariant("reserved provider slot is empty"))?;
        let receiver = repo.provider(id)?.receiver().to_owned();
        let paid = ledger.unattributed(env, &receiver)?;
        if paid == 0 {
            repo.provider(id)?.sub_reserved(leg.amount)?;
            self.release_reserved(leg.amount)?;
            debug!(provider = %id, amount = leg.amount, "unpaid leg released");
            return self.reset_if_dust(repo, id, quote, effects);
        }

        let provider = repo.provider(id)?;
        let cap = leg.amount.min(provider.liquidity());
        let (tokens, used) = fill(quote, paid, cap)?;
        let first_sale = !provider.can_provide_liquidity();
        let listed_before = provider.liquidity();
        provider.sub_reserved(leg.amount)?;
        provider.sub_liquidity(tokens)?;
        if first_sale {
            provider.enable_liquidity_provision();
            self.pool.add_tokens(listed_before)?;
        }
        self.release_reserved(leg.amount)?;
        self.remove_liquidity_total(tokens)?;

        ledger.attribute(&receiver, used)?;
        trade.tokens_purchased = trade.tokens_purchased.safe_add(&tokens)?;
        trade.satoshis_spent = trade.satoshis_spent.safe_add(&used)?;
        self.report_consumed(id, tokens, used, effects);
        self.reset_if_dust(repo, id, quote, effects)
    }

    #[allow(clippy::too_many_arguments)]
    fn settle_removal_leg(
        &mut self,
        repo: &mut Repository<'_>,
        env: &CallEnv,
        quote: Quote,
        leg: &ReservationLeg,
        ledger: &mut PaymentLedger,
        trade: &mut CompletedTrade,
        effects: &mut CallEffects,
    ) -> Result<()> {
        let Some(id) = self.manager.resolve(repo, leg.slot) else {
            debug!(slot = %leg.slot, "removal leg of an evicted provider skipped");
            return Ok(());
        };
        let provider = repo.provider(id)?;
        if !provider.is_pending_removal() {
            return Ok(());
        }
        let receiver = provider.receiver().to_owned();
        let owed = self.manager.btc_owed(repo, id);
        let owed_reserved = self.manager.btc_owed_reserved(repo, id);
        let leg_sats = U256::from(leg.owed_satoshis).min(owed_reserved);
        let owed_reserved = owed_reserved - leg_sats;

        let paid = ledger.unattributed(env, &receiver)?;
        if paid == 0 {
            self.manager.set_btc_owed_reserved(repo, id, owed_reserved);
            return Ok(());
        }

        let (tokens, used) = fill(quote, paid, leg.amount)?;
        let used = U256::from(used).min(leg_sats);
        let used_sats = used.low_u64();
        let owed = owed
            .checked_sub(used)
            .ok_or(SwapError::Invariant("BTC owed below settled amount"))?;

        ledger.attribute(&receiver, used_sats)?;
        trade.tokens_refunded = trade.tokens_refunded.safe_add(&tokens)?;
        trade.satoshis_refunded = trade.satoshis_refunded.safe_add(&used_sats)?;
        self.report_consumed(id, tokens, used_sats, effects);

        if owed < U256::from(self.config.strict_minimum_provider_reservation()) {
            self.manager.evict_from_removal_queue(repo, id)?;
        } else {
            self.manager.set_btc_owed(repo, id, owed);
            self.manager.set_btc_owed_reserved(repo, id, owed_reserved);
        }
        Ok(())
    }

    fn report_consumed(&self, provider: ProviderId, tokens: u128, satoshis: u64, effects: &mut CallEffects) {
        debug!(provider = %provider, tokens, satoshis, "leg settled");
        effects.emit(SwapEvent::ProviderConsumed {
            token: self.token,
            provider,
            tokens,
            satoshis,
        });
    }

    // -- post-trade accounting ------------------------------------------------

    /// Delivers a settled swap to `buyer`, keeping the dynamic fee in the
    /// pool. Returns the tokens delivered.
    ///
    /// # Errors
    ///
    /// Propagates arithmetic errors.
    pub fn settle_swap(
        &mut self,
        buyer: &Address,
        trade: &CompletedTrade,
        effects: &mut CallEffects,
    ) -> Result<u128> {
        let total = trade.total_tokens();
        let satoshis = trade.total_satoshis();
        let fee = DynamicFee::new(*self.config.fee()).fee(total, satoshis, self.volatility())?;
        let delivered = total.safe_sub(&fee)?;

        self.pool.record_buy(total, satoshis)?;
        self.pool.add_tokens(fee)?;
        effects.push(*buyer, delivered);
        effects.emit(SwapEvent::SwapExecuted {
            token: self.token,
            buyer: *buyer,
            tokens_delivered: delivered,
            satoshis_spent: satoshis,
            fee_tokens: fee,
        });
        Ok(delivered)
    }

    /// Turns a settled LP reservation into a pooled position for `owner`.
    ///
    /// The purchased tokens stay in the pool and `owner` deposits the same
    /// amount again. Returns the deposit.
    ///
    /// # Errors
    ///
    /// Propagates repository and arithmetic errors.
    pub fn credit_liquidity_provider(
        &mut self,
        repo: &mut Repository<'_>,
        owner: &Address,
        receiver: &str,
        trade: &CompletedTrade,
        effects: &mut CallEffects,
    ) -> Result<u128> {
        let deposit = trade.total_tokens();
        let satoshis = trade.total_satoshis();
        let provider = repo.provider_for_owner(owner)?;
        provider.mark_lp();
        provider.set_receiver(receiver);
        provider.add_liquidity_provided(deposit)?;
        let id = provider.id();

        self.pool.record_buy(deposit, satoshis)?;
        self.pool.add_tokens(deposit.safe_mul(&2)?)?;
        effects.pull(*owner, deposit);
        effects.emit(SwapEvent::LiquidityAdded {
            token: self.token,
            provider: id,
            tokens: deposit,
            satoshis,
        });
        Ok(deposit)
    }
}
