//! Per-token market state and the operations that mutate it.
//!
//! A [`LiquidityQueue`] is loaded at the start of every call. Loading purges
//! expired reservations, advances the queue watermarks and folds pending
//! virtual-pool deltas, so every operation sees housekept state.

use primitive_types::U256;
use tracing::debug;

use super::{quote_history, BlockReservations, ProviderManager, VirtualPool};
use crate::config::{EngineConfig, PoolConfig};
use crate::context::{CallEffects, BURN_ADDRESS};
use crate::domain::{Address, ProviderId, ProviderSlot, QueueKind, Quote, ReservationId, Rounding};
use crate::error::{Result, SwapError};
use crate::events::SwapEvent;
use crate::math::{narrow_u128, CheckedArithmetic};
use crate::repository::Repository;
use crate::reservation::Reservation;
use crate::storage::{
    decode_u128, decode_u256, decode_u64, encode_u128, encode_u256, encode_u64, Namespace,
    StorageKey,
};

const INITIAL_PROVIDER: &[u8] = b"initial_provider";
const LIQUIDITY: &[u8] = b"liquidity";
const RESERVED_LIQUIDITY: &[u8] = b"reserved_liquidity";
const ANTI_BOT_EXPIRATION: &[u8] = b"anti_bot_expiration";
const ANTI_BOT_CAP: &[u8] = b"anti_bot_cap";
const MAX_RESERVED_PERCENT: &[u8] = b"max_reserved_percent";
const VOLATILITY: &[u8] = b"volatility";

fn scalar_key(token: &Address, name: &[u8]) -> StorageKey {
    StorageKey::for_token(Namespace::PoolScalar, token, name)
}

/// Outcome of a successful reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedLiquidity {
    /// Reservation id.
    pub reservation: ReservationId,
    /// Tokens reserved across all legs.
    pub tokens: u128,
    /// Satoshis the buyer must pay to collect them.
    pub satoshis: u64,
    /// Number of provider legs.
    pub legs: usize,
}

/// Market state of one token for the duration of a call.
#[derive(Debug, Clone)]
pub struct LiquidityQueue {
    pub(super) token: Address,
    pub(super) config: EngineConfig,
    pub(super) block: u64,
    pub(super) pool: VirtualPool,
    pub(super) manager: ProviderManager,
    pub(super) reservations: BlockReservations,
    pub(super) liquidity: u128,
    pub(super) reserved_liquidity: u128,
    anti_bot_expiration: u64,
    anti_bot_cap: u128,
    max_reserved_percent: u8,
    volatility: u64,
}

impl LiquidityQueue {
    /// Loads the market of `repo`'s token at `block` and runs housekeeping.
    ///
    /// Expired reservations are purged and their events buffered in
    /// `effects`.
    ///
    /// # Errors
    ///
    /// Propagates decoding and invariant errors raised while purging or
    /// cleaning the queues.
    pub fn load(
        repo: &mut Repository<'_>,
        config: &EngineConfig,
        block: u64,
        effects: &mut CallEffects,
    ) -> Result<Self> {
        let token = repo.token();
        let initial = decode_u256(&repo.get(&scalar_key(&token, INITIAL_PROVIDER)));
        let initial_provider = (!initial.is_zero()).then(|| ProviderId::from_u256(initial));
        let mut queue = Self {
            token,
            config: config.clone(),
            block,
            pool: VirtualPool::load(repo),
            manager: ProviderManager::load(
                repo,
                initial_provider,
                config.strict_minimum_provider_reservation(),
            )?,
            reservations: BlockReservations::load(repo),
            liquidity: decode_u128(&repo.get(&scalar_key(&token, LIQUIDITY))),
            reserved_liquidity: decode_u128(&repo.get(&scalar_key(&token, RESERVED_LIQUIDITY))),
            anti_bot_expiration: decode_u64(&repo.get(&scalar_key(&token, ANTI_BOT_EXPIRATION))),
            anti_bot_cap: decode_u128(&repo.get(&scalar_key(&token, ANTI_BOT_CAP))),
            max_reserved_percent: u8::try_from(decode_u64(
                &repo.get(&scalar_key(&token, MAX_RESERVED_PERCENT)),
            ))
            .map_err(|_| SwapError::Invariant("stored max reserved percent exceeds u8"))?,
            volatility: decode_u64(&repo.get(&scalar_key(&token, VOLATILITY))),
        };
        if queue.is_initialized() {
            queue.purge_expired_reservations(repo, effects)?;
            queue.manager.clean_up_queues(repo)?;
            queue.refresh_market(repo)?;
        }
        Ok(queue)
    }

    /// Persists every piece of market state.
    ///
    /// # Errors
    ///
    /// Propagates packing errors.
    pub fn save(&mut self, repo: &mut Repository<'_>) -> Result<()> {
        self.manager.save(repo)?;
        self.pool.save(repo);
        self.reservations.save(repo);
        let token = self.token;
        let initial = self
            .manager
            .initial_provider()
            .map_or(U256::zero(), |id| id.get());
        repo.set(scalar_key(&token, INITIAL_PROVIDER), encode_u256(initial));
        repo.set(scalar_key(&token, LIQUIDITY), encode_u128(self.liquidity));
        repo.set(
            scalar_key(&token, RESERVED_LIQUIDITY),
            encode_u128(self.reserved_liquidity),
        );
        repo.set(
            scalar_key(&token, ANTI_BOT_EXPIRATION),
            encode_u64(self.anti_bot_expiration),
        );
        repo.set(scalar_key(&token, ANTI_BOT_CAP), encode_u128(self.anti_bot_cap));
        repo.set(
            scalar_key(&token, MAX_RESERVED_PERCENT),
            encode_u64(u64::from(self.max_reserved_percent)),
        );
        repo.set(scalar_key(&token, VOLATILITY), encode_u64(self.volatility));
        Ok(())
    }

    fn refresh_market(&mut self, repo: &mut Repository<'_>) -> Result<()> {
        if self.pool.update_if_needed(self.block)? {
            quote_history::record_quote(repo, self.block, self.pool.quote()?);
            self.volatility =
                quote_history::volatility(repo, self.block, self.config.volatility_window());
        }
        Ok(())
    }

    // -- accessors ------------------------------------------------------------

    /// `true` once the pool has been created.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.manager.initial_provider().is_some()
    }

    /// Block of the current call.
    #[must_use]
    pub const fn block(&self) -> u64 {
        self.block
    }

    /// Engine constants in force.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The virtual market.
    #[must_use]
    pub const fn pool(&self) -> &VirtualPool {
        &self.pool
    }

    /// The provider scheduler.
    #[must_use]
    pub const fn manager(&self) -> &ProviderManager {
        &self.manager
    }

    /// Current tokens-per-satoshi quote.
    ///
    /// # Errors
    ///
    /// [`SwapError::PoolNotInitialized`] before the pool exists.
    pub fn quote(&self) -> Result<Quote> {
        if !self.is_initialized() {
            return Err(SwapError::PoolNotInitialized);
        }
        self.pool.quote()
    }

    /// Tokens listed across all providers.
    #[must_use]
    pub const fn liquidity(&self) -> u128 {
        self.liquidity
    }

    /// Tokens held by live reservations.
    #[must_use]
    pub const fn reserved_liquidity(&self) -> u128 {
        self.reserved_liquidity
    }

    /// Latest volatility estimate, in basis points.
    #[must_use]
    pub const fn volatility(&self) -> u64 {
        self.volatility
    }

    /// Returns `true` if `owner` is the pool's initial provider.
    #[must_use]
    pub fn is_initial_owner(&self, owner: &Address) -> bool {
        self.manager.initial_provider() == Some(ProviderId::derive(owner, &self.token))
    }

    /// Satoshis owed to provider `id` and the part of it already reserved.
    pub fn btc_owed(&mut self, repo: &Repository<'_>, id: ProviderId) -> (U256, U256) {
        (
            self.manager.btc_owed(repo, id),
            self.manager.btc_owed_reserved(repo, id),
        )
    }

    fn require_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(SwapError::PoolNotInitialized)
        }
    }

    // -- aggregates -----------------------------------------------------------

    pub(super) fn release_reserved(&mut self, amount: u128) -> Result<()> {
        self.reserved_liquidity = self
            .reserved_liquidity
            .checked_sub(amount)
            .ok_or(SwapError::Invariant("aggregate reserved liquidity underflow"))?;
        Ok(())
    }

    pub(super) fn remove_liquidity_total(&mut self, amount: u128) -> Result<()> {
        self.liquidity = self
            .liquidity
            .checked_sub(amount)
            .ok_or(SwapError::Invariant("aggregate liquidity underflow"))?;
        Ok(())
    }

    /// Satoshi value of `tokens` falls under the strict provider minimum.
    pub(super) fn is_dust(&self, tokens: u128, quote: Quote) -> Result<bool> {
        Ok(quote.tokens_to_satoshis(tokens, Rounding::Down)?
            < self.config.strict_minimum_provider_reservation())
    }

    /// Forfeits the listing of a non-initial provider whose unreserved
    /// remainder is worth less than the strict minimum.
    pub(super) fn reset_if_dust(
        &mut self,
        repo: &mut Repository<'_>,
        id: ProviderId,
        quote: Quote,
        effects: &mut CallEffects,
    ) -> Result<()> {
        if self.manager.initial_provider() == Some(id) {
            return Ok(());
        }
        let provider = repo.provider(id)?;
        if !provider.is_active() || provider.reserved() > 0 {
            return Ok(());
        }
        let remaining = provider.liquidity();
        if !self.is_dust(remaining, quote)? {
            return Ok(());
        }
        let burned = self.manager.reset_provider(repo, id, true)?;
        self.remove_liquidity_total(burned)?;
        effects.push(BURN_ADDRESS, burned);
        debug!(provider = %id, burned, "dust listing forfeited");
        Ok(())
    }

    // -- housekeeping ---------------------------------------------------------

    fn purge_expired_reservations(
        &mut self,
        repo: &mut Repository<'_>,
        effects: &mut CallEffects,
    ) -> Result<()> {
        let expiry = self.config.reservation_expiry_blocks();
        let mut restored = false;
        while let Some(block) = self
            .reservations
            .next_expired_block(repo, self.block, expiry)
        {
            for entry in BlockReservations::active_entries(repo, block) {
                let reservation = repo.reservation(entry.id)?.clone();
                let current = reservation.has_legs()
                    && reservation.creation_block() == block
                    && reservation.purge_index() == entry.index;
                if current {
                    self.restore_reservation(repo, &reservation, effects)?;
                    repo.reservation(entry.id)?.reset(true);
                    restored = true;
                    effects.emit(SwapEvent::ReservationPurged {
                        token: self.token,
                        reservation: entry.id,
                        block,
                    });
                    debug!(reservation = %entry.id, block, "expired reservation purged");
                }
                BlockReservations::deactivate(repo, block, entry.index);
            }
            self.reservations.advance();
        }
        if restored {
            self.manager.reset_starting_indexes();
        }
        Ok(())
    }

    /// Hands every leg of an abandoned reservation back to its provider.
    fn restore_reservation(
        &mut self,
        repo: &mut Repository<'_>,
        reservation: &Reservation,
        effects: &mut CallEffects,
    ) -> Result<()> {
        let quote = self.quote_at_creation(repo, reservation)?;
        for leg in reservation.legs() {
            let resolved = self.manager.resolve(repo, leg.slot);
            if leg.kind() == QueueKind::Removal {
                let Some(id) = resolved else {
                    continue;
                };
                let reserved = self.manager.btc_owed_reserved(repo, id);
                self.manager.set_btc_owed_reserved(
                    repo,
                    id,
                    reserved.saturating_sub(U256::from(leg.owed_satoshis)),
                );
                continue;
            }
            let id = resolved.ok_or(SwapError::Invariant("reserved provider slot is empty"))?;
            repo.provider(id)?.sub_reserved(leg.amount)?;
            self.release_reserved(leg.amount)?;
            self.reset_if_dust(repo, id, quote, effects)?;
        }
        Ok(())
    }

    /// Quote recorded in the block that created `reservation`.
    pub(super) fn quote_at_creation(
        &self,
        repo: &Repository<'_>,
        reservation: &Reservation,
    ) -> Result<Quote> {
        let recorded = quote_history::quote_at(repo, reservation.creation_block());
        if recorded.is_zero() {
            return self.quote();
        }
        Ok(recorded)
    }

    /// Consumes `reservation`: clears its legs and its purge entry.
    ///
    /// # Errors
    ///
    /// Propagates repository errors.
    pub fn close_reservation(
        &mut self,
        repo: &mut Repository<'_>,
        reservation: &Reservation,
    ) -> Result<()> {
        repo.reservation(reservation.id())?.reset(false);
        BlockReservations::deactivate(
            repo,
            reservation.creation_block(),
            reservation.purge_index(),
        );
        Ok(())
    }

    // -- pool lifecycle -------------------------------------------------------

    /// Seeds the pool with the initial provider's liquidity.
    ///
    /// # Errors
    ///
    /// - [`SwapError::PoolAlreadyInitialized`] for an existing pool.
    /// - Validation errors of `pool`.
    pub fn create_pool(
        &mut self,
        repo: &mut Repository<'_>,
        owner: &Address,
        pool: &PoolConfig,
        effects: &mut CallEffects,
    ) -> Result<()> {
        if self.is_initialized() {
            return Err(SwapError::PoolAlreadyInitialized);
        }
        pool.validate()?;
        let initial = pool.initial_liquidity();
        self.pool = VirtualPool::seed(pool.floor_price(), initial, self.block)?;

        let provider = repo.provider_for_owner(owner)?;
        provider.activate(false);
        provider.enable_liquidity_provision();
        provider.add_liquidity(initial)?;
        provider.set_receiver(pool.receiver());
        provider.set_slot(Some(ProviderSlot::InitialProvider));
        let id = provider.id();
        self.manager.set_initial_provider(id);

        self.liquidity = initial;
        self.reserved_liquidity = 0;
        if pool.anti_bot_blocks() > 0 {
            self.anti_bot_expiration = self.block.saturating_add(pool.anti_bot_blocks());
            self.anti_bot_cap = pool.anti_bot_max_tokens();
        }
        self.max_reserved_percent = pool.max_reserved_percent();
        quote_history::record_quote(repo, self.block, self.pool.quote()?);

        effects.pull(*owner, initial);
        effects.emit(SwapEvent::PoolCreated {
            token: self.token,
            initial_liquidity: initial,
            floor_price: pool.floor_price(),
        });
        Ok(())
    }

    // -- listings -------------------------------------------------------------

    /// Adds `amount` tokens to `owner`'s listing, paid out to `receiver`.
    ///
    /// Priority listings keep back the priority tax, which enters the
    /// virtual pool as a sell. Returns the tokens actually listed.
    ///
    /// # Errors
    ///
    /// - [`SwapError::Rejected`] for the initial provider, LPs, providers
    ///   pending removal, a receiver change while reserved, or switching a
    ///   live normal listing to priority.
    /// - [`SwapError::InvalidAmount`] for a listing worth less than the
    ///   minimum listing value.
    pub fn list_liquidity(
        &mut self,
        repo: &mut Repository<'_>,
        owner: &Address,
        receiver: &str,
        amount: u128,
        priority: bool,
        effects: &mut CallEffects,
    ) -> Result<u128> {
        self.require_initialized()?;
        if self.is_initial_owner(owner) {
            return Err(SwapError::Rejected("initial provider cannot list"));
        }
        let quote = self.quote()?;
        if quote.tokens_to_satoshis(amount, Rounding::Down)? < self.config.minimum_listing_value()
        {
            return Err(SwapError::InvalidAmount("listing value below minimum"));
        }
        let tax = if priority {
            self.config.priority_tax().apply(amount, Rounding::Down)?
        } else {
            0
        };
        let net = amount.safe_sub(&tax)?;

        let provider = repo.provider_for_owner(owner)?;
        if provider.is_pending_removal() {
            return Err(SwapError::Rejected("provider is pending removal"));
        }
        if provider.is_lp() {
            return Err(SwapError::Rejected("liquidity providers cannot list"));
        }
        if provider.reserved() > 0 && provider.receiver() != receiver {
            return Err(SwapError::Rejected(
                "cannot change receiver while tokens are reserved",
            ));
        }
        if priority && provider.is_active() && !provider.is_priority() {
            return Err(SwapError::Rejected(
                "cannot switch a normal listing to priority",
            ));
        }
        provider.add_liquidity(net)?;
        provider.set_receiver(receiver);
        let was_active = provider.is_active();
        if !was_active {
            provider.activate(priority);
        }
        let in_market = provider.can_provide_liquidity();
        let kind = if provider.is_priority() {
            QueueKind::Priority
        } else {
            QueueKind::Normal
        };
        let total_liquidity = provider.liquidity();
        let id = provider.id();

        self.liquidity = self.liquidity.safe_add(&net)?;
        if in_market {
            self.pool.add_tokens(net)?;
        }
        if tax > 0 {
            self.pool.record_sell(tax)?;
        }
        if !was_active {
            self.manager.add_to_queue(repo, id, kind)?;
        }

        effects.pull(*owner, amount);
        effects.emit(SwapEvent::LiquidityListed {
            token: self.token,
            provider: id,
            amount: net,
            total_liquidity,
            priority: kind == QueueKind::Priority,
        });
        debug!(provider = %id, net, tax, %kind, "liquidity listed");
        Ok(net)
    }

    /// Returns `owner`'s whole unreserved listing.
    ///
    /// # Errors
    ///
    /// [`SwapError::Rejected`] for the initial provider, an inactive
    /// provider or a listing with reserved tokens.
    pub fn cancel_listing(
        &mut self,
        repo: &mut Repository<'_>,
        owner: &Address,
        effects: &mut CallEffects,
    ) -> Result<u128> {
        self.require_initialized()?;
        if self.is_initial_owner(owner) {
            return Err(SwapError::Rejected("initial provider cannot cancel"));
        }
        let provider = repo.provider_for_owner(owner)?;
        if !provider.is_active() {
            return Err(SwapError::Rejected("provider has no active listing"));
        }
        if provider.reserved() > 0 {
            return Err(SwapError::Rejected("listing has reserved tokens"));
        }
        let amount = provider.liquidity();
        let in_market = provider.can_provide_liquidity();
        let id = provider.id();
        provider.sub_liquidity(amount)?;

        self.remove_liquidity_total(amount)?;
        if in_market {
            self.pool.withdraw_tokens(amount)?;
        }
        self.manager.reset_provider(repo, id, false)?;

        effects.push(*owner, amount);
        effects.emit(SwapEvent::ListingCanceled {
            token: self.token,
            provider: id,
            amount,
        });
        Ok(amount)
    }

    // -- reservations ---------------------------------------------------------

    /// Reserves up to `max_sats` worth of tokens for `buyer`.
    ///
    /// Providers are drawn removal queue first, then priority, then normal,
    /// then the initial provider. Legs worth less than the minimum provider
    /// reservation are skipped.
    ///
    /// # Errors
    ///
    /// - [`SwapError::Rejected`] for the initial provider or an order above
    ///   the armed anti-bot cap.
    /// - [`SwapError::DuplicateReservation`] / [`SwapError::BuyerTimedOut`].
    /// - [`SwapError::InsufficientLiquidity`] when nothing can be reserved
    ///   or the reserved share is at its limit.
    /// - [`SwapError::SlippageExceeded`] below `min_tokens`.
    pub fn reserve(
        &mut self,
        repo: &mut Repository<'_>,
        buyer: &Address,
        max_sats: u64,
        min_tokens: u128,
        for_liquidity_pool: bool,
        effects: &mut CallEffects,
    ) -> Result<ReservedLiquidity> {
        self.require_initialized()?;
        if self.is_initial_owner(buyer) {
            return Err(SwapError::Rejected("initial provider cannot reserve"));
        }
        let existing = repo.reservation_for_buyer(buyer)?;
        if existing.is_valid(self.block) {
            return Err(SwapError::DuplicateReservation);
        }
        if self.config.enforce_timeout() {
            if let Some(until) =
                existing.timed_out_until(self.block, self.config.timeout_after_expiration())
            {
                return Err(SwapError::BuyerTimedOut { until });
            }
        }
        let reservation_id = existing.id();

        let quote = self.quote()?;
        if quote.is_zero() || self.liquidity == 0 {
            return Err(SwapError::InsufficientLiquidity("no liquidity listed"));
        }
        let reserved_share = U256::from(self.reserved_liquidity) * U256::from(100u8);
        let limit = U256::from(self.liquidity) * U256::from(self.max_reserved_percent);
        if reserved_share >= limit {
            return Err(SwapError::InsufficientLiquidity(
                "reserved share at the pool limit",
            ));
        }
        let wanted = quote.satoshis_to_tokens(max_sats, Rounding::Down)?;
        let anti_bot_armed = self.anti_bot_cap > 0 && self.block <= self.anti_bot_expiration;
        if anti_bot_armed && wanted > self.anti_bot_cap {
            return Err(SwapError::Rejected("order exceeds the anti-bot cap"));
        }

        let legs = self.fill_legs(repo, quote, wanted)?;
        let tokens: u128 = legs.iter().map(|leg| leg.tokens).sum();
        let satoshis = legs
            .iter()
            .try_fold(0u64, |total, leg| total.safe_add(&leg.satoshis))?;
        if tokens == 0 {
            return Err(SwapError::InsufficientLiquidity(
                "no provider liquidity available",
            ));
        }
        if tokens < min_tokens {
            return Err(SwapError::SlippageExceeded {
                reserved: tokens,
                minimum: min_tokens,
            });
        }

        let expiration = self
            .block
            .saturating_add(self.config.reservation_expiry_blocks());
        let purge_index = self.reservations.push(repo, self.block, reservation_id)?;
        let reservation = repo.reservation(reservation_id)?;
        reservation.open(self.block, expiration, for_liquidity_pool);
        reservation.set_purge_index(purge_index);
        for leg in &legs {
            if leg.slot.kind() == QueueKind::Removal {
                reservation.add_removal_leg(leg.slot, leg.tokens, leg.satoshis)?;
            } else {
                reservation.add_leg(leg.slot, leg.tokens)?;
            }
        }

        effects.emit(SwapEvent::ReservationCreated {
            token: self.token,
            reservation: reservation_id,
            buyer: *buyer,
            tokens,
            satoshis,
            legs: legs.len(),
        });
        debug!(
            reservation = %reservation_id,
            tokens,
            satoshis,
            legs = legs.len(),
            "liquidity reserved"
        );
        Ok(ReservedLiquidity {
            reservation: reservation_id,
            tokens,
            satoshis,
            legs: legs.len(),
        })
    }

    fn fill_legs(
        &mut self,
        repo: &mut Repository<'_>,
        quote: Quote,
        wanted: u128,
    ) -> Result<Vec<PlannedLeg>> {
        let max_legs = usize::try_from(self.config.max_providers_per_reservation())
            .unwrap_or(usize::MAX);
        let minimum = self.config.minimum_provider_reservation();
        let mut legs = Vec::new();
        let mut remaining = wanted;

        while remaining > 0 && legs.len() < max_legs {
            let Some(next) = self.manager.next_provider_with_liquidity(repo)? else {
                break;
            };
            let (take, satoshis) = if next.slot.kind() == QueueKind::Removal {
                let owed = self.manager.btc_owed(repo, next.id);
                let owed_reserved = self.manager.btc_owed_reserved(repo, next.id);
                let left = owed
                    .checked_sub(owed_reserved)
                    .ok_or(SwapError::Invariant("BTC owed below BTC owed reserved"))?;
                let left_sats = if left > U256::from(u64::MAX) {
                    u64::MAX
                } else {
                    left.low_u64()
                };
                let left_tokens = quote.satoshis_to_tokens(left_sats, Rounding::Down)?;
                let take = remaining.min(left_tokens);
                if take == 0 {
                    self.manager.note_skipped(next.slot);
                    continue;
                }
                let satoshis = if take == left_tokens {
                    left_sats
                } else {
                    quote.tokens_to_satoshis(take, Rounding::Up)?.min(left_sats)
                };
                if satoshis < minimum {
                    if take == remaining {
                        break;
                    }
                    self.manager.note_skipped(next.slot);
                    continue;
                }
                self.manager.set_btc_owed_reserved(
                    repo,
                    next.id,
                    owed_reserved.safe_add(&U256::from(satoshis))?,
                );
                (take, satoshis)
            } else {
                let provider = repo.provider(next.id)?;
                let available = provider.available()?;
                if available == 0 {
                    break;
                }
                let take = remaining.min(available);
                let satoshis = quote.tokens_to_satoshis(take, Rounding::Up)?;
                if satoshis < minimum {
                    if take == remaining || next.slot.is_initial() {
                        break;
                    }
                    self.manager.note_skipped(next.slot);
                    continue;
                }
                provider.add_reserved(take)?;
                self.reserved_liquidity = self.reserved_liquidity.safe_add(&take)?;
                (take, satoshis)
            };
            debug!(provider = %next.id, slot = %next.slot, take, satoshis, "leg reserved");
            legs.push(PlannedLeg {
                slot: next.slot,
                tokens: take,
                satoshis,
            });
            remaining -= take;
        }
        Ok(legs)
    }

    // -- liquidity pool positions ---------------------------------------------

    /// Withdraws `owner`'s pooled deposit and queues the BTC it is owed.
    ///
    /// Returns the tokens returned and the satoshis now owed. A debt below
    /// the strict minimum is forfeited and the provider reset instead.
    ///
    /// # Errors
    ///
    /// [`SwapError::Rejected`] for non-LPs, a pending removal or a live
    /// listing; [`SwapError::InvalidAmount`] for an empty position.
    pub fn remove_liquidity(
        &mut self,
        repo: &mut Repository<'_>,
        owner: &Address,
        effects: &mut CallEffects,
    ) -> Result<(u128, U256)> {
        self.require_initialized()?;
        let quote = self.quote()?;
        let provider = repo.provider_for_owner(owner)?;
        if !provider.is_lp() {
            return Err(SwapError::Rejected("not a liquidity provider"));
        }
        if provider.is_pending_removal() {
            return Err(SwapError::Rejected("removal already pending"));
        }
        if provider.is_active() {
            return Err(SwapError::Rejected("provider has an active listing"));
        }
        if provider.liquidity_provided().is_zero() {
            return Err(SwapError::InvalidAmount("no liquidity to remove"));
        }
        let tokens = narrow_u128(
            provider.take_liquidity_provided(),
            "liquidity provided exceeds u128",
        )?;
        let id = provider.id();
        let owed = U256::from(quote.tokens_to_satoshis(tokens, Rounding::Down)?);
        self.pool.withdraw_tokens(tokens)?;

        let strict = U256::from(self.config.strict_minimum_provider_reservation());
        let owed = if owed < strict {
            repo.provider(id)?.reset();
            debug!(provider = %id, %owed, "dust BTC claim forfeited");
            U256::zero()
        } else {
            repo.provider(id)?.set_pending_removal(true);
            self.manager.set_btc_owed(repo, id, owed);
            self.manager.set_btc_owed_reserved(repo, id, U256::zero());
            self.manager.add_to_queue(repo, id, QueueKind::Removal)?;
            owed
        };

        effects.push(*owner, tokens);
        effects.emit(SwapEvent::LiquidityRemoved {
            token: self.token,
            provider: id,
            tokens,
            btc_owed: owed,
        });
        Ok((tokens, owed))
    }
}

#[derive(Debug, Clone, Copy)]
struct PlannedLeg {
    slot: ProviderSlot,
    tokens: u128,
    satoshis: u64,
}
