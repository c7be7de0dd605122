//! Public entry points.
//!
//! Every operation runs as one call against [`NativeSwap`]:
//!
//! 1. capture the host environment,
//! 2. load the token's [`LiquidityQueue`] (purging expired reservations),
//! 3. run the handler,
//! 4. save and flush into the call's write overlay.
//!
//! On success the buffered token pulls run first, then the overlay is
//! applied to the store, then payouts and events reach the host. On any
//! error nothing is written and nothing is reported.

mod liquidity;
mod listing;
mod pool;
mod reservation;
mod swap;
mod views;

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::{EngineConfig, PoolConfig};
use crate::context::{CallEffects, CallEnv};
use crate::domain::Address;
use crate::engine::{LiquidityQueue, ReservedLiquidity};
use crate::error::{Result, SwapError};
use crate::repository::Repository;
use crate::storage::{apply_writes, StorageKey};
use crate::traits::{Host, KeyValueStore, Word};

pub use liquidity::RemovedLiquidity;
pub use views::{PoolView, ProviderDetails, ReservationDetails};

/// State handed to an operation handler.
pub(crate) struct Call<'c, 'a> {
    pub(crate) repo: &'c mut Repository<'a>,
    pub(crate) queue: &'c mut LiquidityQueue,
    pub(crate) env: &'c CallEnv,
    pub(crate) effects: &'c mut CallEffects,
}

impl Call<'_, '_> {
    pub(crate) fn sender(&self) -> Address {
        self.env.sender()
    }
}

/// The exchange: a persistent store plus the engine constants.
///
/// # Examples
///
/// ```
/// use native_swap::config::{EngineConfig, PoolConfig};
/// use native_swap::domain::Address;
/// use native_swap::host::MemoryHost;
/// use native_swap::operations::NativeSwap;
/// use native_swap::storage::MemoryStore;
///
/// let token = Address::from_bytes([7; 32]);
/// let creator = Address::from_bytes([1; 32]);
/// let mut host = MemoryHost::new();
/// host.set_block(100);
/// host.set_sender(creator);
/// host.mint(&token, &creator, 1_000_000_000);
///
/// let mut swap = NativeSwap::new(MemoryStore::new(), EngineConfig::default()).expect("valid config");
/// let pool = PoolConfig::new(10_000_000_000, 1_000_000_000, "bc1qcreator", 0, 0, 50).expect("valid pool");
/// swap.create_pool(&mut host, &token, &pool).expect("pool created");
///
/// let view = swap.quote(&host, &token).expect("priced");
/// assert_eq!(view.liquidity, 1_000_000_000);
/// ```
#[derive(Debug, Clone)]
pub struct NativeSwap<S> {
    store: S,
    config: EngineConfig,
}

impl<S: KeyValueStore> NativeSwap<S> {
    /// Wraps `store` with validated engine constants.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::InvalidConfiguration`] if `config` is invalid.
    pub fn new(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// The persistent store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Engine constants in force.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Gives the store back.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    // -- operations -----------------------------------------------------------

    /// Creates the pool of `token`; the sender becomes its initial provider.
    ///
    /// # Errors
    ///
    /// [`SwapError::PoolAlreadyInitialized`], configuration errors, or a
    /// failed token pull.
    pub fn create_pool<H: Host>(&mut self, host: &mut H, token: &Address, pool: &PoolConfig) -> Result<()> {
        self.execute(host, token, "create_pool", |call| pool::create_pool(call, pool))
    }

    /// Lists `amount` tokens for sale, paid out to `receiver`.
    ///
    /// Returns the tokens listed after any priority tax.
    ///
    /// # Errors
    ///
    /// Input and listing-rule rejections; see
    /// [`LiquidityQueue::list_liquidity`].
    pub fn list_liquidity<H: Host>(
        &mut self,
        host: &mut H,
        token: &Address,
        receiver: &str,
        amount: u128,
        priority: bool,
    ) -> Result<u128> {
        self.execute(host, token, "list_liquidity", |call| {
            listing::list_liquidity(call, receiver, amount, priority)
        })
    }

    /// Withdraws the sender's unreserved listing. Returns the tokens
    /// returned.
    ///
    /// # Errors
    ///
    /// [`SwapError::Rejected`] when nothing can be canceled.
    pub fn cancel_listing<H: Host>(&mut self, host: &mut H, token: &Address) -> Result<u128> {
        self.execute(host, token, "cancel_listing", listing::cancel_listing)
    }

    /// Reserves up to `max_sats` worth of tokens for the sender.
    ///
    /// # Errors
    ///
    /// See [`LiquidityQueue::reserve`]; also
    /// [`SwapError::InvalidAmount`] below the minimum trade size and
    /// [`SwapError::InsufficientFee`] without the reservation fee.
    pub fn reserve_liquidity<H: Host>(
        &mut self,
        host: &mut H,
        token: &Address,
        max_sats: u64,
        min_tokens: u128,
        for_liquidity_pool: bool,
    ) -> Result<ReservedLiquidity> {
        self.execute(host, token, "reserve_liquidity", |call| {
            reservation::reserve_liquidity(call, max_sats, min_tokens, for_liquidity_pool)
        })
    }

    /// Settles the sender's reservation and delivers the tokens. Returns
    /// the tokens delivered after the dynamic fee.
    ///
    /// # Errors
    ///
    /// [`SwapError::ReservationInvalid`] without a live swap reservation;
    /// [`SwapError::NothingPurchased`] if no provider was paid.
    pub fn swap<H: Host>(&mut self, host: &mut H, token: &Address) -> Result<u128> {
        self.execute(host, token, "swap", swap::swap)
    }

    /// Settles the sender's LP reservation and deposits a matching amount
    /// of tokens. Returns the deposit.
    ///
    /// # Errors
    ///
    /// [`SwapError::ReservationInvalid`] without a live LP reservation.
    pub fn add_liquidity<H: Host>(&mut self, host: &mut H, token: &Address, receiver: &str) -> Result<u128> {
        self.execute(host, token, "add_liquidity", |call| {
            liquidity::add_liquidity(call, receiver)
        })
    }

    /// Withdraws the sender's pooled tokens and queues its BTC claim.
    ///
    /// # Errors
    ///
    /// [`SwapError::Rejected`] for non-LPs or a pending removal.
    pub fn remove_liquidity<H: Host>(&mut self, host: &mut H, token: &Address) -> Result<RemovedLiquidity> {
        self.execute(host, token, "remove_liquidity", liquidity::remove_liquidity)
    }

    // -- views ----------------------------------------------------------------

    /// Market snapshot of `token` at the host's block.
    ///
    /// # Errors
    ///
    /// [`SwapError::PoolNotInitialized`] before the pool exists.
    pub fn quote<H: Host>(&self, host: &H, token: &Address) -> Result<PoolView> {
        self.inspect(host, token, views::pool_view)
    }

    /// Provider record of `owner` for `token`.
    ///
    /// # Errors
    ///
    /// Propagates decoding errors.
    pub fn provider_details<H: Host>(&self, host: &H, token: &Address, owner: &Address) -> Result<ProviderDetails> {
        self.inspect(host, token, |call| views::provider_details(call, owner))
    }

    /// Reservation of `buyer` for `token`.
    ///
    /// # Errors
    ///
    /// Propagates decoding errors.
    pub fn reservation<H: Host>(&self, host: &H, token: &Address, buyer: &Address) -> Result<ReservationDetails> {
        self.inspect(host, token, |call| views::reservation_details(call, buyer))
    }

    // -- call plumbing --------------------------------------------------------

    fn execute<H, T, F>(&mut self, host: &mut H, token: &Address, operation: &'static str, handler: F) -> Result<T>
    where
        H: Host,
        F: FnOnce(&mut Call<'_, '_>) -> Result<T>,
    {
        let env = CallEnv::capture(&*host);
        let mut effects = CallEffects::new();
        let (value, writes) =
            match run(&self.store, &self.config, token, &env, &mut effects, handler) {
                Ok(done) => done,
                Err(err) => {
                    report_abort(operation, token, &err);
                    return Err(err);
                }
            };
        effects.collect(host, token)?;
        let written = writes.len();
        apply_writes(&mut self.store, writes);
        effects.settle(host, token)?;
        info!(operation, token = %token, block = env.block(), written, "call committed");
        Ok(value)
    }

    fn inspect<H, T, F>(&self, host: &H, token: &Address, view: F) -> Result<T>
    where
        H: Host,
        F: FnOnce(&mut Call<'_, '_>) -> Result<T>,
    {
        let env = CallEnv::capture(host);
        let mut effects = CallEffects::new();
        run(&self.store, &self.config, token, &env, &mut effects, view).map(|(value, _)| value)
    }
}

fn run<T, F>(
    store: &dyn KeyValueStore,
    config: &EngineConfig,
    token: &Address,
    env: &CallEnv,
    effects: &mut CallEffects,
    handler: F,
) -> Result<(T, BTreeMap<StorageKey, Word>)>
where
    F: FnOnce(&mut Call<'_, '_>) -> Result<T>,
{
    let mut repo = Repository::new(store, *token);
    let mut queue = LiquidityQueue::load(&mut repo, config, env.block(), effects)?;
    let value = handler(&mut Call {
        repo: &mut repo,
        queue: &mut queue,
        env,
        effects,
    })?;
    queue.save(&mut repo)?;
    repo.flush()?;
    Ok((value, repo.into_writes()))
}

fn report_abort(operation: &'static str, token: &Address, err: &SwapError) {
    if err.is_invariant_violation() {
        warn!(operation, token = %token, error = %err, "call aborted by invariant violation");
    } else {
        debug!(operation, token = %token, error = %err, "call rejected");
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::QUOTE_SCALE;
    use crate::host::MemoryHost;
    use crate::storage::MemoryStore;

    fn token() -> Address {
        Address::from_bytes([7; 32])
    }

    fn created() -> (NativeSwap<MemoryStore>, MemoryHost) {
        let creator = Address::from_bytes([1; 32]);
        let mut host = MemoryHost::new();
        host.set_block(100);
        host.set_sender(creator);
        host.mint(&token(), &creator, 1_000_000_000);
        let config = EngineConfig::default().with_reservation_fee(0);
        let Ok(mut swap) = NativeSwap::new(MemoryStore::new(), config) else {
            panic!("expected Ok");
        };
        let Ok(pool) = PoolConfig::new(
            100 * u128::from(QUOTE_SCALE),
            1_000_000_000,
            "bc1qcreator",
            0,
            0,
            100,
        ) else {
            panic!("expected Ok");
        };
        let Ok(()) = swap.create_pool(&mut host, &token(), &pool) else {
            panic!("expected Ok");
        };
        (swap, host)
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = EngineConfig::default().with_reservation_expiry_blocks(0);
        assert!(matches!(
            NativeSwap::new(MemoryStore::new(), config),
            Err(SwapError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn commit_reports_events_once() {
        let (_, host) = created();
        assert_eq!(host.events().len(), 1);
        assert_eq!(host.events()[0].name(), "PoolCreated");
    }

    #[test]
    fn views_discard_housekeeping() {
        let (mut swap, mut host) = created();
        let buyer = Address::from_bytes([2; 32]);
        host.set_block(101);
        host.set_sender(buyer);
        let Ok(_) = swap.reserve_liquidity(&mut host, &token(), 50_000, 0, false) else {
            panic!("expected Ok");
        };
        let before = swap.store().clone();

        // the purge only happens inside the view
        host.set_block(200);
        let Ok(details) = swap.reservation(&host, &token(), &buyer) else {
            panic!("expected Ok");
        };
        assert!(!details.valid);
        let Ok(view) = swap.quote(&host, &token()) else {
            panic!("expected Ok");
        };
        assert_eq!(view.reserved_liquidity, 0);
        assert_eq!(swap.store(), &before);
    }

    #[test]
    fn rejected_call_leaves_no_trace() {
        let (mut swap, mut host) = created();
        let before = swap.store().clone();
        host.take_events();
        host.set_block(101);
        host.set_sender(Address::from_bytes([2; 32]));
        assert!(swap.cancel_listing(&mut host, &token()).is_err());
        assert_eq!(swap.store(), &before);
        assert!(host.events().is_empty());
    }
}
