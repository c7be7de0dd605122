//! Integration tests driving [`NativeSwap`] end to end through the
//! in-memory store and host.
//!
//! Every scenario starts from a pool seeded at block 100 with a floor of
//! 100 tokens per satoshi, then moves the host forward block by block the
//! way a chain would.

#![allow(clippy::panic)]

use native_swap::domain::QueueKind;
use native_swap::prelude::*;
use primitive_types::U256;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

const FLOOR: u128 = 100 * QUOTE_SCALE as u128;
const INITIAL: u128 = 1_000_000_000_000;
const CREATOR_RECEIVER: &str = "bc1qcreator";

fn token() -> Address {
    Address::from_bytes([7; 32])
}

fn creator() -> Address {
    Address::from_bytes([1; 32])
}

fn account(n: u8) -> Address {
    Address::from_bytes([n; 32])
}

fn seller_receiver(n: u8) -> String {
    format!("bc1qseller{n}")
}

fn free_reservations() -> EngineConfig {
    EngineConfig::default().with_reservation_fee(0)
}

fn pool_config(anti_bot_blocks: u64, anti_bot_cap: u128, max_reserved_percent: u8) -> PoolConfig {
    let Ok(pool) = PoolConfig::new(
        FLOOR,
        INITIAL,
        CREATOR_RECEIVER,
        anti_bot_blocks,
        anti_bot_cap,
        max_reserved_percent,
    ) else {
        panic!("valid pool config");
    };
    pool
}

struct Market {
    swap: NativeSwap<MemoryStore>,
    host: MemoryHost,
}

fn market_with(config: EngineConfig, pool: &PoolConfig) -> Market {
    let Ok(swap) = NativeSwap::new(MemoryStore::new(), config) else {
        panic!("valid engine config");
    };
    let mut host = MemoryHost::new();
    host.set_block(100);
    host.mint(&token(), &creator(), INITIAL);
    let mut market = Market { swap, host };
    market.act_as(creator());
    let Ok(()) = market.swap.create_pool(&mut market.host, &token(), pool) else {
        panic!("pool created");
    };
    market
}

fn market() -> Market {
    market_with(free_reservations(), &pool_config(0, 0, 100))
}

impl Market {
    /// Next call comes from `who`, with no BTC outputs.
    fn act_as(&mut self, who: Address) {
        self.host.set_sender(who);
        self.host.set_outputs(Vec::new());
    }

    fn at_block(&mut self, block: u64) {
        self.host.set_block(block);
    }

    fn pay(&mut self, outputs: &[(&str, u64)]) {
        self.host.set_outputs(
            outputs
                .iter()
                .map(|(to, value)| TransactionOutput::new(*to, *value))
                .collect(),
        );
    }

    fn list(&mut self, n: u8, amount: u128) -> u128 {
        self.host.mint(&token(), &account(n), amount);
        self.act_as(account(n));
        let Ok(listed) =
            self.swap
                .list_liquidity(&mut self.host, &token(), &seller_receiver(n), amount, false)
        else {
            panic!("listing accepted");
        };
        listed
    }

    fn reserve(&mut self, buyer: Address, sats: u64) -> ReservedLiquidity {
        self.act_as(buyer);
        let Ok(reserved) = self
            .swap
            .reserve_liquidity(&mut self.host, &token(), sats, 0, false)
        else {
            panic!("reservation accepted");
        };
        reserved
    }

    fn provider(&self, owner: Address) -> ProviderDetails {
        let Ok(details) = self.swap.provider_details(&self.host, &token(), &owner) else {
            panic!("provider details");
        };
        details
    }

    fn reservation(&self, buyer: Address) -> ReservationDetails {
        let Ok(details) = self.swap.reservation(&self.host, &token(), &buyer) else {
            panic!("reservation details");
        };
        details
    }

    fn view(&self) -> PoolView {
        let Ok(view) = self.swap.quote(&self.host, &token()) else {
            panic!("pool view");
        };
        view
    }

    fn balance(&self, who: &Address) -> u128 {
        self.host.balance(&token(), who)
    }
}

// ===========================================================================
// Suite 1: Pool lifecycle
// ===========================================================================

#[test]
fn create_pool_pulls_liquidity_and_quotes_floor() {
    let m = market();
    assert_eq!(m.balance(&creator()), 0);
    assert_eq!(m.balance(&native_swap::host::ENGINE_ACCOUNT), INITIAL);

    let view = m.view();
    assert_eq!(view.quote, Quote::from_scaled(U256::from(FLOOR)));
    assert_eq!(view.floor_price, view.quote);
    assert_eq!(view.virtual_tokens, U256::from(INITIAL));
    assert_eq!(view.liquidity, INITIAL);
    assert_eq!(view.reserved_liquidity, 0);
    assert!(matches!(
        m.host.events().last(),
        Some(SwapEvent::PoolCreated { initial_liquidity: INITIAL, .. })
    ));
}

#[test]
fn create_pool_twice_is_rejected_without_writes() {
    let mut m = market();
    let before = m.swap.store().clone();
    m.host.mint(&token(), &creator(), INITIAL);
    m.act_as(creator());
    let result = m.swap.create_pool(&mut m.host, &token(), &pool_config(0, 0, 100));
    assert!(matches!(result, Err(SwapError::PoolAlreadyInitialized)));
    assert_eq!(m.swap.store(), &before);
    assert_eq!(m.balance(&creator()), INITIAL);
}

#[test]
fn views_before_creation_report_uninitialized() {
    let Ok(swap) = NativeSwap::new(MemoryStore::new(), free_reservations()) else {
        panic!("valid engine config");
    };
    let host = MemoryHost::new();
    assert!(matches!(
        swap.quote(&host, &token()),
        Err(SwapError::PoolNotInitialized)
    ));
}

#[test]
fn initial_provider_can_neither_list_nor_reserve() {
    let mut m = market();
    m.at_block(101);
    m.host.mint(&token(), &creator(), 10_000_000);
    m.act_as(creator());
    assert!(matches!(
        m.swap
            .list_liquidity(&mut m.host, &token(), CREATOR_RECEIVER, 10_000_000, false),
        Err(SwapError::Rejected(_))
    ));
    assert!(matches!(
        m.swap.reserve_liquidity(&mut m.host, &token(), 50_000, 0, false),
        Err(SwapError::Rejected(_))
    ));
}

// ===========================================================================
// Suite 2: Listings
// ===========================================================================

#[test]
fn listing_pulls_tokens_and_activates_provider() {
    let mut m = market();
    m.at_block(101);
    assert_eq!(m.list(10, 10_000_000), 10_000_000);

    assert_eq!(m.balance(&account(10)), 0);
    let provider = m.provider(account(10));
    assert!(provider.active);
    assert!(!provider.priority);
    assert_eq!(provider.liquidity, 10_000_000);
    assert_eq!(provider.receiver, seller_receiver(10));
    assert_eq!(m.view().liquidity, INITIAL + 10_000_000);
}

#[test]
fn listing_input_is_validated() {
    let mut m = market();
    m.at_block(101);
    m.host.mint(&token(), &account(10), 10_000_000);
    m.act_as(account(10));

    assert!(matches!(
        m.swap.list_liquidity(&mut m.host, &token(), "bc1qseller", 0, false),
        Err(SwapError::InvalidAmount(_))
    ));
    assert!(matches!(
        m.swap.list_liquidity(&mut m.host, &token(), "bad receiver", 10_000_000, false),
        Err(SwapError::InvalidAddress(_))
    ));
    // 500_000 tokens are worth 5_000 sats at the floor
    assert!(matches!(
        m.swap.list_liquidity(&mut m.host, &token(), "bc1qseller", 500_000, false),
        Err(SwapError::InvalidAmount(_))
    ));
}

#[test]
fn priority_listing_pays_fee_and_tax() {
    let mut m = market();
    m.at_block(101);
    m.host.mint(&token(), &account(10), 10_000_000);
    m.act_as(account(10));
    let unpaid = m
        .swap
        .list_liquidity(&mut m.host, &token(), "bc1qseller10", 10_000_000, true);
    assert!(matches!(
        unpaid,
        Err(SwapError::InsufficientFee { paid: 0, required: 1_000 })
    ));

    let recipient = m.swap.config().fee_recipient().to_owned();
    m.pay(&[(recipient.as_str(), 1_000)]);
    let Ok(listed) = m
        .swap
        .list_liquidity(&mut m.host, &token(), "bc1qseller10", 10_000_000, true)
    else {
        panic!("priority listing accepted");
    };
    assert_eq!(listed, 9_700_000);
    assert_eq!(m.balance(&account(10)), 0);
    let provider = m.provider(account(10));
    assert!(provider.priority);
    assert_eq!(provider.liquidity, 9_700_000);
}

#[test]
fn cancel_listing_returns_tokens() {
    let mut m = market();
    m.at_block(101);
    m.list(10, 10_000_000);
    m.at_block(102);
    m.act_as(account(10));
    let Ok(returned) = m.swap.cancel_listing(&mut m.host, &token()) else {
        panic!("listing canceled");
    };
    assert_eq!(returned, 10_000_000);
    assert_eq!(m.balance(&account(10)), 10_000_000);
    let provider = m.provider(account(10));
    assert!(!provider.active);
    assert_eq!(provider.liquidity, 0);
    assert_eq!(m.view().liquidity, INITIAL);
}

#[test]
fn cancel_listing_with_reserved_tokens_is_rejected() {
    let mut m = market();
    m.at_block(101);
    m.list(10, 10_000_000);
    m.at_block(102);
    m.reserve(account(50), 50_000);
    m.act_as(account(10));
    assert!(matches!(
        m.swap.cancel_listing(&mut m.host, &token()),
        Err(SwapError::Rejected(_))
    ));
}

// ===========================================================================
// Suite 3: Reservations and swaps
// ===========================================================================

#[test]
fn swap_against_initial_provider_delivers_tokens() {
    let mut m = market();
    let buyer = account(50);
    m.at_block(101);
    let reserved = m.reserve(buyer, 50_000);
    assert_eq!(reserved.tokens, 5_000_000);
    assert_eq!(reserved.satoshis, 50_000);
    assert_eq!(reserved.legs, 1);
    assert_eq!(m.view().reserved_liquidity, 5_000_000);

    m.at_block(102);
    m.act_as(buyer);
    m.pay(&[(CREATOR_RECEIVER, 50_000)]);
    let Ok(delivered) = m.swap.swap(&mut m.host, &token()) else {
        panic!("swap executed");
    };
    // fee lies between 15 and 150 bp
    assert!(delivered < 5_000_000);
    assert!(delivered >= 4_925_000);
    assert_eq!(m.balance(&buyer), delivered);

    let reservation = m.reservation(buyer);
    assert!(!reservation.valid);
    assert!(reservation.legs.is_empty());
    assert_eq!(m.view().reserved_liquidity, 0);
    assert!(m
        .host
        .events()
        .iter()
        .any(|event| matches!(event, SwapEvent::SwapExecuted { .. })));
}

#[test]
fn listed_provider_is_drawn_before_initial_provider() {
    let mut m = market();
    let buyer = account(50);
    m.at_block(101);
    m.list(10, 10_000_000);
    m.at_block(102);
    let reserved = m.reserve(buyer, 50_000);
    assert_eq!(reserved.legs, 1);
    let reservation = m.reservation(buyer);
    assert!(reservation.valid);
    assert_eq!(reservation.legs[0].kind(), QueueKind::Normal);
    assert_eq!(m.provider(account(10)).reserved, 5_000_000);

    m.at_block(103);
    m.act_as(buyer);
    m.pay(&[(seller_receiver(10).as_str(), 50_000)]);
    let Ok(delivered) = m.swap.swap(&mut m.host, &token()) else {
        panic!("swap executed");
    };
    assert!(delivered > 0);
    let provider = m.provider(account(10));
    assert_eq!(provider.liquidity, 5_000_000);
    assert_eq!(provider.reserved, 0);
}

#[test]
fn priority_listing_is_drawn_before_normal_listing() {
    let mut m = market();
    m.at_block(101);
    m.list(10, 10_000_000);
    m.host.mint(&token(), &account(11), 10_000_000);
    m.act_as(account(11));
    let recipient = m.swap.config().fee_recipient().to_owned();
    m.pay(&[(recipient.as_str(), 1_000)]);
    let Ok(_) = m
        .swap
        .list_liquidity(&mut m.host, &token(), "bc1qseller11", 10_000_000, true)
    else {
        panic!("priority listing accepted");
    };

    m.at_block(102);
    m.reserve(account(50), 50_000);
    let reservation = m.reservation(account(50));
    assert_eq!(reservation.legs.len(), 1);
    assert_eq!(reservation.legs[0].kind(), QueueKind::Priority);
    assert_eq!(m.provider(account(10)).reserved, 0);
}

#[test]
fn partial_payment_releases_the_unpaid_remainder() {
    let mut m = market();
    let buyer = account(50);
    m.at_block(101);
    m.list(10, 10_000_000);
    m.at_block(102);
    m.reserve(buyer, 50_000);

    m.at_block(103);
    m.act_as(buyer);
    m.pay(&[(seller_receiver(10).as_str(), 20_000)]);
    let Ok(delivered) = m.swap.swap(&mut m.host, &token()) else {
        panic!("swap executed");
    };
    assert!(delivered < 2_000_000);
    let provider = m.provider(account(10));
    assert_eq!(provider.liquidity, 8_000_000);
    assert_eq!(provider.reserved, 0);
    assert_eq!(m.view().reserved_liquidity, 0);
}

#[test]
fn swap_without_payment_changes_nothing() {
    let mut m = market();
    let buyer = account(50);
    m.at_block(101);
    m.list(10, 10_000_000);
    m.at_block(102);
    m.reserve(buyer, 50_000);
    let before = m.swap.store().clone();
    let events = m.host.events().len();

    m.at_block(103);
    m.act_as(buyer);
    assert!(matches!(
        m.swap.swap(&mut m.host, &token()),
        Err(SwapError::NothingPurchased)
    ));
    assert_eq!(m.swap.store(), &before);
    assert_eq!(m.host.events().len(), events);
    assert_eq!(m.balance(&buyer), 0);
    assert!(m.reservation(buyer).valid);
}

#[test]
fn reservation_guards() {
    let mut m = market();
    let buyer = account(50);
    m.at_block(101);
    m.act_as(buyer);
    assert!(matches!(
        m.swap.reserve_liquidity(&mut m.host, &token(), 9_999, 0, false),
        Err(SwapError::InvalidAmount(_))
    ));
    assert!(matches!(
        m.swap.reserve_liquidity(&mut m.host, &token(), 50_000, 6_000_000, false),
        Err(SwapError::SlippageExceeded {
            reserved: 5_000_000,
            minimum: 6_000_000
        })
    ));
    m.reserve(buyer, 50_000);
    assert!(matches!(
        m.swap.reserve_liquidity(&mut m.host, &token(), 50_000, 0, false),
        Err(SwapError::DuplicateReservation)
    ));
    m.act_as(account(51));
    assert!(matches!(
        m.swap.swap(&mut m.host, &token()),
        Err(SwapError::ReservationInvalid(_))
    ));
}

#[test]
fn reservation_fee_is_required() {
    let mut m = market_with(EngineConfig::default(), &pool_config(0, 0, 100));
    m.at_block(101);
    m.act_as(account(50));
    assert!(matches!(
        m.swap.reserve_liquidity(&mut m.host, &token(), 50_000, 0, false),
        Err(SwapError::InsufficientFee { paid: 0, required: 5_000 })
    ));
    let recipient = m.swap.config().fee_recipient().to_owned();
    m.pay(&[(recipient.as_str(), 5_000)]);
    assert!(m
        .swap
        .reserve_liquidity(&mut m.host, &token(), 50_000, 0, false)
        .is_ok());
}

#[test]
fn anti_bot_cap_holds_until_expiration() {
    let mut m = market_with(free_reservations(), &pool_config(10, 1_000_000, 100));
    m.at_block(101);
    m.act_as(account(50));
    assert!(matches!(
        m.swap.reserve_liquidity(&mut m.host, &token(), 50_000, 0, false),
        Err(SwapError::Rejected(_))
    ));
    let capped = m.reserve(account(50), 10_000);
    assert_eq!(capped.tokens, 1_000_000);

    m.at_block(111);
    let free = m.reserve(account(51), 50_000);
    assert!(free.tokens > 1_000_000);
}

#[test]
fn reserved_share_is_limited() {
    let mut m = market_with(free_reservations(), &pool_config(0, 0, 1));
    m.at_block(101);
    // 2e10 tokens is above 1% of the pool
    m.reserve(account(50), 200_000_000);
    m.act_as(account(51));
    assert!(matches!(
        m.swap.reserve_liquidity(&mut m.host, &token(), 50_000, 0, false),
        Err(SwapError::InsufficientLiquidity(_))
    ));
}

// ===========================================================================
// Suite 4: Expiry and buyer timeout
// ===========================================================================

#[test]
fn expired_reservation_is_purged_and_buyer_times_out() {
    let mut m = market();
    let buyer = account(50);
    m.at_block(101);
    m.list(10, 10_000_000);
    m.at_block(102);
    m.reserve(buyer, 50_000);

    // expires after block 107
    m.at_block(108);
    m.act_as(buyer);
    m.pay(&[(seller_receiver(10).as_str(), 50_000)]);
    assert!(matches!(
        m.swap.swap(&mut m.host, &token()),
        Err(SwapError::ReservationInvalid(_))
    ));
    assert_eq!(m.provider(account(10)).reserved, 0);
    assert_eq!(m.view().reserved_liquidity, 0);
    assert!(!m.reservation(buyer).valid);

    m.at_block(110);
    m.act_as(buyer);
    assert!(matches!(
        m.swap.reserve_liquidity(&mut m.host, &token(), 50_000, 0, false),
        Err(SwapError::BuyerTimedOut { until: 112 })
    ));

    m.at_block(113);
    assert_eq!(m.reserve(buyer, 50_000).legs, 1);
    assert!(m
        .host
        .events()
        .iter()
        .any(|event| matches!(event, SwapEvent::ReservationPurged { block: 102, .. })));
}

// ===========================================================================
// Suite 5: Liquidity providers
// ===========================================================================

fn add_liquidity(m: &mut Market, lp: Address, sats: u64) -> u128 {
    m.act_as(lp);
    let Ok(reserved) = m.swap.reserve_liquidity(&mut m.host, &token(), sats, 0, true) else {
        panic!("LP reservation accepted");
    };
    m.host.advance_blocks(1);
    m.act_as(lp);
    m.pay(&[(CREATOR_RECEIVER, reserved.satoshis)]);
    let Ok(deposit) = m.swap.add_liquidity(&mut m.host, &token(), "bc1qlp") else {
        panic!("liquidity added");
    };
    deposit
}

#[test]
fn lp_deposit_withdrawal_and_removal_queue_settlement() {
    let mut m = market();
    let lp = account(60);
    m.host.mint(&token(), &lp, 10_000_000);
    m.at_block(101);

    let deposit = add_liquidity(&mut m, lp, 50_000);
    assert_eq!(deposit, 5_000_000);
    assert_eq!(m.balance(&lp), 5_000_000);
    let provider = m.provider(lp);
    assert!(provider.liquidity_provider);
    assert!(!provider.active);
    assert_eq!(provider.liquidity_provided, U256::from(deposit));

    m.at_block(103);
    m.act_as(lp);
    let Ok(removed) = m.swap.remove_liquidity(&mut m.host, &token()) else {
        panic!("liquidity removed");
    };
    assert_eq!(removed.tokens, deposit);
    assert!(removed.btc_owed > U256::from(40_000u64));
    assert_eq!(m.balance(&lp), 10_000_000);
    let provider = m.provider(lp);
    assert!(provider.pending_removal);
    assert_eq!(provider.btc_owed, removed.btc_owed);

    // the removal queue is served first
    m.at_block(104);
    let buyer = account(50);
    let reserved = m.reserve(buyer, 10_000);
    let reservation = m.reservation(buyer);
    assert_eq!(reservation.legs.len(), 1);
    assert_eq!(reservation.legs[0].kind(), QueueKind::Removal);
    assert_eq!(
        m.provider(lp).btc_owed_reserved,
        U256::from(reserved.satoshis)
    );

    m.at_block(105);
    m.act_as(buyer);
    m.pay(&[("bc1qlp", reserved.satoshis)]);
    let Ok(delivered) = m.swap.swap(&mut m.host, &token()) else {
        panic!("swap executed");
    };
    assert!(delivered > 0);
    let provider = m.provider(lp);
    assert_eq!(
        provider.btc_owed,
        removed.btc_owed - U256::from(reserved.satoshis)
    );
    assert_eq!(provider.btc_owed_reserved, U256::zero());
}

#[test]
fn reservation_kind_must_match_operation() {
    let mut m = market();
    m.at_block(101);
    m.reserve(account(50), 50_000);
    m.at_block(102);
    m.act_as(account(50));
    m.pay(&[(CREATOR_RECEIVER, 50_000)]);
    assert!(matches!(
        m.swap.add_liquidity(&mut m.host, &token(), "bc1qlp"),
        Err(SwapError::ReservationInvalid(_))
    ));

    m.act_as(account(60));
    let Ok(_) = m.swap.reserve_liquidity(&mut m.host, &token(), 50_000, 0, true) else {
        panic!("LP reservation accepted");
    };
    m.at_block(103);
    m.act_as(account(60));
    m.pay(&[(CREATOR_RECEIVER, 50_000)]);
    assert!(matches!(
        m.swap.swap(&mut m.host, &token()),
        Err(SwapError::ReservationInvalid(_))
    ));
}

#[test]
fn non_lp_cannot_remove_liquidity() {
    let mut m = market();
    m.at_block(101);
    m.act_as(account(60));
    assert!(matches!(
        m.swap.remove_liquidity(&mut m.host, &token()),
        Err(SwapError::Rejected(_))
    ));
}

// ===========================================================================
// Suite 6: Atomicity
// ===========================================================================

#[test]
fn failed_token_pull_leaves_store_untouched() {
    let mut m = market();
    m.at_block(101);
    let before = m.swap.store().clone();
    let events = m.host.events().len();
    m.act_as(account(10));
    let result = m
        .swap
        .list_liquidity(&mut m.host, &token(), "bc1qseller10", 10_000_000, false);
    assert!(matches!(result, Err(SwapError::Rejected(_))));
    assert_eq!(m.swap.store(), &before);
    assert_eq!(m.host.events().len(), events);
}
