//! Events reported to the host after a successful call.
//!
//! Events are buffered during a call and handed to
//! [`Host::emit`](crate::traits::Host::emit) only once the call commits, so
//! an aborted call never reports anything.

use primitive_types::U256;

use crate::domain::{Address, ProviderId, Quote, ReservationId};

/// Something observable happened to a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapEvent {
    /// A pool was created and seeded by its initial provider.
    PoolCreated {
        /// Pool token.
        token: Address,
        /// Tokens supplied by the initial provider.
        initial_liquidity: u128,
        /// Floor quote.
        floor_price: Quote,
    },
    /// A provider listed tokens for sale.
    LiquidityListed {
        /// Pool token.
        token: Address,
        /// Listing provider.
        provider: ProviderId,
        /// Tokens added to the listing, after tax.
        amount: u128,
        /// Provider liquidity after the listing.
        total_liquidity: u128,
        /// Whether the listing sits in the priority queue.
        priority: bool,
    },
    /// A provider withdrew an unreserved listing.
    ListingCanceled {
        /// Pool token.
        token: Address,
        /// Provider that canceled.
        provider: ProviderId,
        /// Tokens returned.
        amount: u128,
    },
    /// A buyer reserved liquidity.
    ReservationCreated {
        /// Pool token.
        token: Address,
        /// Reservation id.
        reservation: ReservationId,
        /// Buyer.
        buyer: Address,
        /// Tokens reserved.
        tokens: u128,
        /// Satoshis the buyer is expected to pay.
        satoshis: u64,
        /// Number of provider legs.
        legs: usize,
    },
    /// One reservation leg was settled against a provider.
    ProviderConsumed {
        /// Pool token.
        token: Address,
        /// Provider paid by the buyer.
        provider: ProviderId,
        /// Tokens taken from (or credited against) the provider.
        tokens: u128,
        /// Satoshis the provider received.
        satoshis: u64,
    },
    /// A swap completed.
    SwapExecuted {
        /// Pool token.
        token: Address,
        /// Buyer.
        buyer: Address,
        /// Tokens delivered to the buyer.
        tokens_delivered: u128,
        /// Satoshis matched to provider legs.
        satoshis_spent: u64,
        /// Tokens kept as the dynamic fee.
        fee_tokens: u128,
    },
    /// A liquidity provider deposited tokens against an LP reservation.
    LiquidityAdded {
        /// Pool token.
        token: Address,
        /// LP provider.
        provider: ProviderId,
        /// Tokens deposited.
        tokens: u128,
        /// Satoshis matched to the reservation.
        satoshis: u64,
    },
    /// A liquidity provider withdrew its deposit.
    LiquidityRemoved {
        /// Pool token.
        token: Address,
        /// LP provider.
        provider: ProviderId,
        /// Tokens returned.
        tokens: u128,
        /// BTC the provider is now owed.
        btc_owed: U256,
    },
    /// An expired reservation was purged.
    ReservationPurged {
        /// Pool token.
        token: Address,
        /// Purged reservation.
        reservation: ReservationId,
        /// Block the reservation was created in.
        block: u64,
    },
}

impl SwapEvent {
    /// Short name of the event kind.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PoolCreated { .. } => "PoolCreated",
            Self::LiquidityListed { .. } => "LiquidityListed",
            Self::ListingCanceled { .. } => "ListingCanceled",
            Self::ReservationCreated { .. } => "ReservationCreated",
            Self::ProviderConsumed { .. } => "ProviderConsumed",
            Self::SwapExecuted { .. } => "SwapExecuted",
            Self::LiquidityAdded { .. } => "LiquidityAdded",
            Self::LiquidityRemoved { .. } => "LiquidityRemoved",
            Self::ReservationPurged { .. } => "ReservationPurged",
        }
    }
}
