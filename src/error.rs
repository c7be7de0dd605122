//! Unified error types for the settlement engine.
//!
//! Every fallible operation in the crate returns [`SwapError`].  Any error
//! aborts the whole call: nothing written during the call reaches the
//! persistent store.
//!
//! Variants fall into three tiers, reported by [`SwapError::tier`]:
//!
//! | Tier | Meaning |
//! |------|---------|
//! | [`ErrorTier::Input`] | user-correctable input problems |
//! | [`ErrorTier::Business`] | expected rejections by the exchange rules |
//! | [`ErrorTier::Invariant`] | impossible engine states (bugs) |

use thiserror::Error;

/// Classification of a [`SwapError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorTier {
    /// Zero or undersized amounts, bad addresses, slippage, fees, timeouts.
    Input,
    /// Expected rejections: not enough liquidity, expired reservation, ...
    Business,
    /// An engine invariant does not hold. Must never be downgraded.
    Invariant,
}

/// Errors produced by the settlement engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwapError {
    // -- input validation ---------------------------------------------------
    /// An amount argument is zero or below the accepted minimum.
    #[error("invalid amount: {0}")]
    InvalidAmount(&'static str),

    /// A payout address or other address argument is malformed.
    #[error("invalid address: {0}")]
    InvalidAddress(&'static str),

    /// Fewer tokens could be reserved than the caller's minimum.
    #[error("slippage exceeded: reserved {reserved} tokens, minimum was {minimum}")]
    SlippageExceeded {
        /// Tokens the engine managed to reserve.
        reserved: u128,
        /// Minimum the caller asked for.
        minimum: u128,
    },

    /// The in-flight transaction does not pay the required BTC fee.
    #[error("insufficient fee: paid {paid} sats, required {required} sats")]
    InsufficientFee {
        /// Satoshis found for the fee recipient.
        paid: u64,
        /// Satoshis required.
        required: u64,
    },

    /// The buyer already holds a live reservation for this token.
    #[error("buyer already has an active reservation")]
    DuplicateReservation,

    /// The buyer let a reservation lapse and is inside the timeout window.
    #[error("buyer is timed out until block {until}")]
    BuyerTimedOut {
        /// Last block of the timeout window.
        until: u64,
    },

    /// A request violates a listing or pool rule.
    #[error("request rejected: {0}")]
    Rejected(&'static str),

    /// Configuration parameters are inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),

    // -- business rules -----------------------------------------------------
    /// Not enough unreserved liquidity to satisfy the request.
    #[error("insufficient liquidity: {0}")]
    InsufficientLiquidity(&'static str),

    /// The reservation is missing, consumed or expired.
    #[error("no valid reservation: {0}")]
    ReservationInvalid(&'static str),

    /// Every leg of a trade yielded nothing because no BTC arrived.
    #[error("no tokens purchased: no matching BTC outputs")]
    NothingPurchased,

    /// The pool for this token does not exist yet.
    #[error("pool is not initialized")]
    PoolNotInitialized,

    /// The pool for this token already exists.
    #[error("pool is already initialized")]
    PoolAlreadyInitialized,

    // -- arithmetic ---------------------------------------------------------
    /// Arithmetic overflow.
    #[error("arithmetic overflow: {0}")]
    Overflow(&'static str),

    /// Arithmetic underflow.
    #[error("arithmetic underflow: {0}")]
    Underflow(&'static str),

    /// Division by zero.
    #[error("division by zero: {0}")]
    DivisionByZero(&'static str),

    // -- invariant violations -----------------------------------------------
    /// Impossible engine state.
    #[error("impossible state: {0}")]
    Invariant(&'static str),
}

impl SwapError {
    /// Returns the tier this error belongs to.
    #[must_use]
    pub const fn tier(&self) -> ErrorTier {
        match self {
            Self::InvalidAmount(_)
            | Self::InvalidAddress(_)
            | Self::SlippageExceeded { .. }
            | Self::InsufficientFee { .. }
            | Self::DuplicateReservation
            | Self::BuyerTimedOut { .. }
            | Self::Rejected(_)
            | Self::InvalidConfiguration(_) => ErrorTier::Input,
            Self::InsufficientLiquidity(_)
            | Self::ReservationInvalid(_)
            | Self::NothingPurchased
            | Self::PoolNotInitialized
            | Self::PoolAlreadyInitialized => ErrorTier::Business,
            Self::Overflow(_)
            | Self::Underflow(_)
            | Self::DivisionByZero(_)
            | Self::Invariant(_) => ErrorTier::Invariant,
        }
    }

    /// Returns `true` for errors that signal an engine bug.
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(self.tier(), ErrorTier::Invariant)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, SwapError>;
