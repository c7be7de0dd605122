//! Parameters of a new pool.

use primitive_types::U256;

use crate::domain::{is_valid_receiver, Quote};
use crate::error::SwapError;

/// Parameters supplied when a token's pool is created.
///
/// # Derived Values
///
/// - Floor quote `p0`: `floor_price` tokens per satoshi, scaled by
///   [`QUOTE_SCALE`](crate::domain::QUOTE_SCALE).
/// - Initial virtual reserves: `T = initial_liquidity`,
///   `B = initial_liquidity * QUOTE_SCALE / floor_price`.
///
/// # Validation
///
/// - `floor_price` and `initial_liquidity` are non-zero.
/// - `receiver` is a structurally valid payout address.
/// - `max_reserved_percent` lies in `1..=100`.
/// - An anti-bot window (`anti_bot_blocks > 0`) needs a non-zero cap.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolConfig {
    floor_price: u128,
    initial_liquidity: u128,
    receiver: String,
    anti_bot_blocks: u64,
    anti_bot_max_tokens: u128,
    max_reserved_percent: u8,
}

impl PoolConfig {
    /// Creates a new `PoolConfig`.
    ///
    /// # Errors
    ///
    /// - [`SwapError::InvalidAmount`] for a zero price or liquidity.
    /// - [`SwapError::InvalidAddress`] for a malformed receiver.
    /// - [`SwapError::InvalidConfiguration`] for inconsistent limits.
    pub fn new(
        floor_price: u128,
        initial_liquidity: u128,
        receiver: impl Into<String>,
        anti_bot_blocks: u64,
        anti_bot_max_tokens: u128,
        max_reserved_percent: u8,
    ) -> Result<Self, SwapError> {
        let config = Self {
            floor_price,
            initial_liquidity,
            receiver: receiver.into(),
            anti_bot_blocks,
            anti_bot_max_tokens,
            max_reserved_percent,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates all configuration invariants.
    ///
    /// # Errors
    ///
    /// See [`PoolConfig::new`].
    pub fn validate(&self) -> Result<(), SwapError> {
        if self.floor_price == 0 {
            return Err(SwapError::InvalidAmount("floor price is zero"));
        }
        if self.initial_liquidity == 0 {
            return Err(SwapError::InvalidAmount("initial liquidity is zero"));
        }
        if !is_valid_receiver(&self.receiver) {
            return Err(SwapError::InvalidAddress("initial provider receiver"));
        }
        if self.max_reserved_percent == 0 || self.max_reserved_percent > 100 {
            return Err(SwapError::InvalidConfiguration(
                "max reserved percent outside 1..=100",
            ));
        }
        if self.anti_bot_blocks > 0 && self.anti_bot_max_tokens == 0 {
            return Err(SwapError::InvalidConfiguration(
                "anti-bot window without a cap",
            ));
        }
        Ok(())
    }

    /// Floor quote, scaled.
    #[must_use]
    pub fn floor_price(&self) -> Quote {
        Quote::from_scaled(U256::from(self.floor_price))
    }

    /// Tokens supplied by the initial provider.
    #[must_use]
    pub const fn initial_liquidity(&self) -> u128 {
        self.initial_liquidity
    }

    /// Payout address of the initial provider.
    #[must_use]
    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    /// Number of blocks the anti-bot cap stays armed.
    #[must_use]
    pub const fn anti_bot_blocks(&self) -> u64 {
        self.anti_bot_blocks
    }

    /// Largest reservation, in tokens, while the anti-bot cap is armed.
    #[must_use]
    pub const fn anti_bot_max_tokens(&self) -> u128 {
        self.anti_bot_max_tokens
    }

    /// Largest share of total liquidity that may be reserved at once.
    #[must_use]
    pub const fn max_reserved_percent(&self) -> u8 {
        self.max_reserved_percent
    }
}
