//! Scaled token-per-satoshi quote.

use core::fmt;

use primitive_types::U256;

use super::Rounding;
use crate::error::{Result, SwapError};

/// Fixed scale applied to every quote.
pub const QUOTE_SCALE: u64 = 100_000_000;

/// Price of one satoshi in tokens, multiplied by [`QUOTE_SCALE`].
///
/// A quote is derived from the virtual reserves as
/// `virtual_token_reserve * QUOTE_SCALE / virtual_btc_reserve`.  The zero
/// quote means "no price yet" and refuses every conversion.
///
/// # Examples
///
/// ```
/// use native_swap::domain::{Quote, Rounding};
///
/// // 50 tokens per satoshi
/// let quote = Quote::from_reserves(50_000u64.into(), 1_000u64.into()).expect("priced");
/// assert_eq!(quote.satoshis_to_tokens(10, Rounding::Down).ok(), Some(500));
/// assert_eq!(quote.tokens_to_satoshis(500, Rounding::Down).ok(), Some(10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Quote(U256);

impl Quote {
    /// The unpriced quote.
    pub const ZERO: Self = Self(U256::zero());

    /// Wraps an already-scaled value.
    #[must_use]
    pub const fn from_scaled(value: U256) -> Self {
        Self(value)
    }

    /// Computes `tokens * QUOTE_SCALE / btc`.
    ///
    /// # Errors
    ///
    /// - [`SwapError::Invariant`] if `btc` is zero while `tokens` is not.
    /// - [`SwapError::Overflow`] if the scaled product overflows.
    pub fn from_reserves(tokens: U256, btc: U256) -> Result<Self> {
        if btc.is_zero() {
            if tokens.is_zero() {
                return Ok(Self::ZERO);
            }
            return Err(SwapError::Invariant("virtual BTC reserve is zero"));
        }
        let scaled = tokens
            .checked_mul(U256::from(QUOTE_SCALE))
            .ok_or(SwapError::Overflow("quote scaling overflow"))?;
        Ok(Self(scaled / btc))
    }

    /// Returns the scaled value.
    #[must_use]
    pub const fn scaled(&self) -> U256 {
        self.0
    }

    /// Returns `true` if no price is available.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Converts satoshis into tokens at this quote.
    ///
    /// # Errors
    ///
    /// - [`SwapError::InsufficientLiquidity`] if the quote is zero.
    /// - [`SwapError::Overflow`] if the result does not fit a `u128`.
    pub fn satoshis_to_tokens(&self, satoshis: u64, rounding: Rounding) -> Result<u128> {
        if self.is_zero() {
            return Err(SwapError::InsufficientLiquidity("quote is zero"));
        }
        let product = U256::from(satoshis)
            .checked_mul(self.0)
            .ok_or(SwapError::Overflow("satoshis to tokens overflow"))?;
        let tokens = rounding
            .divide(product, U256::from(QUOTE_SCALE))
            .ok_or(SwapError::DivisionByZero("quote scale"))?;
        to_u128(tokens, "satoshis to tokens exceeds u128")
    }

    /// Converts tokens into satoshis at this quote.
    ///
    /// # Errors
    ///
    /// - [`SwapError::InsufficientLiquidity`] if the quote is zero.
    /// - [`SwapError::Overflow`] if the result does not fit a `u64`.
    pub fn tokens_to_satoshis(&self, tokens: u128, rounding: Rounding) -> Result<u64> {
        if self.is_zero() {
            return Err(SwapError::InsufficientLiquidity("quote is zero"));
        }
        let product = U256::from(tokens) * U256::from(QUOTE_SCALE);
        let sats = rounding
            .divide(product, self.0)
            .ok_or(SwapError::DivisionByZero("quote"))?;
        if sats > U256::from(u64::MAX) {
            return Err(SwapError::Overflow("tokens to satoshis exceeds u64"));
        }
        Ok(sats.low_u64())
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn to_u128(value: U256, context: &'static str) -> Result<u128> {
    if value > U256::from(u128::MAX) {
        return Err(SwapError::Overflow(context));
    }
    Ok(value.low_u128())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn quote(tokens: u64, btc: u64) -> Quote {
        let Ok(q) = Quote::from_reserves(U256::from(tokens), U256::from(btc)) else {
            panic!("valid reserves");
        };
        q
    }

    #[test]
    fn from_reserves_scales() {
        assert_eq!(quote(2_000, 1_000).scaled(), U256::from(2 * QUOTE_SCALE));
    }

    #[test]
    fn empty_pool_has_zero_quote() {
        assert!(quote(0, 0).is_zero());
    }

    #[test]
    fn zero_btc_with_tokens_is_invariant_violation() {
        let result = Quote::from_reserves(U256::from(10u8), U256::zero());
        assert!(matches!(result, Err(SwapError::Invariant(_))));
    }

    #[test]
    fn conversions_at_fractional_quote() {
        // 0.5 tokens per satoshi
        let q = quote(500, 1_000);
        let Ok(tokens) = q.satoshis_to_tokens(1_001, Rounding::Down) else {
            panic!("expected Ok");
        };
        assert_eq!(tokens, 500);
        let Ok(sats) = q.tokens_to_satoshis(3, Rounding::Up) else {
            panic!("expected Ok");
        };
        assert_eq!(sats, 6);
    }

    #[test]
    fn zero_quote_refuses_conversion() {
        assert!(matches!(
            Quote::ZERO.satoshis_to_tokens(1, Rounding::Down),
            Err(SwapError::InsufficientLiquidity(_))
        ));
        assert!(matches!(
            Quote::ZERO.tokens_to_satoshis(1, Rounding::Down),
            Err(SwapError::InsufficientLiquidity(_))
        ));
    }

    #[test]
    fn tokens_to_satoshis_overflow() {
        // 1e-8 tokens per satoshi: every token costs 1e8 sats
        let q = Quote::from_scaled(U256::one());
        assert!(matches!(
            q.tokens_to_satoshis(u128::MAX, Rounding::Down),
            Err(SwapError::Overflow(_))
        ));
    }
}
