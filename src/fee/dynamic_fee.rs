//! Size- and volatility-sensitive swap fee.

use primitive_types::U256;

use crate::config::DynamicFeeConfig;
use crate::domain::{BasisPoints, Rounding};
use crate::error::Result;

/// Fractional bits of the fixed-point logarithm.
const LOG_FRACTION_BITS: u32 = 16;

/// `log10(2) * 2^16`, rounded.
const LOG10_2_Q16: i128 = 19_728;

/// Stateless fee calculator over a [`DynamicFeeConfig`].
///
/// ```text
/// fee_bp = base + alpha * log10(trade_sats / reference_sats) + beta * volatility / 10_000
/// ```
///
/// clamped to `[min_fee, max_fee]`. Volatility is in basis points.
///
/// # Examples
///
/// ```
/// use native_swap::config::DynamicFeeConfig;
/// use native_swap::domain::BasisPoints;
/// use native_swap::fee::DynamicFee;
///
/// let fee = DynamicFee::new(DynamicFeeConfig::default());
/// // reference size, calm market: the base fee
/// assert_eq!(fee.fee_bp(10_000, 0), BasisPoints::new(30));
/// // ten times the reference adds alpha
/// assert_eq!(fee.fee_bp(100_000, 0), BasisPoints::new(50));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicFee {
    config: DynamicFeeConfig,
}

impl DynamicFee {
    /// Creates a calculator.
    #[must_use]
    pub const fn new(config: DynamicFeeConfig) -> Self {
        Self { config }
    }

    /// Fee rate for a trade of `trade_sats` at `volatility` basis points.
    #[must_use]
    pub fn fee_bp(&self, trade_sats: u64, volatility: u64) -> BasisPoints {
        let base = i128::from(self.config.base_fee().get());
        let size_term = if trade_sats == 0 {
            i128::MIN / 4
        } else {
            round_q16(
                i128::from(self.config.alpha())
                    * log10_q16(u128::from(trade_sats), u128::from(self.config.reference_sats())),
            )
        };
        let volatility_term =
            i128::from(self.config.beta()) * i128::from(volatility) / 10_000;
        let raw = base
            .saturating_add(size_term)
            .saturating_add(volatility_term);
        let min = i128::from(self.config.min_fee().get());
        let max = i128::from(self.config.max_fee().get());
        let clamped = raw.clamp(min, max);
        BasisPoints::new(u32::try_from(clamped).unwrap_or(self.config.max_fee().get()))
    }

    /// Tokens withheld from a delivery of `tokens`, rounded down.
    ///
    /// # Errors
    ///
    /// Propagates [`BasisPoints::apply`] errors.
    pub fn fee(&self, tokens: u128, trade_sats: u64, volatility: u64) -> Result<u128> {
        self.fee_bp(trade_sats, volatility)
            .apply(tokens, Rounding::Down)
    }
}

/// `log2(n / d)` in Q16 fixed point, for non-zero `n` and `d`.
fn log2_q16(n: u128, d: u128) -> i128 {
    if n == 0 || d == 0 {
        return 0;
    }
    let n_bits = i128::from(127 - n.leading_zeros());
    let d_bits = i128::from(127 - d.leading_zeros());
    let mut integer = n_bits - d_bits;

    // Normalise n / d into [1, 2) as a Q64 value.
    let one = U256::one() << 64;
    let mut x = if integer >= 0 {
        (U256::from(n) << 64) / (U256::from(d) << (integer as usize))
    } else {
        (U256::from(n) << (64 + integer.unsigned_abs() as usize)) / U256::from(d)
    };
    if x < one {
        x <<= 1;
        integer -= 1;
    }
    if x >= one << 1 {
        x >>= 1;
        integer += 1;
    }

    let mut fraction: i128 = 0;
    for bit in (0..LOG_FRACTION_BITS).rev() {
        x = (x * x) >> 64;
        if x >= one << 1 {
            x >>= 1;
            fraction |= 1 << bit;
        }
    }
    (integer << LOG_FRACTION_BITS) + fraction
}

/// `log10(n / d)` in Q16 fixed point, rounded to nearest.
fn log10_q16(n: u128, d: u128) -> i128 {
    round_q16(log2_q16(n, d) * LOG10_2_Q16)
}

/// Drops 16 fractional bits, rounding half up.
fn round_q16(value: i128) -> i128 {
    (value + (1 << (LOG_FRACTION_BITS - 1))) >> LOG_FRACTION_BITS
}
