//! Basis-point representation for fees and taxes.

use core::fmt;

use primitive_types::U256;

use super::Rounding;
use crate::error::{Result, SwapError};

/// Maximum value that represents 100%.
const MAX_BPS: u32 = 10_000;

/// A percentage expressed in basis points (1 bp = 0.01%, 10 000 bp = 100%).
///
/// Used for the priority-listing tax, the dynamic swap fee and the
/// fee-curve bounds.
///
/// # Examples
///
/// ```
/// use native_swap::domain::{BasisPoints, Rounding};
///
/// let tax = BasisPoints::new(300);
/// assert_eq!(tax.apply(1_000, Rounding::Down).ok(), Some(30));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BasisPoints(u32);

impl BasisPoints {
    /// Zero basis points (0%).
    pub const ZERO: Self = Self(0);

    /// 100% expressed in basis points.
    pub const MAX_PERCENT: Self = Self(MAX_BPS);

    /// Creates a new `BasisPoints` from a raw `u32` value.
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the underlying `u32` value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Returns `true` if the value is in the valid percentage range (`0..=10_000`).
    #[must_use]
    pub const fn is_valid_percent(&self) -> bool {
        self.0 <= MAX_BPS
    }

    /// Computes `amount * self / 10_000` with explicit rounding.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Overflow`] if the result does not fit a `u128`.
    pub fn apply(&self, amount: u128, rounding: Rounding) -> Result<u128> {
        let product = U256::from(amount) * U256::from(self.0);
        let share = rounding
            .divide(product, U256::from(MAX_BPS))
            .ok_or(SwapError::DivisionByZero("basis points denominator"))?;
        if share > U256::from(u128::MAX) {
            return Err(SwapError::Overflow("basis points apply overflow"));
        }
        Ok(share.low_u128())
    }
}

impl fmt::Display for BasisPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bp", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn constants() {
        assert_eq!(BasisPoints::ZERO.get(), 0);
        assert_eq!(BasisPoints::MAX_PERCENT.get(), 10_000);
    }

    #[test]
    fn valid_percent_range() {
        assert!(BasisPoints::new(10_000).is_valid_percent());
        assert!(!BasisPoints::new(10_001).is_valid_percent());
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", BasisPoints::new(30)), "30bp");
    }

    #[test]
    fn apply_round_down() {
        let Ok(fee) = BasisPoints::new(30).apply(1_000_000, Rounding::Down) else {
            panic!("expected Ok");
        };
        assert_eq!(fee, 3_000);
    }

    #[test]
    fn apply_round_up_remainder() {
        let Ok(fee) = BasisPoints::new(30).apply(1, Rounding::Up) else {
            panic!("expected Ok");
        };
        assert_eq!(fee, 1);
    }

    #[test]
    fn apply_full_u128_does_not_overflow_at_100_percent() {
        let Ok(all) = BasisPoints::MAX_PERCENT.apply(u128::MAX, Rounding::Down) else {
            panic!("expected Ok");
        };
        assert_eq!(all, u128::MAX);
    }

    #[test]
    fn apply_overflow_above_100_percent() {
        let result = BasisPoints::new(20_000).apply(u128::MAX, Rounding::Down);
        assert!(matches!(result, Err(SwapError::Overflow(_))));
    }
}
