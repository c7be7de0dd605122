//! Explicit rounding direction for quote conversions.

use primitive_types::U256;

/// Rounding direction for every division the engine performs.
///
/// Conversions between satoshis and tokens always state which side the
/// remainder favours, so a reader can tell whether the pool or the
/// counterparty absorbs the dust.
///
/// # Examples
///
/// ```
/// use native_swap::domain::Rounding;
/// use primitive_types::U256;
///
/// let q = Rounding::Up.divide(U256::from(10u8), U256::from(3u8));
/// assert_eq!(q, Some(U256::from(4u8)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rounding {
    /// Round towards positive infinity (ceiling).
    Up,
    /// Round towards zero (floor).
    Down,
}

impl Rounding {
    /// Returns `true` if this is [`Rounding::Up`].
    #[must_use]
    pub const fn is_up(&self) -> bool {
        matches!(self, Self::Up)
    }

    /// Divides `numerator` by `denominator` in this direction.
    ///
    /// Returns `None` when `denominator` is zero.
    #[must_use]
    pub fn divide(&self, numerator: U256, denominator: U256) -> Option<U256> {
        if denominator.is_zero() {
            return None;
        }
        let (q, r) = numerator.div_mod(denominator);
        match self {
            Self::Down => Some(q),
            // q + 1 cannot overflow: r != 0 implies numerator > q * denominator >= q
            Self::Up if !r.is_zero() => Some(q + U256::one()),
            Self::Up => Some(q),
        }
    }
}
