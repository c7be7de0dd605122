//! Checked arithmetic trait for the engine's integer widths.
//!
//! The [`CheckedArithmetic`] trait provides fallible arithmetic operations
//! that return [`Result<Self, SwapError>`](crate::error::SwapError) instead
//! of panicking on overflow, underflow, or division by zero.
//!
//! # Implementations
//!
//! - `u64`: satoshi quantities
//! - `u128`: token quantities
//! - [`U256`]: virtual reserves, BTC owed, cumulative totals
//!
//! # Examples
//!
//! ```
//! use native_swap::math::CheckedArithmetic;
//!
//! assert_eq!(100u128.safe_add(&200).ok(), Some(300));
//! assert!(0u64.safe_sub(&1).is_err());
//! ```

use primitive_types::U256;

use crate::error::SwapError;

/// Fallible arithmetic for integer types.
///
/// # Contract
///
/// - **No panics**: all error conditions produce `Err`.
/// - **No saturation**: overflow is an error.
///   Call sites that want clamping say so explicitly with `min`/`max`.
pub trait CheckedArithmetic: Sized {
    /// Checked addition.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Overflow`] if the result exceeds the
    /// representable range.
    fn safe_add(&self, other: &Self) -> Result<Self, SwapError>;

    /// Checked subtraction.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Underflow`] if the result would be negative.
    fn safe_sub(&self, other: &Self) -> Result<Self, SwapError>;

    /// Checked multiplication.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Overflow`] if the result exceeds the
    /// representable range.
    fn safe_mul(&self, other: &Self) -> Result<Self, SwapError>;

    /// Checked floor division.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::DivisionByZero`] if `other` is zero.
    fn safe_div(&self, other: &Self) -> Result<Self, SwapError>;
}

macro_rules! impl_checked_primitive {
    ($ty:ty, $name:literal) => {
        impl CheckedArithmetic for $ty {
            #[inline]
            fn safe_add(&self, other: &Self) -> Result<Self, SwapError> {
                self.checked_add(*other)
                    .ok_or(SwapError::Overflow(concat!($name, " addition overflow")))
            }

            #[inline]
            fn safe_sub(&self, other: &Self) -> Result<Self, SwapError> {
                self.checked_sub(*other)
                    .ok_or(SwapError::Underflow(concat!($name, " subtraction underflow")))
            }

            #[inline]
            fn safe_mul(&self, other: &Self) -> Result<Self, SwapError> {
                self.checked_mul(*other)
                    .ok_or(SwapError::Overflow(concat!($name, " multiplication overflow")))
            }

            #[inline]
            fn safe_div(&self, other: &Self) -> Result<Self, SwapError> {
                self.checked_div(*other)
                    .ok_or(SwapError::DivisionByZero(concat!($name, " division")))
            }
        }
    };
}

impl_checked_primitive!(u64, "u64");
impl_checked_primitive!(u128, "u128");
impl_checked_primitive!(U256, "u256");

/// Narrows a [`U256`] to `u128`.
///
/// # Errors
///
/// Returns [`SwapError::Overflow`] with `context` if the value does not fit.
pub fn narrow_u128(value: U256, context: &'static str) -> Result<u128, SwapError> {
    if value > U256::from(u128::MAX) {
        return Err(SwapError::Overflow(context));
    }
    Ok(value.low_u128())
}

/// Narrows a [`U256`] to `u64`.
///
/// # Errors
///
/// Returns [`SwapError::Overflow`] with `context` if the value does not fit.
pub fn narrow_u64(value: U256, context: &'static str) -> Result<u64, SwapError> {
    if value > U256::from(u64::MAX) {
        return Err(SwapError::Overflow(context));
    }
    Ok(value.low_u64())
}
