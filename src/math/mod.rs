//! Arithmetic utilities for engine calculations.
//!
//! [`CheckedArithmetic`] gives overflow-safe operations on `u64`, `u128`
//! and [`U256`](primitive_types::U256); the narrowing helpers convert wide
//! intermediates back to storage widths with an explicit error.

mod checked;

pub use checked::{narrow_u128, narrow_u64, CheckedArithmetic};
