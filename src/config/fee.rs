//! Parameters of the dynamic swap fee curve.

use crate::domain::BasisPoints;
use crate::error::SwapError;

/// Configuration of the dynamic fee curve.
///
/// The fee charged on a swap, in basis points, is
///
/// ```text
/// fee_bp = base + alpha * log10(trade_sats / reference_sats) + beta * volatility / 10_000
/// ```
///
/// clamped to `[min_fee, max_fee]`.
///
/// # Validation
///
/// - `min_fee <= base_fee <= max_fee`
/// - `max_fee` is a valid percentage (at most 10 000 bp)
/// - `reference_sats` is non-zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DynamicFeeConfig {
    base_fee: BasisPoints,
    min_fee: BasisPoints,
    max_fee: BasisPoints,
    alpha: u32,
    beta: u32,
    reference_sats: u64,
}

impl DynamicFeeConfig {
    /// Creates a new fee configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::InvalidConfiguration`] if the bounds are
    /// inconsistent or `reference_sats` is zero.
    pub fn new(
        base_fee: BasisPoints,
        min_fee: BasisPoints,
        max_fee: BasisPoints,
        alpha: u32,
        beta: u32,
        reference_sats: u64,
    ) -> Result<Self, SwapError> {
        let config = Self {
            base_fee,
            min_fee,
            max_fee,
            alpha,
            beta,
            reference_sats,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates all configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::InvalidConfiguration`] on the first violated rule.
    pub fn validate(&self) -> Result<(), SwapError> {
        if !self.max_fee.is_valid_percent() {
            return Err(SwapError::InvalidConfiguration("max fee exceeds 100%"));
        }
        if self.min_fee > self.max_fee {
            return Err(SwapError::InvalidConfiguration("min fee above max fee"));
        }
        if self.base_fee < self.min_fee || self.base_fee > self.max_fee {
            return Err(SwapError::InvalidConfiguration(
                "base fee outside [min, max]",
            ));
        }
        if self.reference_sats == 0 {
            return Err(SwapError::InvalidConfiguration("reference size is zero"));
        }
        Ok(())
    }

    /// Fee charged on a reference-sized trade in a calm market.
    #[must_use]
    pub const fn base_fee(&self) -> BasisPoints {
        self.base_fee
    }

    /// Lower clamp.
    #[must_use]
    pub const fn min_fee(&self) -> BasisPoints {
        self.min_fee
    }

    /// Upper clamp.
    #[must_use]
    pub const fn max_fee(&self) -> BasisPoints {
        self.max_fee
    }

    /// Basis points added per decade of trade size above the reference.
    #[must_use]
    pub const fn alpha(&self) -> u32 {
        self.alpha
    }

    /// Basis points added per 100% of volatility.
    #[must_use]
    pub const fn beta(&self) -> u32 {
        self.beta
    }

    /// Trade size, in satoshis, at which the size term is zero.
    #[must_use]
    pub const fn reference_sats(&self) -> u64 {
        self.reference_sats
    }
}

impl Default for DynamicFeeConfig {
    fn default() -> Self {
        Self {
            base_fee: BasisPoints::new(30),
            min_fee: BasisPoints::new(15),
            max_fee: BasisPoints::new(150),
            alpha: 20,
            beta: 25,
            reference_sats: 10_000,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(DynamicFeeConfig::default().validate().is_ok());
    }

    #[test]
    fn base_outside_bounds_rejected() {
        let result = DynamicFeeConfig::new(
            BasisPoints::new(200),
            BasisPoints::new(15),
            BasisPoints::new(150),
            20,
            25,
            10_000,
        );
        assert!(matches!(result, Err(SwapError::InvalidConfiguration(_))));
    }

    #[test]
    fn zero_reference_rejected() {
        let result = DynamicFeeConfig::new(
            BasisPoints::new(30),
            BasisPoints::new(15),
            BasisPoints::new(150),
            20,
            25,
            0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn accessors() {
        let Ok(cfg) = DynamicFeeConfig::new(
            BasisPoints::new(40),
            BasisPoints::new(10),
            BasisPoints::new(100),
            5,
            6,
            1_000,
        ) else {
            panic!("expected Ok");
        };
        assert_eq!(cfg.base_fee(), BasisPoints::new(40));
        assert_eq!(cfg.min_fee(), BasisPoints::new(10));
        assert_eq!(cfg.max_fee(), BasisPoints::new(100));
        assert_eq!(cfg.alpha(), 5);
        assert_eq!(cfg.beta(), 6);
        assert_eq!(cfg.reference_sats(), 1_000);
    }
}
