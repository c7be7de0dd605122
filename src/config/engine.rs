//! Engine-wide constants.

use super::DynamicFeeConfig;
use crate::domain::{is_valid_receiver, BasisPoints};
use crate::error::SwapError;

/// Constants governing reservations, listings and fees.
///
/// [`EngineConfig::default`] yields the production values. Individual
/// values can be overridden with the `with_*` methods; [`validate`] must be
/// called afterwards (the [`NativeSwap`](crate::operations::NativeSwap)
/// constructor does this).
///
/// [`validate`]: EngineConfig::validate
///
/// # Examples
///
/// ```
/// use native_swap::config::EngineConfig;
///
/// let config = EngineConfig::default().with_enforce_timeout(false);
/// assert!(config.validate().is_ok());
/// assert!(!config.enforce_timeout());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    reservation_expiry_blocks: u64,
    timeout_after_expiration: u64,
    strict_minimum_provider_reservation: u64,
    minimum_provider_reservation: u64,
    minimum_listing_value: u64,
    minimum_trade_size: u64,
    priority_tax: BasisPoints,
    priority_listing_fee: u64,
    reservation_fee: u64,
    max_providers_per_reservation: u32,
    volatility_window: u64,
    enforce_timeout: bool,
    fee_recipient: String,
    fee: DynamicFeeConfig,
}

impl EngineConfig {
    /// Validates all configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::InvalidConfiguration`] on the first violated rule.
    pub fn validate(&self) -> Result<(), SwapError> {
        if self.reservation_expiry_blocks == 0 {
            return Err(SwapError::InvalidConfiguration(
                "reservation expiry window is zero",
            ));
        }
        if self.strict_minimum_provider_reservation == 0 {
            return Err(SwapError::InvalidConfiguration("strict minimum is zero"));
        }
        if self.minimum_provider_reservation < self.strict_minimum_provider_reservation {
            return Err(SwapError::InvalidConfiguration(
                "minimum provider reservation below strict minimum",
            ));
        }
        if self.minimum_trade_size == 0 || self.minimum_listing_value == 0 {
            return Err(SwapError::InvalidConfiguration("zero trade or listing minimum"));
        }
        if !self.priority_tax.is_valid_percent() {
            return Err(SwapError::InvalidConfiguration("priority tax exceeds 100%"));
        }
        if self.max_providers_per_reservation == 0 {
            return Err(SwapError::InvalidConfiguration(
                "max providers per reservation is zero",
            ));
        }
        if self.volatility_window == 0 {
            return Err(SwapError::InvalidConfiguration("volatility window is zero"));
        }
        if !is_valid_receiver(&self.fee_recipient) {
            return Err(SwapError::InvalidConfiguration("invalid fee recipient"));
        }
        self.fee.validate()
    }

    // -- builders -------------------------------------------------------------

    /// Overrides the reservation expiry window.
    #[must_use]
    pub const fn with_reservation_expiry_blocks(mut self, blocks: u64) -> Self {
        self.reservation_expiry_blocks = blocks;
        self
    }

    /// Overrides the timeout window that follows an expired reservation.
    #[must_use]
    pub const fn with_timeout_after_expiration(mut self, blocks: u64) -> Self {
        self.timeout_after_expiration = blocks;
        self
    }

    /// Overrides the minimum trade size.
    #[must_use]
    pub const fn with_minimum_trade_size(mut self, sats: u64) -> Self {
        self.minimum_trade_size = sats;
        self
    }

    /// Overrides the minimum listing value.
    #[must_use]
    pub const fn with_minimum_listing_value(mut self, sats: u64) -> Self {
        self.minimum_listing_value = sats;
        self
    }

    /// Overrides both provider minimums.
    #[must_use]
    pub const fn with_provider_minimums(mut self, strict: u64, minimum: u64) -> Self {
        self.strict_minimum_provider_reservation = strict;
        self.minimum_provider_reservation = minimum;
        self
    }

    /// Overrides the reservation fee.
    #[must_use]
    pub const fn with_reservation_fee(mut self, sats: u64) -> Self {
        self.reservation_fee = sats;
        self
    }

    /// Overrides the priority listing fee and tax.
    #[must_use]
    pub const fn with_priority_terms(mut self, fee_sats: u64, tax: BasisPoints) -> Self {
        self.priority_listing_fee = fee_sats;
        self.priority_tax = tax;
        self
    }

    /// Overrides the provider cap per reservation.
    #[must_use]
    pub const fn with_max_providers_per_reservation(mut self, max: u32) -> Self {
        self.max_providers_per_reservation = max;
        self
    }

    /// Enables or disables buyer timeout enforcement.
    #[must_use]
    pub const fn with_enforce_timeout(mut self, enforce: bool) -> Self {
        self.enforce_timeout = enforce;
        self
    }

    /// Overrides the fee recipient address.
    #[must_use]
    pub fn with_fee_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.fee_recipient = recipient.into();
        self
    }

    /// Overrides the dynamic fee curve.
    #[must_use]
    pub const fn with_fee(mut self, fee: DynamicFeeConfig) -> Self {
        self.fee = fee;
        self
    }

    // -- accessors ------------------------------------------------------------

    /// Blocks a reservation stays valid after creation.
    #[must_use]
    pub const fn reservation_expiry_blocks(&self) -> u64 {
        self.reservation_expiry_blocks
    }

    /// Blocks after expiration during which the buyer cannot reserve again.
    #[must_use]
    pub const fn timeout_after_expiration(&self) -> u64 {
        self.timeout_after_expiration
    }

    /// Satoshi value below which a provider balance is dust.
    #[must_use]
    pub const fn strict_minimum_provider_reservation(&self) -> u64 {
        self.strict_minimum_provider_reservation
    }

    /// Smallest satoshi value taken from a single provider.
    #[must_use]
    pub const fn minimum_provider_reservation(&self) -> u64 {
        self.minimum_provider_reservation
    }

    /// Smallest satoshi value of a listing.
    #[must_use]
    pub const fn minimum_listing_value(&self) -> u64 {
        self.minimum_listing_value
    }

    /// Smallest satoshi value of a reservation.
    #[must_use]
    pub const fn minimum_trade_size(&self) -> u64 {
        self.minimum_trade_size
    }

    /// Token tax charged on priority listings.
    #[must_use]
    pub const fn priority_tax(&self) -> BasisPoints {
        self.priority_tax
    }

    /// BTC fee charged on priority listings.
    #[must_use]
    pub const fn priority_listing_fee(&self) -> u64 {
        self.priority_listing_fee
    }

    /// BTC fee charged on every reservation.
    #[must_use]
    pub const fn reservation_fee(&self) -> u64 {
        self.reservation_fee
    }

    /// Maximum provider legs per reservation.
    #[must_use]
    pub const fn max_providers_per_reservation(&self) -> u32 {
        self.max_providers_per_reservation
    }

    /// Look-back, in blocks, of the volatility estimate.
    #[must_use]
    pub const fn volatility_window(&self) -> u64 {
        self.volatility_window
    }

    /// Whether lapsed buyers are blocked from reserving again.
    #[must_use]
    pub const fn enforce_timeout(&self) -> bool {
        self.enforce_timeout
    }

    /// Payout address of reservation and priority fees.
    #[must_use]
    pub fn fee_recipient(&self) -> &str {
        &self.fee_recipient
    }

    /// Dynamic fee curve.
    #[must_use]
    pub const fn fee(&self) -> &DynamicFeeConfig {
        &self.fee
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reservation_expiry_blocks: 5,
            timeout_after_expiration: 5,
            strict_minimum_provider_reservation: 600,
            minimum_provider_reservation: 1_000,
            minimum_listing_value: 10_000,
            minimum_trade_size: 10_000,
            priority_tax: BasisPoints::new(300),
            priority_listing_fee: 1_000,
            reservation_fee: 5_000,
            max_providers_per_reservation: 100,
            volatility_window: 5,
            enforce_timeout: true,
            fee_recipient: String::from("bc1qnativeswapfeerecipient"),
            fee: DynamicFeeConfig::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.reservation_expiry_blocks(), 5);
        assert_eq!(cfg.timeout_after_expiration(), 5);
        assert_eq!(cfg.strict_minimum_provider_reservation(), 600);
        assert_eq!(cfg.minimum_provider_reservation(), 1_000);
        assert_eq!(cfg.minimum_listing_value(), 10_000);
        assert_eq!(cfg.minimum_trade_size(), 10_000);
        assert_eq!(cfg.priority_tax(), BasisPoints::new(300));
        assert_eq!(cfg.priority_listing_fee(), 1_000);
        assert_eq!(cfg.reservation_fee(), 5_000);
        assert_eq!(cfg.max_providers_per_reservation(), 100);
        assert_eq!(cfg.volatility_window(), 5);
        assert!(cfg.enforce_timeout());
    }

    #[test]
    fn minimums_must_be_ordered() {
        let cfg = EngineConfig::default().with_provider_minimums(1_000, 600);
        assert!(matches!(
            cfg.validate(),
            Err(SwapError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn zero_expiry_rejected() {
        let cfg = EngineConfig::default().with_reservation_expiry_blocks(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn priority_tax_over_100_percent_rejected() {
        let cfg = EngineConfig::default().with_priority_terms(1_000, BasisPoints::new(10_001));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_fee_recipient_rejected() {
        let cfg = EngineConfig::default().with_fee_recipient("");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn builders_override() {
        let cfg = EngineConfig::default()
            .with_reservation_fee(0)
            .with_minimum_trade_size(1)
            .with_max_providers_per_reservation(3)
            .with_fee_recipient("fees");
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.reservation_fee(), 0);
        assert_eq!(cfg.minimum_trade_size(), 1);
        assert_eq!(cfg.max_providers_per_reservation(), 3);
        assert_eq!(cfg.fee_recipient(), "fees");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn loads_from_json() {
        let cfg = EngineConfig::default().with_fee_recipient("bc1qtreasury");
        let Ok(json) = serde_json::to_string(&cfg) else {
            panic!("expected Ok");
        };
        let Ok(loaded) = serde_json::from_str::<EngineConfig>(&json) else {
            panic!("expected Ok");
        };
        assert_eq!(loaded, cfg);
        assert!(loaded.validate().is_ok());
    }
}
