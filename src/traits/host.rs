//! The ledger host seam.

use crate::domain::Address;
use crate::error::Result;
use crate::events::SwapEvent;

/// A payment output of the in-flight transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionOutput {
    /// Destination payout address.
    pub to: String,
    /// Satoshis paid.
    pub value: u64,
}

impl TransactionOutput {
    /// Creates an output paying `value` satoshis to `to`.
    #[must_use]
    pub fn new(to: impl Into<String>, value: u64) -> Self {
        Self {
            to: to.into(),
            value,
        }
    }
}

/// Transaction introspection and token movement provided by the ledger.
///
/// The engine reads the environment at the start of a call and performs
/// transfers and emits events only after the call's state changes are
/// known to succeed.
pub trait Host {
    /// Immediate caller.
    fn sender(&self) -> Address;

    /// Originator of the transaction.
    fn origin(&self) -> Address;

    /// Height of the block being executed.
    fn block_number(&self) -> u64;

    /// Payment outputs of the in-flight transaction.
    fn outputs(&self) -> &[TransactionOutput];

    /// Sends `amount` of `token` from the engine to `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine's balance is insufficient.
    fn transfer(&mut self, token: &Address, to: &Address, amount: u128) -> Result<()>;

    /// Pulls `amount` of `token` from `from` into the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if `from` does not hold enough tokens.
    fn transfer_from(&mut self, token: &Address, from: &Address, amount: u128) -> Result<()>;

    /// Records an event.
    fn emit(&mut self, event: SwapEvent);
}
