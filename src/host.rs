//! An in-memory ledger host for simulation and tests.

use std::collections::BTreeMap;

use crate::domain::Address;
use crate::error::{Result, SwapError};
use crate::events::SwapEvent;
use crate::math::CheckedArithmetic;
use crate::traits::{Host, TransactionOutput};

/// Address holding the tokens the engine controls.
pub const ENGINE_ACCOUNT: Address = Address::from_bytes([0xEE; 32]);

/// Token balances, a configurable transaction and an event log.
///
/// # Examples
///
/// ```
/// use native_swap::domain::Address;
/// use native_swap::host::MemoryHost;
/// use native_swap::traits::{Host, TransactionOutput};
///
/// let token = Address::from_bytes([7; 32]);
/// let alice = Address::from_bytes([1; 32]);
/// let mut host = MemoryHost::new();
/// host.mint(&token, &alice, 1_000);
/// host.set_sender(alice);
/// host.set_outputs(vec![TransactionOutput::new("bc1qseller", 5_000)]);
/// assert_eq!(host.balance(&token, &alice), 1_000);
/// assert_eq!(host.sender(), alice);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    sender: Address,
    origin: Address,
    block: u64,
    outputs: Vec<TransactionOutput>,
    balances: BTreeMap<(Address, Address), u128>,
    events: Vec<SwapEvent>,
}

impl MemoryHost {
    /// Empty host at block zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the caller; the origin follows it.
    pub fn set_sender(&mut self, sender: Address) {
        self.sender = sender;
        self.origin = sender;
    }

    /// Sets the origin independently of the sender.
    pub fn set_origin(&mut self, origin: Address) {
        self.origin = origin;
    }

    /// Moves to `block`.
    pub fn set_block(&mut self, block: u64) {
        self.block = block;
    }

    /// Advances the block height by `blocks`.
    pub fn advance_blocks(&mut self, blocks: u64) {
        self.block = self.block.saturating_add(blocks);
    }

    /// Replaces the outputs of the in-flight transaction.
    pub fn set_outputs(&mut self, outputs: Vec<TransactionOutput>) {
        self.outputs = outputs;
    }

    /// Credits `amount` of `token` to `account`.
    pub fn mint(&mut self, token: &Address, account: &Address, amount: u128) {
        let balance = self.balances.entry((*token, *account)).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Balance of `account` in `token`.
    #[must_use]
    pub fn balance(&self, token: &Address, account: &Address) -> u128 {
        self.balances
            .get(&(*token, *account))
            .copied()
            .unwrap_or_default()
    }

    /// Events emitted so far.
    #[must_use]
    pub fn events(&self) -> &[SwapEvent] {
        &self.events
    }

    /// Drains the event log.
    pub fn take_events(&mut self) -> Vec<SwapEvent> {
        std::mem::take(&mut self.events)
    }

    fn move_tokens(&mut self, token: &Address, from: &Address, to: &Address, amount: u128) -> Result<()> {
        let available = self.balance(token, from);
        if available < amount {
            return Err(SwapError::Rejected("insufficient token balance"));
        }
        self.balances.insert((*token, *from), available - amount);
        let credited = self.balance(token, to).safe_add(&amount)?;
        self.balances.insert((*token, *to), credited);
        Ok(())
    }
}

impl Host for MemoryHost {
    fn sender(&self) -> Address {
        self.sender
    }

    fn origin(&self) -> Address {
        self.origin
    }

    fn block_number(&self) -> u64 {
        self.block
    }

    fn outputs(&self) -> &[TransactionOutput] {
        &self.outputs
    }

    fn transfer(&mut self, token: &Address, to: &Address, amount: u128) -> Result<()> {
        self.move_tokens(token, &ENGINE_ACCOUNT, to, amount)
    }

    fn transfer_from(&mut self, token: &Address, from: &Address, amount: u128) -> Result<()> {
        self.move_tokens(token, from, &ENGINE_ACCOUNT, amount)
    }

    fn emit(&mut self, event: SwapEvent) {
        self.events.push(event);
    }
}
