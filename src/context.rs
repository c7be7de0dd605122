//! Per-call environment and buffered side effects.
//!
//! A call reads the host once into a [`CallEnv`] and records every token
//! movement and event into [`CallEffects`]. Nothing reaches the host until
//! the call has succeeded.

use tracing::debug;

use crate::domain::Address;
use crate::error::{Result, SwapError};
use crate::events::SwapEvent;
use crate::math::CheckedArithmetic;
use crate::traits::{Host, TransactionOutput};

/// Destination of forfeited dust liquidity.
pub const BURN_ADDRESS: Address = Address::zero();

/// Snapshot of the host environment for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEnv {
    sender: Address,
    origin: Address,
    block: u64,
    outputs: Vec<TransactionOutput>,
}

impl CallEnv {
    /// Builds an environment by hand.
    #[must_use]
    pub const fn new(
        sender: Address,
        origin: Address,
        block: u64,
        outputs: Vec<TransactionOutput>,
    ) -> Self {
        Self {
            sender,
            origin,
            block,
            outputs,
        }
    }

    /// Reads the environment of the in-flight transaction.
    #[must_use]
    pub fn capture<H: Host + ?Sized>(host: &H) -> Self {
        Self {
            sender: host.sender(),
            origin: host.origin(),
            block: host.block_number(),
            outputs: host.outputs().to_vec(),
        }
    }

    /// Immediate caller.
    #[must_use]
    pub const fn sender(&self) -> Address {
        self.sender
    }

    /// Originator of the transaction.
    #[must_use]
    pub const fn origin(&self) -> Address {
        self.origin
    }

    /// Current block height.
    #[must_use]
    pub const fn block(&self) -> u64 {
        self.block
    }

    /// Total satoshis the transaction pays to `receiver`.
    ///
    /// # Errors
    ///
    /// [`SwapError::Overflow`] if the outputs sum past `u64::MAX`.
    pub fn paid_to(&self, receiver: &str) -> Result<u64> {
        self.outputs
            .iter()
            .filter(|output| output.to == receiver)
            .try_fold(0u64, |total, output| total.safe_add(&output.value))
    }

    /// Fails unless at least `required` satoshis are paid to `receiver`.
    ///
    /// # Errors
    ///
    /// [`SwapError::InsufficientFee`] when the payment is short.
    pub fn require_payment(&self, receiver: &str, required: u64) -> Result<()> {
        let paid = self.paid_to(receiver)?;
        if paid < required {
            return Err(SwapError::InsufficientFee { paid, required });
        }
        Ok(())
    }
}

/// A token movement between the engine and an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMovement {
    /// Counterparty.
    pub account: Address,
    /// Token amount.
    pub amount: u128,
}

/// Token movements and events accumulated during a call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallEffects {
    pulls: Vec<TokenMovement>,
    pushes: Vec<TokenMovement>,
    events: Vec<SwapEvent>,
}

impl CallEffects {
    /// Empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a pull of `amount` tokens from `from` into the engine.
    pub fn pull(&mut self, from: Address, amount: u128) {
        if amount > 0 {
            self.pulls.push(TokenMovement {
                account: from,
                amount,
            });
        }
    }

    /// Queues a payout of `amount` tokens to `to`.
    pub fn push(&mut self, to: Address, amount: u128) {
        if amount > 0 {
            self.pushes.push(TokenMovement {
                account: to,
                amount,
            });
        }
    }

    /// Queues an event.
    pub fn emit(&mut self, event: SwapEvent) {
        self.events.push(event);
    }

    /// Queued pulls.
    #[must_use]
    pub fn pulls(&self) -> &[TokenMovement] {
        &self.pulls
    }

    /// Queued payouts.
    #[must_use]
    pub fn pushes(&self) -> &[TokenMovement] {
        &self.pushes
    }

    /// Queued events.
    #[must_use]
    pub fn events(&self) -> &[SwapEvent] {
        &self.events
    }

    /// Performs the queued pulls. Runs before state is committed, so a
    /// failed pull aborts the call.
    ///
    /// # Errors
    ///
    /// Propagates the host's transfer error.
    pub fn collect<H: Host + ?Sized>(&self, host: &mut H, token: &Address) -> Result<()> {
        for pull in &self.pulls {
            host.transfer_from(token, &pull.account, pull.amount)?;
        }
        Ok(())
    }

    /// Performs the queued payouts and reports the events.
    ///
    /// # Errors
    ///
    /// Propagates the host's transfer error.
    pub fn settle<H: Host + ?Sized>(self, host: &mut H, token: &Address) -> Result<()> {
        for push in &self.pushes {
            host.transfer(token, &push.account, push.amount)?;
        }
        debug!(
            pushes = self.pushes.len(),
            events = self.events.len(),
            "call effects settled"
        );
        for event in self.events {
            host.emit(event);
        }
        Ok(())
    }
}
