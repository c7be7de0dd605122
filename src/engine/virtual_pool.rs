//! The virtual constant-product market.
//!
//! Trading flow does not move the reserves directly. Each event adds to a
//! pending delta and [`VirtualPool::update_if_needed`] folds all deltas
//! into one constant-product move, at most once per block.

use primitive_types::U256;
use tracing::debug;

use crate::domain::{Address, Quote};
use crate::error::{Result, SwapError};
use crate::math::CheckedArithmetic;
use crate::repository::Repository;
use crate::storage::{decode_u256, decode_u64, encode_u256, encode_u64, Namespace, StorageKey};

/// Virtual reserves, floor price and pending deltas of one pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualPool {
    virtual_btc: U256,
    virtual_tokens: U256,
    floor_price: Quote,
    tokens_added: U256,
    btc_bought: U256,
    tokens_bought: U256,
    tokens_sold: U256,
    last_update_block: u64,
}

const FIELDS: [&[u8]; 8] = [
    b"virtual_btc",
    b"virtual_tokens",
    b"floor_price",
    b"delta_tokens_added",
    b"delta_btc_bought",
    b"delta_tokens_bought",
    b"delta_tokens_sold",
    b"last_virtual_update",
];

fn field_key(token: &Address, field: usize) -> StorageKey {
    StorageKey::for_token(Namespace::PoolScalar, token, FIELDS[field])
}

impl VirtualPool {
    /// Seeds a pool with `tokens` at `floor_price`.
    ///
    /// # Errors
    ///
    /// - [`SwapError::InvalidAmount`] if the floor price is zero or so high
    ///   that the BTC reserve rounds to zero.
    /// - [`SwapError::Overflow`] on overflow.
    pub fn seed(floor_price: Quote, tokens: u128, block: u64) -> Result<Self> {
        if floor_price.is_zero() {
            return Err(SwapError::InvalidAmount("floor price is zero"));
        }
        let virtual_tokens = U256::from(tokens);
        let virtual_btc = virtual_tokens
            .safe_mul(&U256::from(crate::domain::QUOTE_SCALE))?
            .safe_div(&floor_price.scaled())?;
        if virtual_btc.is_zero() {
            return Err(SwapError::InvalidAmount("floor price too high for liquidity"));
        }
        Ok(Self {
            virtual_btc,
            virtual_tokens,
            floor_price,
            last_update_block: block,
            ..Self::default()
        })
    }

    /// Loads the pool of `repo`'s token.
    #[must_use]
    pub fn load(repo: &Repository<'_>) -> Self {
        let token = repo.token();
        let u256 = |field| decode_u256(&repo.get(&field_key(&token, field)));
        Self {
            virtual_btc: u256(0),
            virtual_tokens: u256(1),
            floor_price: Quote::from_scaled(u256(2)),
            tokens_added: u256(3),
            btc_bought: u256(4),
            tokens_bought: u256(5),
            tokens_sold: u256(6),
            last_update_block: decode_u64(&repo.get(&field_key(&token, 7))),
        }
    }

    /// Persists every field.
    pub fn save(&self, repo: &mut Repository<'_>) {
        let token = repo.token();
        let words = [
            encode_u256(self.virtual_btc),
            encode_u256(self.virtual_tokens),
            encode_u256(self.floor_price.scaled()),
            encode_u256(self.tokens_added),
            encode_u256(self.btc_bought),
            encode_u256(self.tokens_bought),
            encode_u256(self.tokens_sold),
            encode_u64(self.last_update_block),
        ];
        for (field, word) in words.into_iter().enumerate() {
            repo.set(field_key(&token, field), word);
        }
    }

    /// Virtual BTC reserve `B`.
    #[must_use]
    pub const fn virtual_btc(&self) -> U256 {
        self.virtual_btc
    }

    /// Virtual token reserve `T`.
    #[must_use]
    pub const fn virtual_tokens(&self) -> U256 {
        self.virtual_tokens
    }

    /// Floor price `p0`.
    #[must_use]
    pub const fn floor_price(&self) -> Quote {
        self.floor_price
    }

    /// Block of the last recomputation.
    #[must_use]
    pub const fn last_update_block(&self) -> u64 {
        self.last_update_block
    }

    /// Pending tokens-added delta.
    #[must_use]
    pub const fn pending_tokens_added(&self) -> U256 {
        self.tokens_added
    }

    /// Current quote `T * QUOTE_SCALE / B`.
    ///
    /// # Errors
    ///
    /// [`SwapError::Invariant`] if `B` is zero while `T` is not.
    pub fn quote(&self) -> Result<Quote> {
        Quote::from_reserves(self.virtual_tokens, self.virtual_btc)
    }

    // -- deltas ---------------------------------------------------------------

    /// Records tokens entering the pool without a price impact of their own.
    ///
    /// # Errors
    ///
    /// [`SwapError::Overflow`] on overflow.
    pub fn add_tokens(&mut self, tokens: u128) -> Result<()> {
        self.tokens_added = self.tokens_added.safe_add(&U256::from(tokens))?;
        Ok(())
    }

    /// Records a purchase of `tokens` for `satoshis`.
    ///
    /// # Errors
    ///
    /// [`SwapError::Overflow`] on overflow.
    pub fn record_buy(&mut self, tokens: u128, satoshis: u64) -> Result<()> {
        self.tokens_bought = self.tokens_bought.safe_add(&U256::from(tokens))?;
        self.btc_bought = self.btc_bought.safe_add(&U256::from(satoshis))?;
        Ok(())
    }

    /// Records tokens sold into the pool.
    ///
    /// # Errors
    ///
    /// [`SwapError::Overflow`] on overflow.
    pub fn record_sell(&mut self, tokens: u128) -> Result<()> {
        self.tokens_sold = self.tokens_sold.safe_add(&U256::from(tokens))?;
        Ok(())
    }

    /// Removes `tokens` from the reserves at the current quote: `T` shrinks
    /// (never below one) and `B` shrinks in proportion.
    ///
    /// # Errors
    ///
    /// [`SwapError::DivisionByZero`] on an empty token reserve.
    pub fn withdraw_tokens(&mut self, tokens: u128) -> Result<()> {
        let before = self.virtual_tokens;
        let after = before
            .saturating_sub(U256::from(tokens))
            .max(U256::one());
        self.virtual_btc = self.virtual_btc.safe_mul(&after)?.safe_div(&before)?;
        self.virtual_tokens = after;
        Ok(())
    }

    /// Folds pending deltas into the reserves, once per block.
    ///
    /// Returns `true` if a recomputation ran.
    ///
    /// 1. `T += tokens_added`.
    /// 2. Buys: `T' = max(T - dT, 1)`, `B' = B*T / T'`. If that implies more
    ///    BTC than was paid, clamp `B' = B + dB` and re-derive
    ///    `T' = max(B*T / B', 1)`.
    /// 3. Sells: `T2 = T + dT_sell`, `B = B*T / T2`, `T = T2`.
    /// 4. Floor `T` at one and clear the deltas.
    ///
    /// # Errors
    ///
    /// [`SwapError::DivisionByZero`] or [`SwapError::Invariant`] if a
    /// denominator is zero; [`SwapError::Overflow`] on overflow.
    pub fn update_if_needed(&mut self, block: u64) -> Result<bool> {
        if block <= self.last_update_block {
            return Ok(false);
        }
        let mut btc = self.virtual_btc;
        let mut tokens = self.virtual_tokens.safe_add(&self.tokens_added)?;

        if !self.btc_bought.is_zero() || !self.tokens_bought.is_zero() {
            let k = btc.safe_mul(&tokens)?;
            let mut new_tokens = tokens.saturating_sub(self.tokens_bought).max(U256::one());
            let mut new_btc = k.safe_div(&new_tokens)?;
            let increase = new_btc.saturating_sub(btc);
            if increase > self.btc_bought {
                new_btc = btc.safe_add(&self.btc_bought)?;
                if new_btc.is_zero() {
                    return Err(SwapError::Invariant("virtual BTC reserve is zero"));
                }
                new_tokens = k.safe_div(&new_btc)?.max(U256::one());
            }
            btc = new_btc;
            tokens = new_tokens;
        }

        if !self.tokens_sold.is_zero() {
            let new_tokens = tokens.safe_add(&self.tokens_sold)?;
            if new_tokens.is_zero() {
                return Err(SwapError::Invariant("token reserve after sells is zero"));
            }
            btc = btc.safe_mul(&tokens)?.safe_div(&new_tokens)?;
            tokens = new_tokens;
        }

        self.virtual_btc = btc;
        self.virtual_tokens = tokens.max(U256::one());
        self.tokens_added = U256::zero();
        self.btc_bought = U256::zero();
        self.tokens_bought = U256::zero();
        self.tokens_sold = U256::zero();
        self.last_update_block = block;
        debug!(
            block,
            virtual_btc = %self.virtual_btc,
            virtual_tokens = %self.virtual_tokens,
            "virtual pool updated"
        );
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::QUOTE_SCALE;
    use crate::storage::MemoryStore;

    fn pool(tokens: u128, tokens_per_sat: u64) -> VirtualPool {
        let price = Quote::from_scaled(U256::from(tokens_per_sat * QUOTE_SCALE));
        let Ok(pool) = VirtualPool::seed(price, tokens, 1) else {
            panic!("valid seed");
        };
        pool
    }

    #[test]
    fn seed_sets_reserves_from_floor() {
        let p = pool(1_000_000, 10);
        assert_eq!(p.virtual_tokens(), U256::from(1_000_000u64));
        assert_eq!(p.virtual_btc(), U256::from(100_000u64));
        let Ok(q) = p.quote() else {
            panic!("expected quote");
        };
        assert_eq!(q.scaled(), U256::from(10 * QUOTE_SCALE));
    }

    #[test]
    fn update_runs_once_per_block() {
        let mut p = pool(1_000_000, 10);
        assert_eq!(p.update_if_needed(1).ok(), Some(false));
        assert_eq!(p.update_if_needed(2).ok(), Some(true));
        assert_eq!(p.update_if_needed(2).ok(), Some(false));
    }

    #[test]
    fn buy_moves_along_the_curve() {
        // B = 100_000, T = 1_000_000, k = 1e11
        let mut p = pool(1_000_000, 10);
        let Ok(()) = p.record_buy(100_000, 20_000) else {
            panic!("expected Ok");
        };
        let Ok(true) = p.update_if_needed(2) else {
            panic!("expected update");
        };
        // T' = 900_000, B' = 1e11 / 900_000 = 111_111
        assert_eq!(p.virtual_tokens(), U256::from(900_000u64));
        assert_eq!(p.virtual_btc(), U256::from(111_111u64));
    }

    #[test]
    fn buy_clamped_by_btc_paid() {
        let mut p = pool(1_000_000, 10);
        // tokens imply +11_111 sats but only 5_000 were paid
        let Ok(()) = p.record_buy(100_000, 5_000) else {
            panic!("expected Ok");
        };
        let Ok(true) = p.update_if_needed(2) else {
            panic!("expected update");
        };
        assert_eq!(p.virtual_btc(), U256::from(105_000u64));
        // T' = 1e11 / 105_000 = 952_380
        assert_eq!(p.virtual_tokens(), U256::from(952_380u64));
    }

    #[test]
    fn sell_raises_tokens_per_satoshi() {
        let mut p = pool(1_000_000, 10);
        let Ok(before) = p.quote() else {
            panic!("expected quote");
        };
        let Ok(()) = p.record_sell(1_000_000) else {
            panic!("expected Ok");
        };
        let Ok(true) = p.update_if_needed(2) else {
            panic!("expected update");
        };
        assert_eq!(p.virtual_tokens(), U256::from(2_000_000u64));
        assert_eq!(p.virtual_btc(), U256::from(50_000u64));
        let Ok(after) = p.quote() else {
            panic!("expected quote");
        };
        assert!(after > before);
    }

    #[test]
    fn tokens_added_grow_reserve() {
        let mut p = pool(1_000, 1);
        let Ok(()) = p.add_tokens(500) else {
            panic!("expected Ok");
        };
        let Ok(true) = p.update_if_needed(2) else {
            panic!("expected update");
        };
        assert_eq!(p.virtual_tokens(), U256::from(1_500u64));
        assert_eq!(p.pending_tokens_added(), U256::zero());
    }

    #[test]
    fn buying_everything_floors_token_reserve_at_one() {
        let mut p = pool(1_000, 1);
        let Ok(()) = p.record_buy(5_000, u64::MAX) else {
            panic!("expected Ok");
        };
        let Ok(true) = p.update_if_needed(2) else {
            panic!("expected update");
        };
        assert_eq!(p.virtual_tokens(), U256::one());
    }

    #[test]
    fn withdraw_keeps_quote() {
        let mut p = pool(1_000_000, 10);
        let Ok(()) = p.withdraw_tokens(500_000) else {
            panic!("expected Ok");
        };
        assert_eq!(p.virtual_tokens(), U256::from(500_000u64));
        assert_eq!(p.virtual_btc(), U256::from(50_000u64));
    }

    #[test]
    fn save_then_load() {
        let base = MemoryStore::new();
        let mut repo = Repository::new(&base, Address::from_bytes([1u8; 32]));
        let mut p = pool(1_000_000, 10);
        let Ok(()) = p.record_buy(10, 1) else {
            panic!("expected Ok");
        };
        p.save(&mut repo);
        assert_eq!(VirtualPool::load(&repo), p);
    }
}
