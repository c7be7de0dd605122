//! # Native Swap
//!
//! Settlement core for an exchange where buyers pay native BTC to token
//! providers and receive tokens in return.
//!
//! Providers list tokens in one of three queues. Buyers first *reserve*
//! tokens at the current quote, then pay the providers' BTC receivers in
//! a later transaction and *swap*: the engine reads the transaction
//! outputs, credits every paid leg and releases the rest. Prices come from
//! a virtual constant-product market whose reserves move with buys, sells
//! and deposits but never hold real BTC.
//!
//! # Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `serde` | no | `Serialize`/`Deserialize` for configuration structs |
//!
//! # Quick Start
//!
//! ```rust
//! use native_swap::prelude::*;
//!
//! let token = Address::from_bytes([7; 32]);
//! let creator = Address::from_bytes([1; 32]);
//! let buyer = Address::from_bytes([2; 32]);
//!
//! let mut host = MemoryHost::new();
//! host.set_block(100);
//! host.mint(&token, &creator, 1_000_000_000);
//! host.set_sender(creator);
//!
//! let config = EngineConfig::default().with_reservation_fee(0);
//! let mut swap = NativeSwap::new(MemoryStore::new(), config).expect("valid config");
//!
//! // 100 tokens per satoshi, 1e9 tokens seeded by the creator
//! let pool = PoolConfig::new(100 * u128::from(QUOTE_SCALE), 1_000_000_000, "bc1qcreator", 0, 0, 100)
//!     .expect("valid pool");
//! swap.create_pool(&mut host, &token, &pool).expect("pool created");
//!
//! // reserve 50_000 sats worth of tokens
//! host.set_sender(buyer);
//! let reserved = swap.reserve_liquidity(&mut host, &token, 50_000, 0, false).expect("reserved");
//!
//! // pay the creator's receiver in a later block, then swap
//! host.advance_blocks(1);
//! host.set_outputs(vec![TransactionOutput::new("bc1qcreator", reserved.satoshis)]);
//! let delivered = swap.swap(&mut host, &token).expect("swapped");
//! assert!(delivered > 0 && delivered <= reserved.tokens);
//! assert_eq!(host.balance(&token, &buyer), delivered);
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  NativeSwap   │  one call = load, handle, save, commit
//! └──────┬───────┘
//!        │ Call { repo, queue, env, effects }
//!        ▼
//! ┌──────────────┐
//! │ LiquidityQueue│  listings, reservations, trades, removals
//! └──────┬───────┘
//!        │ ProviderManager · VirtualPool · BlockReservations
//!        ▼
//! ┌──────────────┐
//! │  Repository   │  cached providers and reservations over a write overlay
//! └──────┬───────┘
//!        │ KeyValueStore
//!        ▼
//! ┌──────────────┐
//! │    Storage    │  32-byte words under SHA-256 derived keys
//! └──────────────┘
//! ```
//!
//! # Module Guide
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`operations`] | [`NativeSwap`](operations::NativeSwap) entry points and read-only views |
//! | [`engine`] | [`LiquidityQueue`](engine::LiquidityQueue), provider queues, virtual pool, purge lists |
//! | [`provider`] / [`reservation`] | entities and their packed storage records |
//! | [`repository`] | per-call entity cache |
//! | [`storage`] | key derivation, word codecs, in-memory and overlay stores |
//! | [`fee`] | dynamic swap fee |
//! | [`context`] | call environment and buffered side effects |
//! | [`config`] | [`EngineConfig`](config::EngineConfig), [`PoolConfig`](config::PoolConfig) |
//! | [`domain`] | addresses, ids, quotes, basis points |
//! | [`traits`] | [`KeyValueStore`](traits::KeyValueStore) and [`Host`](traits::Host) seams |
//! | [`host`] | [`MemoryHost`](host::MemoryHost) for simulation |
//! | [`events`] | [`SwapEvent`](events::SwapEvent) |
//! | [`math`] | checked arithmetic |
//! | [`error`] | [`SwapError`](error::SwapError) |
//! | [`prelude`] | convenience re-exports |

pub mod config;
pub mod context;
pub mod domain;
pub mod engine;
pub mod error;
pub mod events;
pub mod fee;
pub mod host;
pub mod math;
pub mod operations;
pub mod prelude;
pub mod provider;
pub mod repository;
pub mod reservation;
pub mod storage;
pub mod traits;
