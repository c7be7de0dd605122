//! The settlement engine.
//!
//! | Component | Role |
//! |-----------|------|
//! | [`ProviderQueue`] | one append-only queue of provider ids with a persisted watermark |
//! | [`ProviderManager`] | schedules providers across the removal, priority and normal queues |
//! | [`VirtualPool`] | virtual constant-product reserves and their pending deltas |
//! | [`BlockReservations`] | per-block reservation lists driving expiry purges |
//! | [`LiquidityQueue`] | per-token market state and every mutating operation |
//! | [`CompletedTrade`] | result of settling a reservation against BTC outputs |

mod block_reservations;
mod liquidity_queue;
mod provider_manager;
mod provider_queue;
pub mod quote_history;
mod trade;
mod virtual_pool;

#[cfg(test)]
mod proptest_properties;

pub use block_reservations::{BlockEntry, BlockReservations};
pub use liquidity_queue::{LiquidityQueue, ReservedLiquidity};
pub use provider_manager::{ProviderManager, ScheduledProvider};
pub use provider_queue::ProviderQueue;
pub use trade::CompletedTrade;
pub use virtual_pool::VirtualPool;
