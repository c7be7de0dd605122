//! Seams to the hosting ledger.
//!
//! [`KeyValueStore`] is the persistent word store and [`Host`] exposes
//! transaction introspection, token transfers and event emission. Both are
//! implemented in-crate by [`MemoryStore`](crate::storage::MemoryStore) and
//! [`MemoryHost`](crate::host::MemoryHost) for simulation and tests.

mod host;
mod store;

pub use host::{Host, TransactionOutput};
pub use store::{KeyValueStore, Word, ZERO_WORD};
