//! Convenience re-exports for common types and traits.
//!
//! ```rust
//! use native_swap::prelude::*;
//! ```

pub use crate::config::{DynamicFeeConfig, EngineConfig, PoolConfig};
pub use crate::domain::{Address, BasisPoints, ProviderId, Quote, ReservationId, QUOTE_SCALE};
pub use crate::engine::{CompletedTrade, ReservedLiquidity};
pub use crate::error::{Result, SwapError};
pub use crate::events::SwapEvent;
pub use crate::host::MemoryHost;
pub use crate::operations::{NativeSwap, PoolView, ProviderDetails, RemovedLiquidity, ReservationDetails};
pub use crate::storage::MemoryStore;
pub use crate::traits::{Host, KeyValueStore, TransactionOutput};
