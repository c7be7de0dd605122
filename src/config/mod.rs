//! Validated configuration structs.
//!
//! [`EngineConfig`] holds the engine-wide constants, [`PoolConfig`] the
//! parameters of a single pool and [`DynamicFeeConfig`] the swap fee curve.
//! With the `serde` feature all three can be loaded from JSON or TOML.

mod engine;
mod fee;
mod pool;

pub use engine::EngineConfig;
pub use fee::DynamicFeeConfig;
pub use pool::PoolConfig;
