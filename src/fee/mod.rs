//! Swap fee computation.

mod dynamic_fee;

pub use dynamic_fee::DynamicFee;
