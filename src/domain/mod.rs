//! Fundamental domain value types used throughout the engine.
//!
//! Addresses, derived identifiers, queue slots, quotes and basis points.
//! All types are small `Copy` newtypes with validated constructors.

mod address;
mod basis_points;
mod ids;
mod quote;
mod rounding;
mod slot;

pub use address::{is_valid_receiver, Address, MAX_RECEIVER_LEN};
pub use basis_points::BasisPoints;
pub use ids::{ProviderId, ReservationId};
pub use quote::{Quote, QUOTE_SCALE};
pub use rounding::Rounding;
pub use slot::{ProviderSlot, QueueKind};
