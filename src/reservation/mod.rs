//! Buyer reservations and their packed storage layout.

mod model;
mod record;

pub use model::Reservation;
pub use record::{PackedReservation, ReservationLeg};
