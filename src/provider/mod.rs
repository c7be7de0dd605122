//! Token providers and their packed storage layout.

mod model;
mod record;

pub use model::Provider;
pub use record::{decode_slot, encode_slot, PackedProvider};
