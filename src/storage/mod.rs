//! Word storage: keys, encoders, the in-memory store and the per-call
//! write overlay.

mod codec;
mod key;
mod memory;
mod transaction;

pub use codec::{
    decode_u128, decode_u256, decode_u64, encode_u128, encode_u256, encode_u64, load_string,
    save_string, WordReader, WordWriter,
};
pub use key::{ArrayKey, Namespace, StorageKey};
pub use memory::MemoryStore;
pub use transaction::{apply_writes, StorageTransaction};
