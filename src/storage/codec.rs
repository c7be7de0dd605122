//! Word encoders and decoders.
//!
//! Scalars are stored big-endian, right-aligned in the word. Packed records
//! are built with [`WordWriter`] and read back with [`WordReader`], which
//! lay fields out left to right at fixed widths.

use primitive_types::U256;

use super::ArrayKey;
use crate::error::{Result, SwapError};
use crate::traits::{KeyValueStore, Word, ZERO_WORD};

// -- scalars ------------------------------------------------------------------

/// Encodes a `u64`.
#[must_use]
pub fn encode_u64(value: u64) -> Word {
    let mut word = ZERO_WORD;
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Decodes a `u64` written by [`encode_u64`].
#[must_use]
pub fn decode_u64(word: &Word) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[24..]);
    u64::from_be_bytes(bytes)
}

/// Encodes a `u128`.
#[must_use]
pub fn encode_u128(value: u128) -> Word {
    let mut word = ZERO_WORD;
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Decodes a `u128` written by [`encode_u128`].
#[must_use]
pub fn decode_u128(word: &Word) -> u128 {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&word[16..]);
    u128::from_be_bytes(bytes)
}

/// Encodes a [`U256`].
#[must_use]
pub fn encode_u256(value: U256) -> Word {
    let mut word = ZERO_WORD;
    value.to_big_endian(&mut word);
    word
}

/// Decodes a [`U256`].
#[must_use]
pub fn decode_u256(word: &Word) -> U256 {
    U256::from_big_endian(word)
}

// -- packed records -----------------------------------------------------------

/// Sequential writer of fixed-width fields into one word.
#[derive(Debug, Clone)]
pub struct WordWriter {
    word: Word,
    position: usize,
}

impl WordWriter {
    /// Starts an empty word.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            word: ZERO_WORD,
            position: 0,
        }
    }

    /// Appends one byte.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Invariant`] if the word is full.
    pub fn put_u8(&mut self, value: u8) -> Result<()> {
        self.put_bytes(&[value])
    }

    /// Appends a big-endian `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Invariant`] if the field does not fit the word.
    pub fn put_u32(&mut self, value: u32) -> Result<()> {
        self.put_bytes(&value.to_be_bytes())
    }

    /// Appends a big-endian `u64`.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Invariant`] if the field does not fit the word.
    pub fn put_u64(&mut self, value: u64) -> Result<()> {
        self.put_bytes(&value.to_be_bytes())
    }

    /// Appends `value` as a big-endian integer `width` bytes wide.
    ///
    /// # Errors
    ///
    /// - [`SwapError::Overflow`] if `value` needs more than `width` bytes.
    /// - [`SwapError::Invariant`] if the field does not fit the word.
    pub fn put_uint(&mut self, value: u128, width: usize) -> Result<()> {
        if width > 16 {
            return Err(SwapError::Invariant("packed field wider than 128 bits"));
        }
        let bytes = value.to_be_bytes();
        let (high, low) = bytes.split_at(16 - width);
        if high.iter().any(|b| *b != 0) {
            return Err(SwapError::Overflow("value exceeds packed field width"));
        }
        self.put_bytes(low)
    }

    /// Appends raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Invariant`] if the bytes do not fit the word.
    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let end = self.position + bytes.len();
        let target = self
            .word
            .get_mut(self.position..end)
            .ok_or(SwapError::Invariant("packed record exceeds one word"))?;
        target.copy_from_slice(bytes);
        self.position = end;
        Ok(())
    }

    /// Returns the finished word.
    #[must_use]
    pub const fn finish(self) -> Word {
        self.word
    }
}

impl Default for WordWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Sequential reader mirroring [`WordWriter`].
#[derive(Debug, Clone)]
pub struct WordReader<'w> {
    word: &'w Word,
    position: usize,
}

impl<'w> WordReader<'w> {
    /// Starts reading `word` from the first byte.
    #[must_use]
    pub const fn new(word: &'w Word) -> Self {
        Self { word, position: 0 }
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Invariant`] past the end of the word.
    pub fn u8(&mut self) -> Result<u8> {
        let [byte] = self.bytes::<1>()?;
        Ok(byte)
    }

    /// Reads a big-endian `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Invariant`] past the end of the word.
    pub fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.bytes::<4>()?))
    }

    /// Reads a big-endian `u64`.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Invariant`] past the end of the word.
    pub fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.bytes::<8>()?))
    }

    /// Reads a big-endian integer `width` bytes wide.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Invariant`] past the end of the word or for a
    /// width above 16 bytes.
    pub fn uint(&mut self, width: usize) -> Result<u128> {
        if width > 16 {
            return Err(SwapError::Invariant("packed field wider than 128 bits"));
        }
        let end = self.position + width;
        let source = self
            .word
            .get(self.position..end)
            .ok_or(SwapError::Invariant("packed record read past word end"))?;
        let mut bytes = [0u8; 16];
        bytes[16 - width..].copy_from_slice(source);
        self.position = end;
        Ok(u128::from_be_bytes(bytes))
    }

    /// Reads `N` raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::Invariant`] past the end of the word.
    pub fn bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.position + N;
        let source = self
            .word
            .get(self.position..end)
            .ok_or(SwapError::Invariant("packed record read past word end"))?;
        let mut out = [0u8; N];
        out.copy_from_slice(source);
        self.position = end;
        Ok(out)
    }
}

// -- strings ------------------------------------------------------------------

/// Loads a string stored as a byte-length word followed by 32-byte chunks.
///
/// An absent string reads as empty.
///
/// # Errors
///
/// Returns [`SwapError::Invariant`] if the stored bytes are not UTF-8.
pub fn load_string(store: &dyn KeyValueStore, key: &ArrayKey) -> Result<String> {
    let len = usize::try_from(decode_u64(&store.get(&key.len_key())))
        .map_err(|_| SwapError::Invariant("stored string length exceeds usize"))?;
    let mut bytes = Vec::with_capacity(len);
    let mut chunk_index = 0u64;
    while bytes.len() < len {
        let chunk = store.get(&key.element_key(chunk_index));
        let take = (len - bytes.len()).min(chunk.len());
        bytes.extend_from_slice(&chunk[..take]);
        chunk_index += 1;
    }
    String::from_utf8(bytes).map_err(|_| SwapError::Invariant("stored string is not UTF-8"))
}

/// Stores `value` as a byte-length word followed by 32-byte chunks.
pub fn save_string(store: &mut dyn KeyValueStore, key: &ArrayKey, value: &str) {
    store.set(key.len_key(), encode_u64(value.len() as u64));
    for (index, chunk) in value.as_bytes().chunks(32).enumerate() {
        let mut word = ZERO_WORD;
        word[..chunk.len()].copy_from_slice(chunk);
        store.set(key.element_key(index as u64), word);
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::Address;
    use crate::storage::{MemoryStore, Namespace};

    #[test]
    fn scalars() {
        assert_eq!(decode_u64(&encode_u64(u64::MAX - 3)), u64::MAX - 3);
        assert_eq!(decode_u128(&encode_u128(1 << 100)), 1 << 100);
        let big = U256::MAX - U256::from(9u8);
        assert_eq!(decode_u256(&encode_u256(big)), big);
    }

    #[test]
    fn zero_word_decodes_to_zero() {
        assert_eq!(decode_u64(&ZERO_WORD), 0);
        assert_eq!(decode_u256(&ZERO_WORD), U256::zero());
    }

    #[test]
    fn packed_fields_in_order() {
        let mut writer = WordWriter::new();
        let Ok(()) = writer.put_u8(0b101) else {
            panic!("fits");
        };
        let Ok(()) = writer.put_u64(77) else {
            panic!("fits");
        };
        let Ok(()) = writer.put_uint(1 << 100, 15) else {
            panic!("fits");
        };
        let word = writer.finish();
        assert_eq!(word[0], 0b101);

        let mut reader = WordReader::new(&word);
        assert_eq!(reader.u8().ok(), Some(0b101));
        assert_eq!(reader.u64().ok(), Some(77));
        assert_eq!(reader.uint(15).ok(), Some(1 << 100));
    }

    #[test]
    fn narrow_field_overflow() {
        let mut writer = WordWriter::new();
        assert!(matches!(
            writer.put_uint(u128::MAX, 15),
            Err(SwapError::Overflow(_))
        ));
    }

    #[test]
    fn writing_past_word_end_fails() {
        let mut writer = WordWriter::new();
        let Ok(()) = writer.put_bytes(&[1u8; 30]) else {
            panic!("fits");
        };
        assert!(matches!(writer.put_u32(1), Err(SwapError::Invariant(_))));
    }

    #[test]
    fn strings_span_chunks() {
        let mut store = MemoryStore::new();
        let key = ArrayKey::new(Namespace::ProviderReceiver, &Address::zero(), b"r");
        let long = "bc1q".repeat(20);
        save_string(&mut store, &key, &long);
        let Ok(loaded) = load_string(&store, &key) else {
            panic!("expected Ok");
        };
        assert_eq!(loaded, long);
    }

    #[test]
    fn absent_string_is_empty() {
        let store = MemoryStore::new();
        let key = ArrayKey::new(Namespace::ProviderReceiver, &Address::zero(), b"r");
        assert_eq!(load_string(&store, &key).ok(), Some(String::new()));
    }
}
