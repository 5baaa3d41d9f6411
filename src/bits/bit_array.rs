//! Dense sequence of booleans backed by 64-bit words.

use std::io::{Read, Write};

use crate::error::Result;
use crate::format;

const WORD_BITS: usize = 64;

/// Growable bit vector with word-granular storage.
///
/// `set` beyond the current size grows the array (doubling the backing when
/// the index crosses the allocated word count); `get` beyond the current size
/// is a caller bug and panics.  Not synchronized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitArray {
    words: Vec<u64>,
    size: usize,
}

impl BitArray {
    /// Create an empty array with room for `capacity` bits.
    pub fn new(capacity: usize) -> Self {
        BitArray {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            size: 0,
        }
    }

    /// Create an array of `size` bits, all `false`.
    pub fn filled(size: usize) -> Self {
        BitArray {
            words: vec![0; size.div_ceil(WORD_BITS)],
            size,
        }
    }

    /// Number of addressable bits.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Read bit `index`.
    ///
    /// # Panics
    /// If `index >= size()`.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        assert!(
            index < self.size,
            "index {index} out of range for bit array of size {}",
            self.size
        );
        (self.words[index / WORD_BITS] >> (index % WORD_BITS)) & 1 != 0
    }

    /// Write bit `index`, growing the array when `index >= size()`.
    pub fn set(&mut self, index: usize, value: bool) {
        let word = index / WORD_BITS;
        if word >= self.words.len() {
            let grown = std::cmp::max(word + 1, self.words.len() * 2);
            self.words.resize(grown, 0);
        }
        if index >= self.size {
            self.size = index + 1;
        }
        let mask = 1u64 << (index % WORD_BITS);
        if value {
            self.words[word] |= mask;
        } else {
            self.words[word] &= !mask;
        }
    }

    /// Shrink the backing to the minimum word count for the current size.
    pub fn compact(&mut self) {
        self.words.truncate(self.size.div_ceil(WORD_BITS));
        self.words.shrink_to_fit();
    }

    /// Approximate heap footprint in bytes.
    pub fn allocation_size(&self) -> usize {
        self.words.capacity() * std::mem::size_of::<u64>() + std::mem::size_of::<Self>()
    }

    /// Serialize as `size`, word count, then the raw backing words.
    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        let used = self.size.div_ceil(WORD_BITS);
        format::write_int(out, self.size as i32)?;
        format::write_int(out, used as i32)?;
        for &word in &self.words[..used] {
            format::write_u64(out, word)?;
        }
        Ok(())
    }

    /// Inverse of [`BitArray::write`].
    pub fn read<R: Read>(input: &mut R) -> Result<Self> {
        let size = format::read_len(input)?;
        let n = format::read_len(input)?;
        let mut words = Vec::with_capacity(n);
        for _ in 0..n {
            words.push(format::read_u64(input)?);
        }
        Ok(BitArray { words, size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_roundtrip() {
        let mut bits = BitArray::new(10);
        bits.set(0, true);
        bits.set(63, true);
        bits.set(64, true);
        bits.set(65, false);
        assert!(bits.get(0));
        assert!(bits.get(63));
        assert!(bits.get(64));
        assert!(!bits.get(65));
        assert!(!bits.get(1));
        assert_eq!(bits.size(), 66);
    }

    #[test]
    fn flip_restores_original() {
        let mut bits = BitArray::filled(128);
        bits.set(77, true);
        bits.set(77, false);
        bits.set(77, true);
        assert!(bits.get(77));
        assert!(!bits.get(76));
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut bits = BitArray::new(1);
        bits.set(1000, true);
        assert!(bits.get(1000));
        assert_eq!(bits.size(), 1001);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn get_past_size_panics() {
        let bits = BitArray::filled(8);
        bits.get(8);
    }

    #[test]
    fn compact_keeps_contents() {
        let mut bits = BitArray::new(4096);
        bits.set(3, true);
        bits.set(130, true);
        bits.compact();
        assert!(bits.get(3));
        assert!(bits.get(130));
    }

    #[test]
    fn serialization_roundtrip() {
        let mut bits = BitArray::new(0);
        for i in (0..300).step_by(7) {
            bits.set(i, true);
        }
        let mut buf = Vec::new();
        bits.write(&mut buf).unwrap();
        let back = BitArray::read(&mut buf.as_slice()).unwrap();
        assert_eq!(back.size(), bits.size());
        for i in 0..bits.size() {
            assert_eq!(back.get(i), bits.get(i), "bit {i}");
        }
    }
}
