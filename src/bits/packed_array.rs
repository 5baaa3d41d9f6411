//! Dense sequence of non-negative integers stored in `w` bits each.

use std::io::{Read, Write};

use crate::error::Result;
use crate::format;

const WORD_BITS: usize = 64;

/// Bit-packed integer array with automatic widening.
///
/// The element width starts at the fewest bits that represent the declared
/// maximum value and grows when a stored value exceeds it; widening re-encodes
/// every element at the larger width.  That full rewrite is acceptable because
/// the width can only grow `log2(max)` times over the array's lifetime, and
/// the compression pass that triggers it does so at most a handful of times.
///
/// Values straddle word boundaries, so a read touches at most two words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedIntArray {
    words: Vec<u64>,
    size: usize,
    bits: u32,
    max_value: u64,
}

#[inline]
fn bits_for(max_value: u64) -> u32 {
    std::cmp::max(1, 64 - max_value.leading_zeros())
}

#[inline]
fn mask_for(bits: u32) -> u64 {
    u64::MAX >> (64 - bits)
}

impl PackedIntArray {
    /// Create an empty array sized for `capacity` elements no larger than
    /// `max_value`.
    pub fn new(capacity: usize, max_value: u64) -> Self {
        let bits = bits_for(max_value);
        PackedIntArray {
            words: vec![0; (capacity * bits as usize).div_ceil(WORD_BITS)],
            size: 0,
            bits,
            max_value: mask_for(bits),
        }
    }

    /// Create an array of `size` zeroes sized for values up to `max_value`.
    pub fn filled(size: usize, max_value: u64) -> Self {
        let mut array = Self::new(size, max_value);
        array.size = size;
        array
    }

    /// Number of stored elements.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Current element width in bits.
    #[inline]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Largest value representable without widening.
    #[inline]
    pub fn max_value(&self) -> u64 {
        self.max_value
    }

    /// Read element `index`.
    ///
    /// # Panics
    /// If `index >= size()`.
    #[inline]
    pub fn get(&self, index: usize) -> u64 {
        assert!(
            index < self.size,
            "index {index} out of range for packed array of size {}",
            self.size
        );
        let bit = index * self.bits as usize;
        let word = bit / WORD_BITS;
        let offset = bit % WORD_BITS;
        let mut value = self.words[word] >> offset;
        if offset + self.bits as usize > WORD_BITS {
            value |= self.words[word + 1] << (WORD_BITS - offset);
        }
        value & self.max_value
    }

    /// Overwrite element `index`, widening the whole array first when `value`
    /// does not fit the current width.
    ///
    /// # Panics
    /// If `index >= size()`.
    pub fn set(&mut self, index: usize, value: u64) {
        assert!(
            index < self.size,
            "index {index} out of range for packed array of size {}",
            self.size
        );
        if value > self.max_value {
            self.widen(bits_for(value));
        }
        self.raw_set(index, value);
    }

    /// Append `value`, growing the backing geometrically.
    pub fn add(&mut self, value: u64) {
        if value > self.max_value {
            self.widen(bits_for(value));
        }
        let needed = ((self.size + 1) * self.bits as usize).div_ceil(WORD_BITS);
        if needed > self.words.len() {
            let grown = std::cmp::max(needed, self.words.len() * 2);
            self.words.resize(grown, 0);
        }
        self.size += 1;
        self.raw_set(self.size - 1, value);
    }

    #[inline]
    fn raw_set(&mut self, index: usize, value: u64) {
        let bit = index * self.bits as usize;
        let word = bit / WORD_BITS;
        let offset = bit % WORD_BITS;
        self.words[word] &= !(self.max_value << offset);
        self.words[word] |= value << offset;
        if offset + self.bits as usize > WORD_BITS {
            let spill = WORD_BITS - offset;
            self.words[word + 1] &= !(self.max_value >> spill);
            self.words[word + 1] |= value >> spill;
        }
    }

    /// Re-encode every element at `new_bits` per element.  O(n·w).
    fn widen(&mut self, new_bits: u32) {
        debug_assert!(new_bits > self.bits);
        let mut widened = PackedIntArray {
            words: vec![0; (self.size * new_bits as usize).div_ceil(WORD_BITS)],
            size: self.size,
            bits: new_bits,
            max_value: mask_for(new_bits),
        };
        for i in 0..self.size {
            widened.raw_set(i, self.get(i));
        }
        *self = widened;
    }

    /// Truncate the backing to the minimum word count for `size * bits` bits.
    pub fn compact(&mut self) {
        self.words
            .truncate((self.size * self.bits as usize).div_ceil(WORD_BITS));
        self.words.shrink_to_fit();
    }

    /// Approximate heap footprint in bytes.
    pub fn allocation_size(&self) -> usize {
        self.words.capacity() * std::mem::size_of::<u64>() + std::mem::size_of::<Self>()
    }

    /// Serialize as version byte, element width, max value, size, word count,
    /// then the raw backing words.
    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        let used = (self.size * self.bits as usize).div_ceil(WORD_BITS);
        format::write_u8(out, format::PACKED_ARRAY_VERSION)?;
        format::write_u8(out, self.bits as u8)?;
        format::write_u64(out, self.max_value)?;
        format::write_int(out, self.size as i32)?;
        format::write_int(out, used as i32)?;
        for &word in &self.words[..used] {
            format::write_u64(out, word)?;
        }
        Ok(())
    }

    /// Inverse of [`PackedIntArray::write`].
    pub fn read<R: Read>(input: &mut R) -> Result<Self> {
        format::check_version(input, format::PACKED_ARRAY_VERSION)?;
        let bits = u32::from(format::read_u8(input)?);
        let max_value = format::read_u64(input)?;
        let size = format::read_len(input)?;
        let n = format::read_len(input)?;
        let mut words = Vec::with_capacity(n);
        for _ in 0..n {
            words.push(format::read_u64(input)?);
        }
        Ok(PackedIntArray {
            words,
            size,
            bits,
            max_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_starts_at_log2_of_max() {
        assert_eq!(PackedIntArray::new(8, 0).bits(), 1);
        assert_eq!(PackedIntArray::new(8, 1).bits(), 1);
        assert_eq!(PackedIntArray::new(8, 2).bits(), 2);
        assert_eq!(PackedIntArray::new(8, 255).bits(), 8);
        assert_eq!(PackedIntArray::new(8, 256).bits(), 9);
    }

    #[test]
    fn add_get_roundtrip_across_word_boundaries() {
        let mut array = PackedIntArray::new(4, 1000);
        for i in 0..100u64 {
            array.add(i * 9 % 1001);
        }
        for i in 0..100u64 {
            assert_eq!(array.get(i as usize), i * 9 % 1001, "element {i}");
        }
    }

    #[test]
    fn widening_preserves_earlier_values() {
        let mut array = PackedIntArray::new(0, 7);
        for i in 0..50 {
            array.add(i % 8);
        }
        // Forces 3 -> 20 bits in one step.
        array.set(10, 1_000_000);
        assert_eq!(array.get(10), 1_000_000);
        for i in 0..50usize {
            if i != 10 {
                assert_eq!(array.get(i), (i % 8) as u64, "element {i}");
            }
        }
    }

    #[test]
    fn values_up_to_63_bits() {
        let big = (1u64 << 63) - 1;
        let mut array = PackedIntArray::new(2, big);
        array.add(big);
        array.add(12345);
        assert_eq!(array.get(0), big);
        assert_eq!(array.get(1), 12345);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn get_past_size_panics() {
        let array = PackedIntArray::filled(3, 10);
        array.get(3);
    }

    #[test]
    fn compact_then_read_back() {
        let mut array = PackedIntArray::new(1000, 300);
        for i in 0..17u64 {
            array.add(i * 17);
        }
        array.compact();
        for i in 0..17u64 {
            assert_eq!(array.get(i as usize), i * 17);
        }
    }

    #[test]
    fn serialization_roundtrip() {
        let mut array = PackedIntArray::new(0, 100_000);
        for i in 0..200u64 {
            array.add(i * 499);
        }
        let mut buf = Vec::new();
        array.write(&mut buf).unwrap();
        let back = PackedIntArray::read(&mut buf.as_slice()).unwrap();
        assert_eq!(back.size(), array.size());
        assert_eq!(back.bits(), array.bits());
        for i in 0..array.size() {
            assert_eq!(back.get(i), array.get(i), "element {i}");
        }
    }
}
