//! Mutable unit array over parallel primitive arrays.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::error::Result;
use crate::format;
use crate::unit::{read_header, write_header, Unit, ValueMapping};

/// The construction-time representation: one primitive array per unit field.
///
/// Every accessor is O(1) with no indirection, which is what the builder and
/// the compressor hammer on; the price is memory, paid only while the tree is
/// being built or rewritten.
#[derive(Debug, Clone, Default)]
pub struct FastUnitArray {
    value_code: Vec<u32>,
    distance: Vec<u32>,
    data_code: Vec<u32>,
    word_end: Vec<bool>,
    word_continued: Vec<bool>,
    value_mapping: Option<Arc<ValueMapping>>,
}

impl FastUnitArray {
    pub fn new(capacity: usize) -> Self {
        FastUnitArray {
            value_code: Vec::with_capacity(capacity),
            distance: Vec::with_capacity(capacity),
            data_code: Vec::with_capacity(capacity),
            word_end: Vec::with_capacity(capacity),
            word_continued: Vec::with_capacity(capacity),
            value_mapping: None,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.value_code.len()
    }

    #[inline]
    fn check(&self, index: usize) {
        assert!(
            index < self.size(),
            "index {index} out of range for unit array of size {}",
            self.size()
        );
    }

    // ── Field accessors ───────────────────────────────────────────────────────

    #[inline]
    pub fn value_code(&self, index: usize) -> u32 {
        self.check(index);
        self.value_code[index]
    }

    #[inline]
    pub fn distance(&self, index: usize) -> u32 {
        self.check(index);
        self.distance[index]
    }

    #[inline]
    pub fn data_code(&self, index: usize) -> u32 {
        self.check(index);
        self.data_code[index]
    }

    #[inline]
    pub fn is_word_end(&self, index: usize) -> bool {
        self.check(index);
        self.word_end[index]
    }

    #[inline]
    pub fn is_word_continued(&self, index: usize) -> bool {
        self.check(index);
        self.word_continued[index]
    }

    /// Both flags clear — an absolute pointer or a null slot.
    #[inline]
    pub fn is_absolute_pointer(&self, index: usize) -> bool {
        self.check(index);
        !self.word_end[index] && !self.word_continued[index]
    }

    /// Null sentinel: flags clear and the distance equal to the own index.
    #[inline]
    pub fn is_null(&self, index: usize) -> bool {
        self.is_absolute_pointer(index) && self.distance[index] == index as u32
    }

    /// The mapped symbol on this unit's edge, `None` for the root code.
    pub fn value(&self, index: usize) -> Option<i32> {
        let code = self.value_code(index);
        self.value_mapping.as_ref().and_then(|m| m.value(code))
    }

    /// The whole unit, or `None` when the slot is null.
    pub fn get(&self, index: usize) -> Option<Unit> {
        if self.is_null(index) {
            return None;
        }
        Some(self.unit_at(index))
    }

    /// The raw unit, nulls included.
    #[inline]
    pub fn unit_at(&self, index: usize) -> Unit {
        self.check(index);
        Unit {
            value_code: self.value_code[index],
            distance: self.distance[index],
            data_code: self.data_code[index],
            word_end: self.word_end[index],
            word_continued: self.word_continued[index],
        }
    }

    // ── Mutators ──────────────────────────────────────────────────────────────

    pub fn add(&mut self, unit: Unit) {
        self.value_code.push(unit.value_code);
        self.distance.push(unit.distance);
        self.data_code.push(unit.data_code);
        self.word_end.push(unit.word_end);
        self.word_continued.push(unit.word_continued);
    }

    pub fn set(&mut self, index: usize, unit: Unit) {
        self.check(index);
        self.value_code[index] = unit.value_code;
        self.distance[index] = unit.distance;
        self.data_code[index] = unit.data_code;
        self.word_end[index] = unit.word_end;
        self.word_continued[index] = unit.word_continued;
    }

    /// Turn the slot into the null sentinel.
    pub fn set_null(&mut self, index: usize) {
        self.set(index, Unit::null(index as u32));
    }

    #[inline]
    pub fn set_distance(&mut self, index: usize, distance: u32) {
        self.check(index);
        self.distance[index] = distance;
    }

    /// Append every unit of `other`, fields verbatim.
    ///
    /// Absolute pointers keep their old targets; call
    /// [`FastUnitArray::move_absolute_pointers`] on the appended range when the
    /// combined array must stay self-consistent.
    pub fn add_all(&mut self, other: &FastUnitArray) {
        for i in 0..other.size() {
            self.add(other.unit_at(i));
        }
    }

    /// Copy `[start, end)` into a fresh array sharing this one's mapping.
    pub fn sub_array(&self, start: usize, end: usize) -> FastUnitArray {
        assert!(start <= end && end <= self.size());
        let mut sub = FastUnitArray::new(end - start);
        for i in start..end {
            sub.add(self.unit_at(i));
        }
        sub.value_mapping = self.value_mapping.clone();
        sub
    }

    /// Shift every absolute pointer's target by `offset`.  Null slots keep
    /// their self-referencing distance.
    pub fn move_absolute_pointers(&mut self, offset: i64) {
        for i in 0..self.size() {
            if self.is_absolute_pointer(i) && !self.is_null(i) {
                let target = i64::from(self.distance[i]) + offset;
                debug_assert!(target >= 0, "pointer target moved below zero");
                self.distance[i] = target as u32;
            }
        }
    }

    // ── Comparison ────────────────────────────────────────────────────────────

    #[inline]
    pub fn equal_units(&self, a: usize, b: usize) -> bool {
        self.unit_at(a) == self.unit_at(b)
    }

    #[inline]
    pub fn compare_units(&self, a: usize, b: usize) -> std::cmp::Ordering {
        self.unit_at(a).compare(&self.unit_at(b))
    }

    // ── Value mapping ─────────────────────────────────────────────────────────

    pub fn value_mapping(&self) -> Option<&Arc<ValueMapping>> {
        self.value_mapping.as_ref()
    }

    pub fn set_value_mapping(&mut self, mapping: Arc<ValueMapping>) {
        self.value_mapping = Some(mapping);
    }

    pub fn map_to_value_code(&self, symbol: i32) -> Option<u32> {
        self.value_mapping.as_ref().and_then(|m| m.code(symbol))
    }

    // ── Storage management ────────────────────────────────────────────────────

    pub fn trim_to_size(&mut self) {
        self.value_code.shrink_to_fit();
        self.distance.shrink_to_fit();
        self.data_code.shrink_to_fit();
        self.word_end.shrink_to_fit();
        self.word_continued.shrink_to_fit();
    }

    /// Release all backing storage.  The array is empty afterwards.
    pub fn dispose(&mut self) {
        *self = FastUnitArray::default();
    }

    pub fn allocation_size(&self) -> usize {
        self.value_code.capacity() * 4
            + self.distance.capacity() * 4
            + self.data_code.capacity() * 4
            + self.word_end.capacity()
            + self.word_continued.capacity()
            + self
                .value_mapping
                .as_ref()
                .map_or(0, |m| m.allocation_size())
            + std::mem::size_of::<Self>()
    }

    // ── Serialization ─────────────────────────────────────────────────────────

    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        write_header(out, self.size(), self.value_mapping.as_deref())?;
        format::write_u8(out, format::FAST_ARRAY_VERSION)?;
        format::write_int(out, self.size() as i32)?;
        for i in 0..self.size() {
            format::write_bool(out, self.word_continued[i])?;
            format::write_bool(out, self.word_end[i])?;
            format::write_int(out, self.distance[i] as i32)?;
            format::write_int(out, self.value_code[i] as i32)?;
            format::write_int(out, self.data_code[i] as i32)?;
        }
        Ok(())
    }

    pub fn read<R: Read>(input: &mut R) -> Result<Self> {
        let (_header_size, mapping) = read_header(input)?;
        format::check_version(input, format::FAST_ARRAY_VERSION)?;
        let size = format::read_len(input)?;
        let mut array = FastUnitArray::new(size);
        for _ in 0..size {
            let word_continued = format::read_bool(input)?;
            let word_end = format::read_bool(input)?;
            let distance = format::read_len(input)? as u32;
            let value_code = format::read_len(input)? as u32;
            let data_code = format::read_len(input)? as u32;
            array.add(Unit {
                value_code,
                distance,
                data_code,
                word_end,
                word_continued,
            });
        }
        array.value_mapping = mapping.map(Arc::new);
        Ok(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FastUnitArray {
        let mut array = FastUnitArray::new(4);
        array.add(Unit::node(0, 0, false, true, 0));
        array.add(Unit::node(1, 2, true, false, 5));
        array.add(Unit::absolute_pointer(0, 2));
        array.add(Unit::node(2, 0, true, false, 6));
        array
    }

    #[test]
    fn null_slot_detection() {
        let mut array = sample();
        // A pointer whose target differs from its own index is not null.
        assert!(!array.is_null(2));
        array.set_null(2);
        assert!(array.is_null(2));
        assert!(array.get(2).is_none());
        assert!(!array.is_null(1));
    }

    #[test]
    fn sub_array_shares_mapping() {
        let mut array = sample();
        let mut mapping = ValueMapping::new();
        mapping.map_or_add(97);
        array.set_value_mapping(Arc::new(mapping));
        let sub = array.sub_array(1, 3);
        assert_eq!(sub.size(), 2);
        assert_eq!(sub.unit_at(0), array.unit_at(1));
        assert!(Arc::ptr_eq(
            sub.value_mapping().unwrap(),
            array.value_mapping().unwrap()
        ));
    }

    #[test]
    fn move_absolute_pointers_skips_nulls() {
        let mut array = sample();
        array.set_null(3);
        array.move_absolute_pointers(10);
        assert_eq!(array.distance(2), 10);
        assert_eq!(array.distance(3), 3);
        assert_eq!(array.distance(1), 2);
    }

    #[test]
    fn serialization_roundtrip() {
        let mut array = sample();
        let mut mapping = ValueMapping::new();
        mapping.map_or_add(120);
        mapping.map_or_add(121);
        array.set_value_mapping(Arc::new(mapping));

        let mut buf = Vec::new();
        array.write(&mut buf).unwrap();
        let back = FastUnitArray::read(&mut buf.as_slice()).unwrap();
        assert_eq!(back.size(), array.size());
        for i in 0..array.size() {
            assert_eq!(back.unit_at(i), array.unit_at(i), "unit {i}");
        }
        assert_eq!(
            back.value_mapping().unwrap().values(),
            array.value_mapping().unwrap().values()
        );
    }
}
