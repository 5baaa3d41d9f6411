//! Bit-packed unit array with optional unit deduplication.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;

use crate::bits::{BitArray, PackedIntArray};
use crate::error::{Error, Result};
use crate::format;
use crate::unit::{read_header, write_header, Unit, ValueMapping};

/// The query-time representation: flags in bit arrays, numeric fields in
/// packed-int arrays, and — after [`CompactUnitArray::compact`] — an `items`
/// redirect table so that identical units share one physical slot.
///
/// The logical-to-physical ratio after dedup is commonly 5–10×, which on top
/// of the bit packing is where the headline memory reduction comes from.
/// Once compacted the array is read-only; mutation fails with
/// [`Error::InvalidMutation`].
#[derive(Debug, Clone, Default)]
pub struct CompactUnitArray {
    word_continued: BitArray,
    word_end: BitArray,
    distance: PackedIntArray,
    value_code: PackedIntArray,
    data_code: PackedIntArray,
    /// Logical index → physical slot.  Present only after `compact()`.
    items: Option<PackedIntArray>,
    size: usize,
    value_mapping: Option<Arc<ValueMapping>>,
}

impl CompactUnitArray {
    /// An empty array sized for `capacity` units with the given field maxima.
    pub fn new(capacity: usize, max_distance: u64, max_value_code: u64, max_data_code: u64) -> Self {
        CompactUnitArray {
            word_continued: BitArray::new(capacity),
            word_end: BitArray::new(capacity),
            distance: PackedIntArray::new(capacity, max_distance),
            value_code: PackedIntArray::new(capacity, max_value_code),
            data_code: PackedIntArray::new(capacity, max_data_code),
            items: None,
            size: 0,
            value_mapping: None,
        }
    }

    /// Convert a fast array, sharing its value mapping.
    pub fn from_fast(fast: &super::FastUnitArray) -> Self {
        let n = fast.size();
        let mut max_distance = 1u64;
        let mut max_value_code = 1u64;
        let mut max_data_code = 1u64;
        for i in 0..n {
            max_distance = max_distance.max(u64::from(fast.distance(i)));
            max_value_code = max_value_code.max(u64::from(fast.value_code(i)));
            max_data_code = max_data_code.max(u64::from(fast.data_code(i)));
        }
        let mut array = CompactUnitArray::new(n, max_distance, max_value_code, max_data_code);
        for i in 0..n {
            array
                .add(fast.unit_at(i))
                .expect("fresh compact array is mutable");
        }
        if let Some(mapping) = fast.value_mapping() {
            array.value_mapping = Some(Arc::clone(mapping));
        }
        array
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether `compact()` has already deduplicated and frozen this array.
    #[inline]
    pub fn is_compact(&self) -> bool {
        self.items.is_some()
    }

    #[inline]
    fn check(&self, index: usize) {
        assert!(
            index < self.size,
            "index {index} out of range for unit array of size {}",
            self.size
        );
    }

    // ── Physical redirect ─────────────────────────────────────────────────────

    /// Physical slot of logical `index` — identity until dedup, one packed
    /// lookup afterwards.  This is the only branch on the query path.
    #[inline]
    pub fn fast_index(&self, index: usize) -> usize {
        self.check(index);
        match &self.items {
            Some(items) => items.get(index) as usize,
            None => index,
        }
    }

    // ── Logical accessors ─────────────────────────────────────────────────────

    #[inline]
    pub fn value_code(&self, index: usize) -> u32 {
        self.value_code.get(self.fast_index(index)) as u32
    }

    #[inline]
    pub fn distance(&self, index: usize) -> u32 {
        self.distance.get(self.fast_index(index)) as u32
    }

    #[inline]
    pub fn data_code(&self, index: usize) -> u32 {
        self.data_code.get(self.fast_index(index)) as u32
    }

    #[inline]
    pub fn is_word_end(&self, index: usize) -> bool {
        self.word_end.get(self.fast_index(index))
    }

    #[inline]
    pub fn is_word_continued(&self, index: usize) -> bool {
        self.word_continued.get(self.fast_index(index))
    }

    #[inline]
    pub fn is_absolute_pointer(&self, index: usize) -> bool {
        let physical = self.fast_index(index);
        !self.word_end.get(physical) && !self.word_continued.get(physical)
    }

    #[inline]
    pub fn is_null(&self, index: usize) -> bool {
        let physical = self.fast_index(index);
        !self.word_end.get(physical)
            && !self.word_continued.get(physical)
            && self.distance.get(physical) == index as u64
    }

    // ── Physical accessors for hot loops ──────────────────────────────────────

    #[inline]
    pub fn value_code_fast(&self, physical: usize) -> u32 {
        self.value_code.get(physical) as u32
    }

    #[inline]
    pub fn distance_fast(&self, physical: usize) -> u32 {
        self.distance.get(physical) as u32
    }

    #[inline]
    pub fn data_code_fast(&self, physical: usize) -> u32 {
        self.data_code.get(physical) as u32
    }

    #[inline]
    pub fn is_word_end_fast(&self, physical: usize) -> bool {
        self.word_end.get(physical)
    }

    #[inline]
    pub fn is_word_continued_fast(&self, physical: usize) -> bool {
        self.word_continued.get(physical)
    }

    /// The raw unit at logical `index`, nulls included.
    pub fn unit_at(&self, index: usize) -> Unit {
        let physical = self.fast_index(index);
        Unit {
            value_code: self.value_code.get(physical) as u32,
            distance: self.distance.get(physical) as u32,
            data_code: self.data_code.get(physical) as u32,
            word_end: self.word_end.get(physical),
            word_continued: self.word_continued.get(physical),
        }
    }

    /// The unit at `index`, or `None` when the slot is null.
    pub fn get(&self, index: usize) -> Option<Unit> {
        if self.is_null(index) {
            return None;
        }
        Some(self.unit_at(index))
    }

    pub fn value(&self, index: usize) -> Option<i32> {
        let code = self.value_code(index);
        self.value_mapping.as_ref().and_then(|m| m.value(code))
    }

    #[inline]
    pub fn equal_units(&self, a: usize, b: usize) -> bool {
        let pa = self.fast_index(a);
        let pb = self.fast_index(b);
        pa == pb || self.unit_at(a) == self.unit_at(b)
    }

    #[inline]
    pub fn compare_units(&self, a: usize, b: usize) -> std::cmp::Ordering {
        self.unit_at(a).compare(&self.unit_at(b))
    }

    // ── Mutators (rejected once compacted) ────────────────────────────────────

    pub fn add(&mut self, unit: Unit) -> Result<()> {
        if self.is_compact() {
            return Err(Error::InvalidMutation);
        }
        let index = self.size;
        self.word_continued.set(index, unit.word_continued);
        self.word_end.set(index, unit.word_end);
        self.distance.add(u64::from(unit.distance));
        self.value_code.add(u64::from(unit.value_code));
        self.data_code.add(u64::from(unit.data_code));
        self.size += 1;
        Ok(())
    }

    pub fn set(&mut self, index: usize, unit: Unit) -> Result<()> {
        if self.is_compact() {
            return Err(Error::InvalidMutation);
        }
        self.check(index);
        self.word_continued.set(index, unit.word_continued);
        self.word_end.set(index, unit.word_end);
        self.distance.set(index, u64::from(unit.distance));
        self.value_code.set(index, u64::from(unit.value_code));
        self.data_code.set(index, u64::from(unit.data_code));
        Ok(())
    }

    /// Shift every absolute pointer's target by `offset`.
    pub fn move_absolute_pointers(&mut self, offset: i64) -> Result<()> {
        if self.is_compact() {
            return Err(Error::InvalidMutation);
        }
        for i in 0..self.size {
            if self.is_absolute_pointer(i) && !self.is_null(i) {
                let target = i64::from(self.distance(i)) + offset;
                debug_assert!(target >= 0, "pointer target moved below zero");
                self.distance.set(i, target as u64);
            }
        }
        Ok(())
    }

    // ── Dedup ─────────────────────────────────────────────────────────────────

    /// Deduplicate identical units behind the `items` redirect table and
    /// freeze the array.  A second call is a no-op.
    pub fn compact(&mut self) {
        if self.is_compact() {
            return;
        }
        let mut slot_of: HashMap<Unit, u32> = HashMap::new();
        let mut distinct: Vec<Unit> = Vec::new();
        let mut redirects: Vec<u32> = Vec::with_capacity(self.size);
        for i in 0..self.size {
            let unit = self.unit_at(i);
            let slot = *slot_of.entry(unit).or_insert_with(|| {
                distinct.push(unit);
                (distinct.len() - 1) as u32
            });
            redirects.push(slot);
        }

        let mut max_distance = 1u64;
        let mut max_value_code = 1u64;
        let mut max_data_code = 1u64;
        for unit in &distinct {
            max_distance = max_distance.max(u64::from(unit.distance));
            max_value_code = max_value_code.max(u64::from(unit.value_code));
            max_data_code = max_data_code.max(u64::from(unit.data_code));
        }

        let mut word_continued = BitArray::filled(distinct.len());
        let mut word_end = BitArray::filled(distinct.len());
        let mut distance = PackedIntArray::new(distinct.len(), max_distance);
        let mut value_code = PackedIntArray::new(distinct.len(), max_value_code);
        let mut data_code = PackedIntArray::new(distinct.len(), max_data_code);
        for (slot, unit) in distinct.iter().enumerate() {
            word_continued.set(slot, unit.word_continued);
            word_end.set(slot, unit.word_end);
            distance.add(u64::from(unit.distance));
            value_code.add(u64::from(unit.value_code));
            data_code.add(u64::from(unit.data_code));
        }

        let mut items =
            PackedIntArray::new(self.size, distinct.len().saturating_sub(1).max(1) as u64);
        for slot in redirects {
            items.add(u64::from(slot));
        }
        items.compact();

        self.word_continued = word_continued;
        self.word_end = word_end;
        self.distance = distance;
        self.value_code = value_code;
        self.data_code = data_code;
        self.items = Some(items);
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
        self.word_continued.compact();
        self.word_end.compact();
        self.distance.compact();
        self.value_code.compact();
        self.data_code.compact();
        if let Some(items) = &mut self.items {
            items.compact();
        }
    }

    /// Release all backing storage.  The array is empty afterwards.
    pub fn dispose(&mut self) {
        *self = CompactUnitArray::default();
    }

    pub fn allocation_size(&self) -> usize {
        self.word_continued.allocation_size()
            + self.word_end.allocation_size()
            + self.distance.allocation_size()
            + self.value_code.allocation_size()
            + self.data_code.allocation_size()
            + self.items.as_ref().map_or(0, |i| i.allocation_size())
            + self
                .value_mapping
                .as_ref()
                .map_or(0, |m| m.allocation_size())
            + std::mem::size_of::<Self>()
    }

    // ── Serialization ─────────────────────────────────────────────────────────

    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        write_header(out, self.size, self.value_mapping.as_deref())?;
        format::write_u8(out, format::COMPACT_ARRAY_VERSION)?;
        format::write_u8(out, self.is_compact() as u8)?;
        self.word_continued.write(out)?;
        self.word_end.write(out)?;
        self.distance.write(out)?;
        self.value_code.write(out)?;
        self.data_code.write(out)?;
        if let Some(items) = &self.items {
            items.write(out)?;
        }
        Ok(())
    }

    pub fn read<R: Read>(input: &mut R) -> Result<Self> {
        let (size, mapping) = read_header(input)?;
        format::check_version(input, format::COMPACT_ARRAY_VERSION)?;
        let compacted = format::read_u8(input)? != 0;
        let word_continued = BitArray::read(input)?;
        let word_end = BitArray::read(input)?;
        let distance = PackedIntArray::read(input)?;
        let value_code = PackedIntArray::read(input)?;
        let data_code = PackedIntArray::read(input)?;
        let items = if compacted {
            Some(PackedIntArray::read(input)?)
        } else {
            None
        };
        if let Some(items) = &items {
            if items.size() != size {
                return Err(Error::StructuralInvariant(format!(
                    "dedup table holds {} entries for {} units",
                    items.size(),
                    size
                )));
            }
            // Every redirect must land inside the physical arrays.
            let physical = distance.size();
            for i in 0..items.size() {
                let slot = items.get(i) as usize;
                if slot >= physical {
                    return Err(Error::out_of_range(slot, physical));
                }
            }
        } else if distance.size() != size {
            return Err(Error::StructuralInvariant(format!(
                "{} stored units for declared size {}",
                distance.size(),
                size
            )));
        }
        Ok(CompactUnitArray {
            word_continued,
            word_end,
            distance,
            value_code,
            data_code,
            items,
            size,
            value_mapping: mapping.map(Arc::new),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::FastUnitArray;

    fn sample_fast() -> FastUnitArray {
        let mut fast = FastUnitArray::new(8);
        fast.add(Unit::node(0, 0, false, true, 0));
        fast.add(Unit::node(1, 2, false, true, 0));
        fast.add(Unit::node(2, 0, true, false, 0));
        // Duplicates of units 1 and 2.
        fast.add(Unit::node(1, 2, false, true, 0));
        fast.add(Unit::node(2, 0, true, false, 0));
        fast.add(Unit::node(3, 0, true, false, 7));
        fast
    }

    #[test]
    fn mirrors_fast_before_compacting() {
        let fast = sample_fast();
        let compact = CompactUnitArray::from_fast(&fast);
        assert_eq!(compact.size(), fast.size());
        for i in 0..fast.size() {
            assert_eq!(compact.unit_at(i), fast.unit_at(i), "unit {i}");
            assert_eq!(compact.fast_index(i), i);
        }
    }

    #[test]
    fn dedup_shares_physical_slots() {
        let mut compact = CompactUnitArray::from_fast(&sample_fast());
        compact.compact();
        assert!(compact.is_compact());
        // Logical view unchanged.
        let fast = sample_fast();
        for i in 0..fast.size() {
            assert_eq!(compact.unit_at(i), fast.unit_at(i), "unit {i}");
        }
        // Duplicate units collapse onto one slot.
        assert_eq!(compact.fast_index(1), compact.fast_index(3));
        assert_eq!(compact.fast_index(2), compact.fast_index(4));
        assert_ne!(compact.fast_index(1), compact.fast_index(5));
    }

    #[test]
    fn mutation_after_compact_is_rejected() {
        let mut compact = CompactUnitArray::from_fast(&sample_fast());
        compact.compact();
        match compact.add(Unit::node(4, 0, true, false, 0)) {
            Err(Error::InvalidMutation) => {}
            other => panic!("expected InvalidMutation, got {other:?}"),
        }
        match compact.set(0, Unit::node(4, 0, true, false, 0)) {
            Err(Error::InvalidMutation) => {}
            other => panic!("expected InvalidMutation, got {other:?}"),
        }
    }

    #[test]
    fn serialization_roundtrip_with_dedup() {
        let mut fast = sample_fast();
        let mut mapping = ValueMapping::new();
        for symbol in [97, 98, 99] {
            mapping.map_or_add(symbol);
        }
        fast.set_value_mapping(Arc::new(mapping));
        let mut compact = CompactUnitArray::from_fast(&fast);
        compact.compact();

        let mut buf = Vec::new();
        compact.write(&mut buf).unwrap();
        let back = CompactUnitArray::read(&mut buf.as_slice()).unwrap();
        assert_eq!(back.size(), compact.size());
        assert!(back.is_compact());
        for i in 0..compact.size() {
            assert_eq!(back.unit_at(i), compact.unit_at(i), "unit {i}");
        }
        assert_eq!(
            back.value_mapping().unwrap().values(),
            compact.value_mapping().unwrap().values()
        );
    }

    #[test]
    fn equal_units_uses_the_redirect() {
        let mut compact = CompactUnitArray::from_fast(&sample_fast());
        compact.compact();
        assert!(compact.equal_units(1, 3));
        assert!(!compact.equal_units(0, 5));
    }
}
