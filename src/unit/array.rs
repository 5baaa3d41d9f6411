//! Uniform accessor over the two unit-array representations.

use std::io::Write;
use std::sync::Arc;

use crate::error::Result;
use crate::unit::{CompactUnitArray, FastUnitArray, Unit, ValueMapping};

/// Either representation behind one interface.
///
/// The traversal takes this enum so a tree can be queried both freshly built
/// (fast) and loaded from disk (compact).  Hot loops should grab
/// [`UnitArray::fast_index`] once and use the `*_fast` accessors, which are
/// monomorphized on the concrete type; the dedup redirect is the only
/// essential branch on the compact path.
#[derive(Debug, Clone)]
pub enum UnitArray {
    Fast(FastUnitArray),
    Compact(CompactUnitArray),
}

impl UnitArray {
    #[inline]
    pub fn size(&self) -> usize {
        match self {
            UnitArray::Fast(a) => a.size(),
            UnitArray::Compact(a) => a.size(),
        }
    }

    /// The unit at `index`, or `None` when the slot is null.
    pub fn get(&self, index: usize) -> Option<Unit> {
        match self {
            UnitArray::Fast(a) => a.get(index),
            UnitArray::Compact(a) => a.get(index),
        }
    }

    /// The raw unit at `index`, nulls included.
    pub fn unit_at(&self, index: usize) -> Unit {
        match self {
            UnitArray::Fast(a) => a.unit_at(index),
            UnitArray::Compact(a) => a.unit_at(index),
        }
    }

    #[inline]
    pub fn is_null(&self, index: usize) -> bool {
        match self {
            UnitArray::Fast(a) => a.is_null(index),
            UnitArray::Compact(a) => a.is_null(index),
        }
    }

    #[inline]
    pub fn is_word_end(&self, index: usize) -> bool {
        match self {
            UnitArray::Fast(a) => a.is_word_end(index),
            UnitArray::Compact(a) => a.is_word_end(index),
        }
    }

    #[inline]
    pub fn is_word_continued(&self, index: usize) -> bool {
        match self {
            UnitArray::Fast(a) => a.is_word_continued(index),
            UnitArray::Compact(a) => a.is_word_continued(index),
        }
    }

    #[inline]
    pub fn is_absolute_pointer(&self, index: usize) -> bool {
        match self {
            UnitArray::Fast(a) => a.is_absolute_pointer(index),
            UnitArray::Compact(a) => a.is_absolute_pointer(index),
        }
    }

    #[inline]
    pub fn distance(&self, index: usize) -> u32 {
        match self {
            UnitArray::Fast(a) => a.distance(index),
            UnitArray::Compact(a) => a.distance(index),
        }
    }

    #[inline]
    pub fn value_code(&self, index: usize) -> u32 {
        match self {
            UnitArray::Fast(a) => a.value_code(index),
            UnitArray::Compact(a) => a.value_code(index),
        }
    }

    #[inline]
    pub fn data_code(&self, index: usize) -> u32 {
        match self {
            UnitArray::Fast(a) => a.data_code(index),
            UnitArray::Compact(a) => a.data_code(index),
        }
    }

    /// The mapped symbol on this unit's edge.
    pub fn value(&self, index: usize) -> Option<i32> {
        match self {
            UnitArray::Fast(a) => a.value(index),
            UnitArray::Compact(a) => a.value(index),
        }
    }

    // ── Physical redirect and hot-loop accessors ─────────────────────────────

    /// Physical slot behind logical `index`; identity on the fast variant.
    #[inline]
    pub fn fast_index(&self, index: usize) -> usize {
        match self {
            UnitArray::Fast(_) => index,
            UnitArray::Compact(a) => a.fast_index(index),
        }
    }

    #[inline]
    pub fn value_code_fast(&self, physical: usize) -> u32 {
        match self {
            UnitArray::Fast(a) => a.value_code(physical),
            UnitArray::Compact(a) => a.value_code_fast(physical),
        }
    }

    #[inline]
    pub fn distance_fast(&self, physical: usize) -> u32 {
        match self {
            UnitArray::Fast(a) => a.distance(physical),
            UnitArray::Compact(a) => a.distance_fast(physical),
        }
    }

    #[inline]
    pub fn data_code_fast(&self, physical: usize) -> u32 {
        match self {
            UnitArray::Fast(a) => a.data_code(physical),
            UnitArray::Compact(a) => a.data_code_fast(physical),
        }
    }

    #[inline]
    pub fn is_word_end_fast(&self, physical: usize) -> bool {
        match self {
            UnitArray::Fast(a) => a.is_word_end(physical),
            UnitArray::Compact(a) => a.is_word_end_fast(physical),
        }
    }

    #[inline]
    pub fn is_word_continued_fast(&self, physical: usize) -> bool {
        match self {
            UnitArray::Fast(a) => a.is_word_continued(physical),
            UnitArray::Compact(a) => a.is_word_continued_fast(physical),
        }
    }

    // ── Comparison ────────────────────────────────────────────────────────────

    #[inline]
    pub fn equal_units(&self, a: usize, b: usize) -> bool {
        match self {
            UnitArray::Fast(u) => u.equal_units(a, b),
            UnitArray::Compact(u) => u.equal_units(a, b),
        }
    }

    #[inline]
    pub fn compare_units(&self, a: usize, b: usize) -> std::cmp::Ordering {
        match self {
            UnitArray::Fast(u) => u.compare_units(a, b),
            UnitArray::Compact(u) => u.compare_units(a, b),
        }
    }

    // ── Mutators ──────────────────────────────────────────────────────────────

    /// Overwrite a unit.  Fails with [`crate::Error::InvalidMutation`] on a
    /// compacted array.
    pub fn set(&mut self, index: usize, unit: Unit) -> Result<()> {
        match self {
            UnitArray::Fast(a) => {
                a.set(index, unit);
                Ok(())
            }
            UnitArray::Compact(a) => a.set(index, unit),
        }
    }

    /// Append a unit.  Fails with [`crate::Error::InvalidMutation`] on a
    /// compacted array.
    pub fn add(&mut self, unit: Unit) -> Result<()> {
        match self {
            UnitArray::Fast(a) => {
                a.add(unit);
                Ok(())
            }
            UnitArray::Compact(a) => a.add(unit),
        }
    }

    /// Append every unit of `other`, fields verbatim.
    pub fn add_all(&mut self, other: &UnitArray) -> Result<()> {
        for i in 0..other.size() {
            self.add(other.unit_at(i))?;
        }
        Ok(())
    }

    /// Copy `[start, end)` into a fresh fast array sharing the mapping.
    pub fn sub_array(&self, start: usize, end: usize) -> FastUnitArray {
        match self {
            UnitArray::Fast(a) => a.sub_array(start, end),
            UnitArray::Compact(a) => {
                assert!(start <= end && end <= a.size());
                let mut sub = FastUnitArray::new(end - start);
                for i in start..end {
                    sub.add(a.unit_at(i));
                }
                if let Some(mapping) = a.value_mapping() {
                    sub.set_value_mapping(Arc::clone(mapping));
                }
                sub
            }
        }
    }

    /// Shift every absolute pointer's target by `offset`.
    pub fn move_absolute_pointers(&mut self, offset: i64) -> Result<()> {
        match self {
            UnitArray::Fast(a) => {
                a.move_absolute_pointers(offset);
                Ok(())
            }
            UnitArray::Compact(a) => a.move_absolute_pointers(offset),
        }
    }

    // ── Value mapping ─────────────────────────────────────────────────────────

    pub fn value_mapping(&self) -> Option<&Arc<ValueMapping>> {
        match self {
            UnitArray::Fast(a) => a.value_mapping(),
            UnitArray::Compact(a) => a.value_mapping(),
        }
    }

    pub fn set_value_mapping(&mut self, mapping: Arc<ValueMapping>) {
        match self {
            UnitArray::Fast(a) => a.set_value_mapping(mapping),
            UnitArray::Compact(a) => a.set_value_mapping(mapping),
        }
    }

    pub fn map_to_value_code(&self, symbol: i32) -> Option<u32> {
        match self {
            UnitArray::Fast(a) => a.map_to_value_code(symbol),
            UnitArray::Compact(a) => a.map_to_value_code(symbol),
        }
    }

    // ── Storage management ────────────────────────────────────────────────────

    pub fn trim_to_size(&mut self) {
        match self {
            UnitArray::Fast(a) => a.trim_to_size(),
            UnitArray::Compact(a) => a.trim_to_size(),
        }
    }

    pub fn dispose(&mut self) {
        match self {
            UnitArray::Fast(a) => a.dispose(),
            UnitArray::Compact(a) => a.dispose(),
        }
    }

    pub fn allocation_size(&self) -> usize {
        match self {
            UnitArray::Fast(a) => a.allocation_size(),
            UnitArray::Compact(a) => a.allocation_size(),
        }
    }

    // ── Serialization ─────────────────────────────────────────────────────────

    /// Write in the representation-specific layout.  Reading back goes
    /// through the concrete type, which the container format determines.
    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        match self {
            UnitArray::Fast(a) => a.write(out),
            UnitArray::Compact(a) => a.write(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FastUnitArray {
        let mut fast = FastUnitArray::new(4);
        fast.add(Unit::node(0, 0, false, true, 0));
        fast.add(Unit::node(1, 1, false, true, 0));
        fast.add(Unit::node(2, 0, true, false, 3));
        fast
    }

    #[test]
    fn both_variants_agree() {
        let fast = sample();
        let compact = {
            let mut c = CompactUnitArray::from_fast(&fast);
            c.compact();
            c
        };
        let a = UnitArray::Fast(fast);
        let b = UnitArray::Compact(compact);
        assert_eq!(a.size(), b.size());
        for i in 0..a.size() {
            assert_eq!(a.unit_at(i), b.unit_at(i), "unit {i}");
            assert_eq!(a.is_absolute_pointer(i), b.is_absolute_pointer(i));
            let pa = a.fast_index(i);
            let pb = b.fast_index(i);
            assert_eq!(a.value_code_fast(pa), b.value_code_fast(pb));
        }
    }

    #[test]
    fn add_all_appends_verbatim() {
        let mut target = UnitArray::Fast(sample());
        let other = UnitArray::Fast(sample());
        target.add_all(&other).unwrap();
        assert_eq!(target.size(), 6);
        assert_eq!(target.unit_at(3), other.unit_at(0));
    }

    #[test]
    fn sub_array_is_always_fast() {
        let mut compact = CompactUnitArray::from_fast(&sample());
        compact.compact();
        let array = UnitArray::Compact(compact);
        let sub = array.sub_array(1, 3);
        assert_eq!(sub.size(), 2);
        assert_eq!(sub.unit_at(0), array.unit_at(1));
    }
}
