//! Suffix-array construction over unit positions.

use std::cmp::Ordering;

use crate::unit::FastUnitArray;

/// Compares two positions by the unit sequence starting at each.
///
/// The lookahead is exactly two units: the replacement search walks the true
/// match length itself, so the sort only has to group positions that share a
/// two-unit prefix.  The final slot always sorts last — it has no lookahead —
/// and `by_position` makes the order total so equal-prefix runs come out
/// ascending by position, which is what picks the canonical occurrence.
pub struct SuffixComparator<'a> {
    units: &'a FastUnitArray,
    by_position: bool,
}

impl<'a> SuffixComparator<'a> {
    pub fn new(units: &'a FastUnitArray, by_position: bool) -> Self {
        SuffixComparator { units, by_position }
    }

    pub fn compare(&self, a: usize, b: usize) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let last = self.units.size() - 1;
        if a == last {
            return Ordering::Greater;
        }
        if b == last {
            return Ordering::Less;
        }
        let first = self.units.compare_units(a, b);
        if first != Ordering::Equal {
            return first;
        }
        let second = self.units.compare_units(a + 1, b + 1);
        if second != Ordering::Equal {
            return second;
        }
        if self.by_position {
            a.cmp(&b)
        } else {
            Ordering::Equal
        }
    }

    /// Whether `a` and `b` share the full two-unit prefix (ignoring the
    /// position tiebreak).  Partition boundaries are defined by this.
    pub fn prefix_equal(&self, a: usize, b: usize) -> bool {
        let last = self.units.size() - 1;
        a != last
            && b != last
            && self.units.equal_units(a, b)
            && self.units.equal_units(a + 1, b + 1)
    }
}

/// Sort all positions of `units` by [`SuffixComparator`] with the position
/// tiebreak enabled.
pub fn build_suffix_array(units: &FastUnitArray) -> Vec<u32> {
    let comparator = SuffixComparator::new(units, true);
    let mut positions: Vec<u32> = (0..units.size() as u32).collect();
    positions.sort_unstable_by(|&a, &b| comparator.compare(a as usize, b as usize));
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::Unit;

    fn array_of(codes: &[(u32, bool)]) -> FastUnitArray {
        let mut units = FastUnitArray::new(codes.len());
        for &(value_code, word_end) in codes {
            units.add(Unit::node(value_code, 0, word_end, !word_end, 0));
        }
        units
    }

    #[test]
    fn final_slot_sorts_last() {
        let units = array_of(&[(5, false), (1, true), (1, true)]);
        let cmp = SuffixComparator::new(&units, true);
        assert_eq!(cmp.compare(2, 0), Ordering::Greater);
        assert_eq!(cmp.compare(0, 2), Ordering::Less);
    }

    #[test]
    fn equal_prefixes_fall_back_to_position() {
        let units = array_of(&[(3, false), (7, true), (3, false), (7, true), (9, true)]);
        let cmp = SuffixComparator::new(&units, true);
        assert!(cmp.prefix_equal(0, 2));
        assert_eq!(cmp.compare(0, 2), Ordering::Less);
        assert_eq!(cmp.compare(2, 0), Ordering::Greater);

        let unordered = SuffixComparator::new(&units, false);
        assert_eq!(unordered.compare(0, 2), Ordering::Equal);
    }

    #[test]
    fn suffix_array_groups_equal_prefixes() {
        let units = array_of(&[(3, false), (7, true), (3, false), (7, true), (9, true)]);
        let sa = build_suffix_array(&units);
        assert_eq!(sa.len(), 5);
        // Positions 0 and 2 share a prefix and stay in position order.
        let p0 = sa.iter().position(|&p| p == 0).unwrap();
        let p2 = sa.iter().position(|&p| p == 2).unwrap();
        assert!(p0 + 1 == p2, "equal-prefix run must be contiguous and ordered");
        // The final slot is the very last entry.
        assert_eq!(*sa.last().unwrap(), 4);
    }
}
