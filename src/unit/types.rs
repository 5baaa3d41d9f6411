//! The unit: atom of the linked-list tree representation.

use std::cmp::Ordering;

/// One slot of the unit array.
///
/// A unit is normally a tree node: `value_code` names the symbol on the edge
/// leading to it, `distance` is the forward offset to its next sibling
/// (0 = last sibling), `word_continued` says the next slot starts its first
/// child run, `word_end` marks a stored key's terminal, and `data_code`
/// carries the payload when `word_end` is set.
///
/// Two flag combinations are overloaded:
/// - both flags clear → the unit is an **absolute pointer**: `distance` is
///   the absolute target index and `value_code` the number of units to read
///   there (0 = read to the target's own natural end);
/// - both flags clear and `distance` equal to the unit's own index → the
///   slot is **null**, erased by compression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Unit {
    pub value_code: u32,
    pub distance: u32,
    pub data_code: u32,
    pub word_end: bool,
    pub word_continued: bool,
}

impl Unit {
    /// An ordinary tree node.
    pub fn node(value_code: u32, distance: u32, word_end: bool, word_continued: bool, data_code: u32) -> Self {
        Unit {
            value_code,
            distance,
            data_code,
            word_end,
            word_continued,
        }
    }

    /// An absolute pointer to `target` covering `length` expanded units.
    pub fn absolute_pointer(target: u32, length: u32) -> Self {
        Unit {
            value_code: length,
            distance: target,
            data_code: 0,
            word_end: false,
            word_continued: false,
        }
    }

    /// The null sentinel for slot `index`.
    pub fn null(index: u32) -> Self {
        Unit {
            value_code: 0,
            distance: index,
            data_code: 0,
            word_end: false,
            word_continued: false,
        }
    }

    /// Both flags clear: this unit is an absolute pointer (or a null slot,
    /// which only the owning array can tell from the index).
    #[inline]
    pub fn is_absolute_pointer(&self) -> bool {
        !self.word_end && !self.word_continued
    }

    /// Primary sort key: `(value_code << 2) | (word_end << 1) | word_continued`.
    #[inline]
    pub fn sort_key(&self) -> u64 {
        (u64::from(self.value_code) << 2)
            | (u64::from(self.word_end) << 1)
            | u64::from(self.word_continued)
    }

    /// Total order used by suffix sorting and dedup: sort key, then distance,
    /// then data code — the payload participates only for word-end units.
    pub fn compare(&self, other: &Unit) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.distance.cmp(&other.distance))
            .then_with(|| {
                if self.word_end {
                    self.data_code.cmp(&other.data_code)
                } else {
                    Ordering::Equal
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_overloading() {
        assert!(Unit::absolute_pointer(7, 3).is_absolute_pointer());
        assert!(Unit::null(4).is_absolute_pointer());
        assert!(!Unit::node(1, 0, true, false, 9).is_absolute_pointer());
    }

    #[test]
    fn compare_orders_by_value_code_first() {
        let a = Unit::node(1, 5, true, true, 9);
        let b = Unit::node(2, 0, false, false, 0);
        assert_eq!(a.compare(&b), Ordering::Less);
    }

    #[test]
    fn data_code_ignored_unless_word_end() {
        let a = Unit::node(3, 1, false, true, 7);
        let b = Unit::node(3, 1, false, true, 8);
        assert_eq!(a.compare(&b), Ordering::Equal);

        let a = Unit::node(3, 1, true, true, 7);
        let b = Unit::node(3, 1, true, true, 8);
        assert_eq!(a.compare(&b), Ordering::Less);
    }

    #[test]
    fn flags_break_ties_before_distance() {
        let end = Unit::node(3, 0, true, false, 0);
        let cont = Unit::node(3, 9, false, true, 0);
        // word_end weighs 2, word_continued weighs 1.
        assert_eq!(end.compare(&cont), Ordering::Greater);
    }
}
