//! Shared mutable state of the replacement search.
//!
//! The search rewrites a working copy of the unit array while other workers
//! read the same slots optimistically.  Every cell is therefore an atomic
//! accessed with relaxed ordering: the page locks taken around a commit give
//! the re-validation pass a consistent view of the slots it is about to
//! overwrite, and optimistic readers that lose the race simply fail their
//! re-validation.  Null flags, pointer-target flags, and span-end flags only
//! ever go from clear to set, so a stale read is always conservative.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering::Relaxed};

use crate::unit::{FastUnitArray, Unit};

/// Sentinel for "no sibling pointer recorded".
pub(crate) const NO_POINTER: u32 = u32::MAX;

const FLAG_WORD_END: u8 = 1;
const FLAG_WORD_CONTINUED: u8 = 2;
const FLAG_NULL: u8 = 4;

/// Working copy of the unit array plus the auxiliary indexes of the search.
pub(crate) struct WorkArea {
    size: usize,
    value_code: Vec<AtomicU32>,
    distance: Vec<AtomicU32>,
    data_code: Vec<AtomicU32>,
    flags: Vec<AtomicU8>,
    /// Offset from slot `i` to the next non-null slot strictly after it.
    /// Kept as a forward-converging hint: a stale value may undershoot but
    /// never skips a live unit.
    next_not_null: Vec<AtomicU32>,
    /// For each target of a sibling pointer, the source slot, else NO_POINTER.
    local_pointers: Vec<AtomicU32>,
    /// Slots some absolute pointer targets.
    absolute_pointers: Vec<AtomicBool>,
    /// Last consumed unit of each committed replacement span.
    absolute_pointer_ends: Vec<AtomicBool>,
    /// Committed replacements, for diagnostics.
    replacements: AtomicUsize,
}

impl WorkArea {
    /// Copy `input` and build the pointer indexes by one linear scan.
    pub fn from_fast(input: &FastUnitArray) -> Self {
        let n = input.size();
        let mut area = WorkArea {
            size: n,
            value_code: Vec::with_capacity(n),
            distance: Vec::with_capacity(n),
            data_code: Vec::with_capacity(n),
            flags: Vec::with_capacity(n),
            next_not_null: Vec::with_capacity(n),
            local_pointers: Vec::with_capacity(n),
            absolute_pointers: Vec::with_capacity(n),
            absolute_pointer_ends: Vec::with_capacity(n),
            replacements: AtomicUsize::new(0),
        };
        for i in 0..n {
            let unit = input.unit_at(i);
            let mut flags = 0u8;
            if unit.word_end {
                flags |= FLAG_WORD_END;
            }
            if unit.word_continued {
                flags |= FLAG_WORD_CONTINUED;
            }
            if input.is_null(i) {
                flags |= FLAG_NULL;
            }
            area.value_code.push(AtomicU32::new(unit.value_code));
            area.distance.push(AtomicU32::new(unit.distance));
            area.data_code.push(AtomicU32::new(unit.data_code));
            area.flags.push(AtomicU8::new(flags));
            area.next_not_null.push(AtomicU32::new(1));
            area.local_pointers.push(AtomicU32::new(NO_POINTER));
            area.absolute_pointers.push(AtomicBool::new(false));
            area.absolute_pointer_ends.push(AtomicBool::new(false));
        }
        for i in 0..n {
            if area.is_null(i) {
                continue;
            }
            if area.is_pointer_unit(i) {
                let target = area.distance[i].load(Relaxed) as usize;
                if target < n {
                    area.absolute_pointers[target].store(true, Relaxed);
                }
                // A lone pointer unit is the whole of its replacement span.
                area.absolute_pointer_ends[i].store(true, Relaxed);
            } else {
                let d = area.distance[i].load(Relaxed) as usize;
                if d > 0 {
                    debug_assert!(i + d < n, "sibling pointer at {i} runs past the array");
                    if i + d < n {
                        area.local_pointers[i + d].store(i as u32, Relaxed);
                    }
                }
            }
        }
        area
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    // ── Slot state ────────────────────────────────────────────────────────────

    #[inline]
    pub fn is_null(&self, i: usize) -> bool {
        self.flags[i].load(Relaxed) & FLAG_NULL != 0
    }

    /// A live absolute-pointer unit (both tree flags clear, not erased).
    #[inline]
    pub fn is_pointer_unit(&self, i: usize) -> bool {
        self.flags[i].load(Relaxed) & (FLAG_WORD_END | FLAG_WORD_CONTINUED | FLAG_NULL) == 0
    }

    #[inline]
    pub fn value_code(&self, i: usize) -> u32 {
        self.value_code[i].load(Relaxed)
    }

    #[inline]
    pub fn distance(&self, i: usize) -> u32 {
        self.distance[i].load(Relaxed)
    }

    /// The raw unit at `i`.  Field loads are not mutually atomic; callers that
    /// need a consistent unit hold the page locks covering `i`.
    pub fn unit_at(&self, i: usize) -> Unit {
        let flags = self.flags[i].load(Relaxed);
        Unit {
            value_code: self.value_code[i].load(Relaxed),
            distance: self.distance[i].load(Relaxed),
            data_code: self.data_code[i].load(Relaxed),
            word_end: flags & FLAG_WORD_END != 0,
            word_continued: flags & FLAG_WORD_CONTINUED != 0,
        }
    }

    /// Field-by-field equality of two live slots.
    pub fn equal_units(&self, a: usize, b: usize) -> bool {
        (self.flags[a].load(Relaxed) & !FLAG_NULL) == (self.flags[b].load(Relaxed) & !FLAG_NULL)
            && self.value_code[a].load(Relaxed) == self.value_code[b].load(Relaxed)
            && self.distance[a].load(Relaxed) == self.distance[b].load(Relaxed)
            && self.data_code[a].load(Relaxed) == self.data_code[b].load(Relaxed)
    }

    // ── Rewrites (callers hold the covering page locks) ───────────────────────

    /// Turn slot `i` into the null sentinel.
    pub fn set_null(&self, i: usize) {
        self.value_code[i].store(0, Relaxed);
        self.data_code[i].store(0, Relaxed);
        self.distance[i].store(i as u32, Relaxed);
        self.flags[i].store(FLAG_NULL, Relaxed);
    }

    /// Turn slot `i` into an absolute pointer to `target` covering `length`
    /// expanded units.
    pub fn set_pointer(&self, i: usize, target: u32, length: u32) {
        self.value_code[i].store(length, Relaxed);
        self.data_code[i].store(0, Relaxed);
        self.distance[i].store(target, Relaxed);
        self.flags[i].store(0, Relaxed);
        self.replacements.fetch_add(1, Relaxed);
    }

    // ── Auxiliary indexes ─────────────────────────────────────────────────────

    #[inline]
    pub fn local_pointer(&self, i: usize) -> u32 {
        self.local_pointers[i].load(Relaxed)
    }

    #[inline]
    pub fn is_pointer_target(&self, i: usize) -> bool {
        self.absolute_pointers[i].load(Relaxed)
    }

    pub fn set_pointer_target(&self, i: usize) {
        self.absolute_pointers[i].store(true, Relaxed);
    }

    #[inline]
    pub fn is_span_end(&self, i: usize) -> bool {
        self.absolute_pointer_ends[i].load(Relaxed)
    }

    pub fn set_span_end(&self, i: usize) {
        self.absolute_pointer_ends[i].store(true, Relaxed);
    }

    /// First non-null slot strictly after `i`, following (and compressing)
    /// the skip hints.  Returns `size()` when none remains.
    pub fn next_non_null_after(&self, i: usize) -> usize {
        let mut q = i + self.next_not_null[i].load(Relaxed) as usize;
        while q < self.size && self.is_null(q) {
            q += self.next_not_null[q].load(Relaxed) as usize;
        }
        let skip = (q.min(self.size) - i) as u32;
        self.next_not_null[i].store(skip, Relaxed);
        q
    }

    /// First non-null slot at or after `i`.
    pub fn first_non_null_at_or_after(&self, i: usize) -> usize {
        if i >= self.size {
            return self.size;
        }
        if !self.is_null(i) {
            return i;
        }
        self.next_non_null_after(i)
    }

    pub fn set_next_not_null(&self, i: usize, skip: u32) {
        self.next_not_null[i].store(skip, Relaxed);
    }

    // ── Diagnostics ───────────────────────────────────────────────────────────

    pub fn replacements(&self) -> usize {
        self.replacements.load(Relaxed)
    }

    pub fn count_nulls(&self) -> usize {
        (0..self.size).filter(|&i| self.is_null(i)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_work() -> WorkArea {
        let mut fast = FastUnitArray::new(6);
        fast.add(Unit::node(0, 0, false, true, 0));
        fast.add(Unit::node(1, 2, false, true, 0));
        fast.add(Unit::node(2, 0, true, false, 0));
        fast.add(Unit::node(3, 0, true, false, 0));
        fast.add(Unit::absolute_pointer(1, 2));
        fast.add(Unit::node(4, 0, true, false, 0));
        WorkArea::from_fast(&fast)
    }

    #[test]
    fn pointer_indexes_built_on_construction() {
        let work = small_work();
        // Unit 1 has a sibling pointer to 3.
        assert_eq!(work.local_pointer(3), 1);
        assert_eq!(work.local_pointer(2), NO_POINTER);
        // Unit 4 is a pre-existing absolute pointer to 1.
        assert!(work.is_pointer_target(1));
        assert!(work.is_span_end(4));
        assert!(work.is_pointer_unit(4));
        assert!(!work.is_pointer_unit(1));
    }

    #[test]
    fn null_rewrite_and_skip_hints() {
        let work = small_work();
        work.set_null(2);
        work.set_null(3);
        work.set_next_not_null(2, 2);
        work.set_next_not_null(3, 1);
        assert!(work.is_null(2));
        assert_eq!(work.next_non_null_after(1), 4);
        assert_eq!(work.first_non_null_at_or_after(2), 4);
        assert_eq!(work.first_non_null_at_or_after(4), 4);
    }

    #[test]
    fn pointer_rewrite_counts_replacements() {
        let work = small_work();
        work.set_pointer(3, 1, 2);
        assert!(work.is_pointer_unit(3));
        assert_eq!(work.value_code(3), 2);
        assert_eq!(work.distance(3), 1);
        assert_eq!(work.replacements(), 1);
    }
}
