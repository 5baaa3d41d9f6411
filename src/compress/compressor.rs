//! The LZ-trie compression pass.
//!
//! Repeated subtree fragments are located through a suffix array over unit
//! positions, duplicates are rewritten into one-unit absolute pointers at the
//! canonical occurrence, and the emptied slots are compacted out with every
//! surviving distance repaired.  The semantic tree is unchanged; the array
//! typically shrinks to 20–60 % of its input size.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering::Relaxed};
use std::sync::Arc;

use log::{debug, info};

use crate::bits::PackedIntArray;
use crate::compress::parallel::PageLocks;
use crate::compress::suffix::{build_suffix_array, SuffixComparator};
use crate::compress::work::{WorkArea, NO_POINTER};
use crate::config::{MAX_PARTITION_SIZE, MAX_REPLACEMENT_LEN, SYNC_PAGE_SIZE};
use crate::error::{Error, Result};
use crate::unit::FastUnitArray;

/// Knobs for a compression pass.
#[derive(Debug, Clone)]
pub struct CompressOptions {
    /// Process suffix-array partitions on a worker pool.
    pub parallel: bool,
    /// Worker count for the parallel mode; 0 selects `max(1, cores - 1)`.
    pub nb_workers: usize,
    /// Upper bound on the candidates grouped into one partition.
    pub max_partition_size: usize,
}

impl Default for CompressOptions {
    fn default() -> Self {
        CompressOptions {
            parallel: false,
            nb_workers: 0,
            max_partition_size: MAX_PARTITION_SIZE,
        }
    }
}

/// The compression engine.  Stateless between runs; every pass owns its own
/// working copy and auxiliary indexes and releases them on return.
pub struct LzTrieCompressor {
    options: CompressOptions,
}

/// Outcome of a replacement-length walk over one candidate.
struct Replacement {
    /// Count of matched non-null units.
    length: u32,
    /// Physical width of the accepted span, trailing nulls excluded.
    span: usize,
    /// Offset of the last matched unit inside the span.
    last_offset: usize,
}

impl LzTrieCompressor {
    pub fn new(options: CompressOptions) -> Self {
        assert!(
            (MAX_REPLACEMENT_LEN as usize) < SYNC_PAGE_SIZE,
            "a replacement span must fit within two synchronization pages"
        );
        LzTrieCompressor { options }
    }

    /// Compress `input`, returning the trimmed replacement array.
    ///
    /// The input's value mapping is carried over by reference.  Deterministic
    /// for a given input and partition bound; the parallel mode may commit a
    /// different (equally valid) subset of replacements depending on timing.
    pub fn compress(&self, input: FastUnitArray) -> Result<FastUnitArray> {
        let n = input.size();
        if n < 4 {
            return Ok(input);
        }
        let mapping = input.value_mapping().cloned();
        info!("compressing unit array of {n} units");

        // Phase A — indexing.
        let suffix_array = Arc::new(build_suffix_array(&input));
        let partitions = partition_ranges(&input, &suffix_array, self.options.max_partition_size);
        debug!("{} partitions with at least one candidate", partitions.len());
        let work = Arc::new(WorkArea::from_fast(&input));
        drop(input);

        // Phase B — replacement search.
        let locks = Arc::new(PageLocks::new(n));
        self.run_search(&work, &locks, &suffix_array, partitions)?;
        let nulls = work.count_nulls();
        debug!(
            "replacement search committed {} back-pointers, erasing {nulls} slots",
            work.replacements()
        );

        // Phase C — compaction and pointer repair.
        let mut output = compact_nulls(&work, nulls)?;
        drop(work);

        // Phase D — pointer-length correction.
        correct_pointer_lengths(&mut output);

        if let Some(mapping) = mapping {
            output.set_value_mapping(mapping);
        }
        output.trim_to_size();
        info!("compressed {} units down to {}", n, output.size());
        Ok(output)
    }

    #[cfg(feature = "parallel")]
    fn run_search(
        &self,
        work: &Arc<WorkArea>,
        locks: &Arc<PageLocks>,
        suffix_array: &Arc<Vec<u32>>,
        partitions: Vec<Range<usize>>,
    ) -> Result<()> {
        let workers = if self.options.nb_workers == 0 {
            crate::config::default_nb_workers()
        } else {
            self.options.nb_workers
        };
        if self.options.parallel && workers > 1 {
            return crate::compress::parallel::run_partitions(
                work,
                locks,
                suffix_array,
                partitions,
                workers,
            );
        }
        run_sequential(work, locks, suffix_array, partitions)
    }

    #[cfg(not(feature = "parallel"))]
    fn run_search(
        &self,
        work: &Arc<WorkArea>,
        locks: &Arc<PageLocks>,
        suffix_array: &Arc<Vec<u32>>,
        partitions: Vec<Range<usize>>,
    ) -> Result<()> {
        run_sequential(work, locks, suffix_array, partitions)
    }
}

fn run_sequential(
    work: &WorkArea,
    locks: &PageLocks,
    suffix_array: &[u32],
    partitions: Vec<Range<usize>>,
) -> Result<()> {
    let abort = AtomicBool::new(false);
    for range in partitions {
        process_partition(work, locks, suffix_array, range, &abort)?;
    }
    Ok(())
}

/// Group suffix-array positions into maximal runs sharing a two-unit prefix,
/// capped at `max_partition_size`.  Runs with no candidate are dropped.
fn partition_ranges(
    units: &FastUnitArray,
    suffix_array: &[u32],
    max_partition_size: usize,
) -> Vec<Range<usize>> {
    let comparator = SuffixComparator::new(units, false);
    let mut ranges = Vec::new();
    let mut start = 0usize;
    for idx in 1..=suffix_array.len() {
        let boundary = idx == suffix_array.len()
            || idx - start >= max_partition_size
            || !comparator.prefix_equal(suffix_array[idx - 1] as usize, suffix_array[idx] as usize);
        if boundary {
            if idx - start >= 2 {
                ranges.push(start..idx);
            }
            start = idx;
        }
    }
    ranges
}

/// Process every candidate of one partition against its canonical occurrence.
///
/// Each candidate is measured optimistically first; only a promising match
/// pays for the page locks, under which the measurement is repeated before
/// the commit (double-checked locking).
pub(crate) fn process_partition(
    work: &WorkArea,
    locks: &PageLocks,
    suffix_array: &[u32],
    range: Range<usize>,
    abort: &AtomicBool,
) -> Result<()> {
    let canonical = suffix_array[range.start] as usize;
    for &candidate in &suffix_array[range.start + 1..range.end] {
        if abort.load(Relaxed) {
            return Ok(());
        }
        let candidate = candidate as usize;
        if replacement_length(work, canonical, candidate).length < 2 {
            continue;
        }
        let _guards = locks.acquire(canonical, candidate)?;
        let accepted = replacement_length(work, canonical, candidate);
        if accepted.length >= 2 {
            commit_replacement(work, canonical, candidate, &accepted)?;
        }
    }
    Ok(())
}

/// Measure how many units starting at `candidate` can be replaced by a
/// pointer to `canonical`.
///
/// The walk advances both spans in lockstep.  A unit pair matches while all
/// of the following hold:
/// - the previous candidate unit did not close an earlier replacement span
///   (a span may end exactly at such a unit but never cross it);
/// - the matched length stays under [`MAX_REPLACEMENT_LEN`] and the physical
///   span under one synchronization page;
/// - the canonical span stays strictly left of the candidate;
/// - the units are field-equal;
/// - past the first unit, the candidate slot is not the target of any
///   absolute pointer, and any sibling pointer into it originates inside the
///   span (an outside source would be left dangling by the erase).
///
/// Erased slots are skipped, but only when both spans carry an identically
/// sized null run at the same offset — diverging layouts would change what
/// the shared raw distances mean after compaction, so the match stops there.
///
/// A second pass then drops any tail whose sibling pointer would jump past
/// the accepted span end: the traversal can re-enter the outer frame only at
/// the slot directly after the span, so a pointer landing further out has no
/// representation.
fn replacement_length(work: &WorkArea, canonical: usize, candidate: usize) -> Replacement {
    let n = work.size();
    let none = Replacement {
        length: 0,
        span: 0,
        last_offset: 0,
    };
    if work.is_null(canonical) || work.is_null(candidate) {
        return none;
    }

    let mut offset = 0usize;
    let mut length = 0u32;
    let mut span = 0usize;
    let mut last_offset = 0usize;
    let mut at_span_end = false;
    loop {
        let i = canonical + offset;
        let j = candidate + offset;
        if j >= n {
            break;
        }
        let i_null = work.is_null(i);
        if i_null != work.is_null(j) {
            break;
        }
        if i_null {
            let skip_i = work.next_non_null_after(i) - i;
            let skip_j = work.next_non_null_after(j) - j;
            if skip_i != skip_j {
                break;
            }
            offset += skip_i;
            continue;
        }
        if at_span_end
            || length >= MAX_REPLACEMENT_LEN
            || offset >= SYNC_PAGE_SIZE
            || i >= candidate
            || !work.equal_units(i, j)
        {
            break;
        }
        if offset > 0 {
            if work.is_pointer_target(j) {
                break;
            }
            let source = work.local_pointer(j);
            if source != NO_POINTER && (source as usize) < candidate {
                break;
            }
        }
        length += 1;
        last_offset = offset;
        span = offset + 1;
        at_span_end = work.is_span_end(j);
        offset += 1;
    }

    // Drop tails whose sibling pointers escape the span.  Shrinking the span
    // can expose new escapes, so repeat until stable.
    loop {
        let mut truncated = false;
        let mut k = 0usize;
        while k < span {
            let j = candidate + k;
            if !work.is_null(j) && !work.is_pointer_unit(j) {
                let d = work.distance(j) as usize;
                if d > 0 && k + d > span {
                    span = k;
                    truncated = true;
                    break;
                }
            }
            k += 1;
        }
        if !truncated {
            break;
        }
    }

    // Recount over the surviving prefix.
    length = 0;
    last_offset = 0;
    let mut end = 0usize;
    for k in 0..span {
        if !work.is_null(candidate + k) {
            length += 1;
            last_offset = k;
            end = k + 1;
        }
    }
    Replacement {
        length,
        span: end,
        last_offset,
    }
}

/// Count the original-tree units the canonical span expands to when every
/// absolute pointer inside it is followed.
fn number_of_units(work: &WorkArea, canonical: usize, span: usize) -> u32 {
    let mut total = 0u32;
    for k in 0..span {
        let i = canonical + k;
        if work.is_null(i) {
            continue;
        }
        if work.is_pointer_unit(i) {
            // Committed pointers always carry a positive expansion count.
            total += work.value_code(i).max(1);
        } else {
            total += 1;
        }
    }
    total
}

/// Rewrite the accepted candidate span into a back-pointer plus nulls.
/// Callers hold the page locks covering both spans.
fn commit_replacement(
    work: &WorkArea,
    canonical: usize,
    candidate: usize,
    accepted: &Replacement,
) -> Result<()> {
    let n = work.size();
    let first_page = candidate / SYNC_PAGE_SIZE;
    let last_page = (candidate + accepted.span - 1) / SYNC_PAGE_SIZE;
    if last_page > first_page + 1 {
        return Err(Error::CompressionInternal(format!(
            "unsynchronized page hit: span at {candidate} straddles pages {first_page}..{last_page}"
        )));
    }

    let expanded = number_of_units(work, canonical, accepted.span);
    work.set_span_end(canonical + accepted.last_offset);
    let tail_carried_end = work.is_span_end(candidate + accepted.last_offset);

    for k in 1..accepted.span {
        let p = candidate + k;
        if !work.is_null(p) {
            work.set_null(p);
        }
    }
    work.set_pointer(candidate, canonical as u32, expanded);
    work.set_pointer_target(canonical);
    if tail_carried_end {
        work.set_span_end(candidate);
    }

    // Repair the skip hints across the erased range.
    let next = work.first_non_null_at_or_after(candidate + accepted.span);
    for k in 0..accepted.span {
        let p = candidate + k;
        work.set_next_not_null(p, (next.min(n) - p) as u32);
    }
    Ok(())
}

/// Phase C: drop every null slot and repair all surviving distances.
fn compact_nulls(work: &WorkArea, total_nulls: usize) -> Result<FastUnitArray> {
    let n = work.size();
    let mut empty_before = PackedIntArray::new(n + 1, total_nulls.max(1) as u64);
    let mut seen = 0u64;
    for i in 0..n {
        empty_before.add(seen);
        if work.is_null(i) {
            seen += 1;
        }
    }
    empty_before.add(seen);

    let mut output = FastUnitArray::new(n - total_nulls);
    for i in 0..n {
        if work.is_null(i) {
            continue;
        }
        let mut unit = work.unit_at(i);
        if unit.is_absolute_pointer() {
            let target = unit.distance as usize;
            if target >= n || work.is_null(target) {
                return Err(Error::StructuralInvariant(format!(
                    "pointer at {i} targets erased slot {target}"
                )));
            }
            unit.distance -= empty_before.get(target) as u32;
        } else if unit.distance > 0 {
            let target = i + unit.distance as usize;
            if target >= n {
                return Err(Error::StructuralInvariant(format!(
                    "sibling pointer at {i} runs past the array"
                )));
            }
            if work.is_null(target) {
                return Err(Error::StructuralInvariant(format!(
                    "sibling pointer at {i} lands on erased slot {target}"
                )));
            }
            unit.distance -= (empty_before.get(target) - empty_before.get(i)) as u32;
        }
        output.add(unit);
    }
    Ok(output)
}

/// Phase D: convert every pointer's expansion count into the physical width
/// of its target span in the compacted array.
///
/// The expansion count was the right thing to store at commit time — later
/// replacements inside a canonical span change its physical width but not
/// its expansion — and only now, with the array final, can the widths be
/// fixed.  Each nested pointer occupies one slot yet accounts for its own
/// expansion, so it reduces the outer count by `value_code - 1`.  The walk
/// uses a snapshot of the pre-correction counts; an inconsistent expansion
/// clamps the pointer to 0, the open "read to the natural end" form.
fn correct_pointer_lengths(output: &mut FastUnitArray) {
    let n = output.size();
    let mut pointer_expansion: Vec<u32> = vec![0; n];
    let mut is_pointer: Vec<bool> = vec![false; n];
    for i in 0..n {
        if output.is_absolute_pointer(i) {
            is_pointer[i] = true;
            pointer_expansion[i] = output.value_code(i);
        }
    }
    for i in 0..n {
        if !is_pointer[i] || pointer_expansion[i] == 0 {
            continue;
        }
        let mut remaining = i64::from(pointer_expansion[i]);
        let mut physical = 0u32;
        let mut pos = output.distance(i) as usize;
        let mut consistent = true;
        while remaining > 0 {
            if pos >= n {
                consistent = false;
                break;
            }
            if is_pointer[pos] {
                remaining -= i64::from(pointer_expansion[pos].max(1));
            } else {
                remaining -= 1;
            }
            physical += 1;
            pos += 1;
        }
        let corrected = if consistent && remaining == 0 {
            physical
        } else {
            0
        };
        let mut unit = output.unit_at(i);
        unit.value_code = corrected;
        output.set(i, unit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::Unit;

    /// Two identical three-unit sibling runs; the second should collapse
    /// into a single back-pointer at the first.
    fn duplicated_runs() -> FastUnitArray {
        let mut fast = FastUnitArray::new(8);
        // Root with two children (codes 1 and 5).
        fast.add(Unit::node(0, 0, false, true, 0)); // 0: root
        fast.add(Unit::node(1, 3, false, true, 0)); // 1: 'a' subtree
        fast.add(Unit::node(2, 1, true, false, 0)); // 2:   'b' end
        fast.add(Unit::node(3, 0, true, false, 0)); // 3:   'c' end
        fast.add(Unit::node(5, 0, false, true, 0)); // 4: 'd' subtree
        fast.add(Unit::node(2, 1, true, false, 0)); // 5:   'b' end
        fast.add(Unit::node(3, 0, true, false, 0)); // 6:   'c' end
        fast
    }

    #[test]
    fn finds_and_commits_a_duplicate_run() {
        let compressor = LzTrieCompressor::new(CompressOptions::default());
        let output = compressor.compress(duplicated_runs()).unwrap();
        // Units 5..7 collapse into one pointer: 7 units -> 6.
        assert_eq!(output.size(), 6);
        let pointer = (0..output.size())
            .find(|&i| output.is_absolute_pointer(i))
            .expect("one absolute pointer committed");
        assert_eq!(output.distance(pointer), 2);
        assert_eq!(output.value_code(pointer), 2);
    }

    #[test]
    fn null_slots_are_fully_removed() {
        let compressor = LzTrieCompressor::new(CompressOptions::default());
        let output = compressor.compress(duplicated_runs()).unwrap();
        for i in 0..output.size() {
            assert!(!output.is_null(i), "slot {i} still null after compaction");
        }
    }

    #[test]
    fn pointer_containment_invariant() {
        let compressor = LzTrieCompressor::new(CompressOptions::default());
        let output = compressor.compress(duplicated_runs()).unwrap();
        for i in 0..output.size() {
            if output.is_absolute_pointer(i) {
                let target = output.distance(i) as usize;
                let len = output.value_code(i) as usize;
                assert!(target + len <= output.size());
                for k in 0..len {
                    assert!(!output.is_null(target + k));
                }
            }
        }
    }

    #[test]
    fn tiny_arrays_pass_through() {
        let mut fast = FastUnitArray::new(2);
        fast.add(Unit::node(0, 0, false, true, 0));
        fast.add(Unit::node(1, 0, true, false, 0));
        let compressor = LzTrieCompressor::new(CompressOptions::default());
        let output = compressor.compress(fast).unwrap();
        assert_eq!(output.size(), 2);
    }

    #[test]
    fn replacement_length_respects_pointer_targets() {
        let fast = duplicated_runs();
        let work = WorkArea::from_fast(&fast);
        // Mark slot 6 as an absolute-pointer target; the match must stop
        // before swallowing it.
        work.set_pointer_target(6);
        let accepted = replacement_length(&work, 2, 5);
        assert_eq!(accepted.length, 1);
    }
}
