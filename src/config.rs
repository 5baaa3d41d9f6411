// config.rs — Compile-time tunables for the compression engine.

/// Longest span of units a single back-pointer may replace.
///
/// Chosen so a physical replacement length always fits in 7 bits when it ends
/// up in the pointer unit's `value_code` after length correction.
pub const MAX_REPLACEMENT_LEN: u32 = 127;

/// Width of one synchronization page in the parallel replacement search.
///
/// A committed replacement span never exceeds [`MAX_REPLACEMENT_LEN`] units,
/// so with pages this wide a span touches at most two adjacent pages.  The
/// compressor asserts `MAX_REPLACEMENT_LEN < SYNC_PAGE_SIZE` at construction.
pub const SYNC_PAGE_SIZE: usize = 5 * MAX_REPLACEMENT_LEN as usize;

/// Upper bound on how many successive suffix-array positions sharing a
/// two-unit prefix are processed as one partition.  A longer run simply
/// starts a new partition with its own canonical occurrence.
pub const MAX_PARTITION_SIZE: usize = 1024;

/// Default worker count for partition-parallel compression: all cores but
/// one, and never less than one.
pub fn default_nb_workers() -> usize {
    std::cmp::max(1, num_cpus::get().saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_holds_a_full_replacement_span() {
        assert!((MAX_REPLACEMENT_LEN as usize) < SYNC_PAGE_SIZE);
    }

    #[test]
    fn at_least_one_worker() {
        assert!(default_nb_workers() >= 1);
    }
}
