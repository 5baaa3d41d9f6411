//! Partition-parallel replacement search.
//!
//! Distinct partitions never share candidates, but their rewrites can touch
//! neighbouring slots.  Every commit therefore takes the page locks covering
//! both the candidate span and the canonical span — up to four pages, always
//! acquired in ascending order so two workers can never deadlock — and
//! repeats the match walk under the locks before writing.  A span never
//! straddles more than two pages because its physical width is capped below
//! the page size.

use std::sync::{Mutex, MutexGuard};

#[cfg(feature = "parallel")]
use std::ops::Range;
#[cfg(feature = "parallel")]
use std::sync::Arc;

#[cfg(feature = "parallel")]
use crate::compress::work::WorkArea;
use crate::config::SYNC_PAGE_SIZE;
use crate::error::{Error, Result};

/// One lock per [`SYNC_PAGE_SIZE`] unit positions.
pub(crate) struct PageLocks {
    locks: Vec<Mutex<()>>,
}

impl PageLocks {
    pub fn new(units: usize) -> Self {
        let pages = units / SYNC_PAGE_SIZE + 2;
        PageLocks {
            locks: (0..pages).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Lock the pages a commit at `candidate` against `canonical` can touch.
    ///
    /// Each span covers at most two adjacent pages; the four page indexes are
    /// deduplicated and locked in ascending order.
    pub fn acquire(&self, canonical: usize, candidate: usize) -> Result<Vec<MutexGuard<'_, ()>>> {
        let mut pages = [
            canonical / SYNC_PAGE_SIZE,
            canonical / SYNC_PAGE_SIZE + 1,
            candidate / SYNC_PAGE_SIZE,
            candidate / SYNC_PAGE_SIZE + 1,
        ];
        pages.sort_unstable();
        let mut guards = Vec::with_capacity(pages.len());
        let mut previous = usize::MAX;
        for &page in &pages {
            if page == previous {
                continue;
            }
            previous = page;
            let guard = self.locks[page]
                .lock()
                .map_err(|_| Error::CompressionInternal("page lock poisoned".into()))?;
            guards.push(guard);
        }
        Ok(guards)
    }
}

/// Run every partition on a bounded worker pool.
///
/// A failed partition flips the abort flag — remaining partitions still run
/// (they check the flag between candidates and fall through quickly) and the
/// first error is what the caller sees.
#[cfg(feature = "parallel")]
pub(crate) fn run_partitions(
    work: &Arc<WorkArea>,
    locks: &Arc<PageLocks>,
    suffix_array: &Arc<Vec<u32>>,
    partitions: Vec<Range<usize>>,
    nb_workers: usize,
) -> Result<()> {
    use std::sync::atomic::{AtomicBool, Ordering::Relaxed};

    use crate::threadpool::WorkerPool;

    let pool = WorkerPool::new(nb_workers, nb_workers * 4)?;
    let abort = Arc::new(AtomicBool::new(false));
    for range in partitions {
        let work = Arc::clone(work);
        let locks = Arc::clone(locks);
        let suffix_array = Arc::clone(suffix_array);
        let abort = Arc::clone(&abort);
        pool.submit(move || {
            let outcome =
                super::compressor::process_partition(&work, &locks, &suffix_array, range, &abort);
            if outcome.is_err() {
                abort.store(true, Relaxed);
            }
            outcome
        });
    }
    pool.join()
}
