//! Fixed-size worker pool with bounded submission.
//!
//! Backed by `rayon::ThreadPool`; bounded-queue / blocking-submit semantics
//! come from a `crossbeam_channel::bounded` channel used as a semaphore.
//! Jobs return a [`Result`] and the pool remembers the first failure; later
//! jobs still run to completion so the work area is never abandoned half
//! written, and [`WorkerPool::join`] surfaces that first error to the caller.

use crossbeam_channel::{bounded, Receiver, Sender};
use rayon::ThreadPool as RayonPool;
use std::sync::{Arc, Condvar, Mutex};

use crate::error::{Error, Result};

struct PoolState {
    /// Submitted but not yet finished jobs.
    pending: usize,
    /// First failure reported by any job.
    first_error: Option<Error>,
}

/// Bounded-submission worker pool.
pub struct WorkerPool {
    pool: Arc<RayonPool>,
    /// Pre-filled token channel: a token is a free queue slot.  Submitters
    /// take one before spawning; workers return it when done.
    slot_tx: Sender<()>,
    slot_rx: Receiver<()>,
    state: Arc<(Mutex<PoolState>, Condvar)>,
}

impl WorkerPool {
    /// Build a pool of `nb_threads` workers accepting up to `queue_size`
    /// queued jobs beyond the ones executing.
    pub fn new(nb_threads: usize, queue_size: usize) -> Result<Self> {
        if nb_threads < 1 || queue_size < 1 {
            return Err(Error::CompressionInternal(
                "worker pool needs at least one thread and one queue slot".into(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(nb_threads)
            .build()
            .map_err(|e| Error::CompressionInternal(format!("worker pool start failed: {e}")))?;

        let capacity = queue_size + nb_threads;
        let (slot_tx, slot_rx) = bounded(capacity);
        for _ in 0..capacity {
            slot_tx
                .send(())
                .map_err(|_| Error::CompressionInternal("slot channel closed".into()))?;
        }

        Ok(WorkerPool {
            pool: Arc::new(pool),
            slot_tx,
            slot_rx,
            state: Arc::new((
                Mutex::new(PoolState {
                    pending: 0,
                    first_error: None,
                }),
                Condvar::new(),
            )),
        })
    }

    /// Submit a job, blocking while the queue is full.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.slot_rx.recv().expect("worker pool slot channel closed");

        {
            let (lock, _cvar) = &*self.state;
            let mut state = lock.lock().expect("worker pool state poisoned");
            state.pending += 1;
        }

        let state = Arc::clone(&self.state);
        let slot_tx = self.slot_tx.clone();
        self.pool.spawn(move || {
            let outcome = job();

            let (lock, cvar) = &*state;
            let mut state = lock.lock().expect("worker pool state poisoned");
            if let Err(error) = outcome {
                state.first_error.get_or_insert(error);
            }
            state.pending -= 1;
            if state.pending == 0 {
                cvar.notify_all();
            }
            let _ = slot_tx.send(());
        });
    }

    /// Block until every submitted job has finished, then return the first
    /// failure, if any.  The pool accepts further jobs afterwards.
    pub fn join(&self) -> Result<()> {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().expect("worker pool state poisoned");
        while state.pending > 0 {
            state = cvar.wait(state).expect("worker pool state poisoned");
        }
        match state.first_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Make sure no job is still running before the rayon pool joins its
        // workers; any late error is dropped with the pool.
        let _ = self.join();
    }
}
