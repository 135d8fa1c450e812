use std::error::Error as StdError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Mutex, PoisonError};

use jobpool::JobPool;
use priority_queue::PriorityQueue;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use thiserror::Error;

use crate::aggregate::Aggregate;

/// A unit of input handed to exactly one worker.
pub trait Partition: Send + 'static {

    /// Relative cost of mapping this partition.  Schedulers that can choose start the
    /// heaviest partitions first.
    fn weight(&self) -> u64 {
        1
    }
}

impl Partition for String {
    fn weight(&self) -> u64 {
        self.len() as u64
    }
}

impl Partition for &'static str {
    fn weight(&self) -> u64 {
        self.len() as u64
    }
}

impl <A: Send + 'static> Partition for Vec<A> {
    fn weight(&self) -> u64 {
        self.len() as u64
    }
}

/// Why a job produced no result.
#[derive(Debug, Error)]
pub enum JobError<E: StdError + 'static> {

    /// The first error returned by a map function.  Partitions still running when it
    /// arrived are discarded.
    #[error(transparent)]
    Failed(E),

    /// The map function panicked on the given partition.
    #[error("partition {0} panicked")]
    Panicked(usize)
}

/// Runs a map function over every partition and folds the results into one aggregate.
///
/// Implementations guarantee that each partition is mapped exactly once and merged exactly
/// once, that the global aggregate is only mutated by merges, and that either every
/// partition is merged or the job fails as a whole.
pub trait Scheduler {

    /// Maps every partition with `map` and returns the merged aggregate.
    fn compute<P, A, E, F>(&self, partitions: Vec<P>, map: F) -> Result<A, JobError<E>>
        where P: Partition,
              A: Aggregate,
              E: StdError + Send + 'static,
              F: 'static + Send + Sync + Fn(usize, P) -> Result<A, E>;
}

fn run_map<P, A, E, F>(map: &F, idx: usize, part: P) -> Result<A, JobError<E>>
        where E: StdError + 'static,
              F: Fn(usize, P) -> Result<A, E> {
    match panic::catch_unwind(AssertUnwindSafe(|| map(idx, part))) {
        Ok(Ok(partial)) => Ok(partial),
        Ok(Err(e)) => Err(JobError::Failed(e)),
        Err(_) => {
            error!("Partition {} panicked", idx);
            Err(JobError::Panicked(idx))
        }
    }
}

/// Fixed-size worker pool with a single reducer.
///
/// Workers only ever see their own partition and partial aggregate.  Finished partials are
/// sent back over a channel and merged one at a time on the calling thread, so the global
/// aggregate is never shared and needs no lock.  Partitions are dispatched heaviest first.
pub struct PooledScheduler(usize);

impl PooledScheduler {

    /// Creates a scheduler with `n_threads` workers (at least one).
    pub fn new(n_threads: usize) -> Self {
        PooledScheduler(n_threads.max(1))
    }

    /// Number of workers
    pub fn threads(&self) -> usize {
        self.0
    }
}

impl Scheduler for PooledScheduler {

    fn compute<P, A, E, F>(&self, partitions: Vec<P>, map: F) -> Result<A, JobError<E>>
            where P: Partition,
                  A: Aggregate,
                  E: StdError + Send + 'static,
                  F: 'static + Send + Sync + Fn(usize, P) -> Result<A, E> {

        debug!("Number of Partitions: {}, Threads: {}", partitions.len(), self.0);

        let mut queue = PriorityQueue::new();
        let mut pending = Vec::with_capacity(partitions.len());
        for (idx, part) in partitions.into_iter().enumerate() {
            queue.push(idx, part.weight());
            pending.push(Some(part));
        }

        let map = Arc::new(map);
        let mut global = A::default();
        let mut failure = None;
        let mut merged = 0usize;
        {
            let mut pool = JobPool::new(self.0);
            let mut free_threads = self.0;
            let (tx, rx) = mpsc::channel();
            loop {
                // Queue up work for every idle thread
                while free_threads > 0 && failure.is_none() {
                    let idx = match queue.pop() {
                        Some((idx, _weight)) => idx,
                        None => break
                    };
                    if let Some(part) = pending[idx].take() {
                        trace!("Dispatching partition {}", idx);
                        let f = map.clone();
                        let thread_tx = tx.clone();
                        pool.queue(move || {
                            let out = run_map(&*f, idx, part);
                            let _ = thread_tx.send((idx, out));
                        });
                        free_threads -= 1;
                    }
                }

                // Nothing left in flight
                if free_threads == self.0 {
                    break;
                }

                let (idx, out) = match rx.recv() {
                    Ok(msg) => msg,
                    Err(_) => break
                };
                free_threads += 1;
                match out {
                    Ok(partial) => {
                        if failure.is_none() {
                            trace!("Merging partition {}", idx);
                            global.merge(partial);
                            merged += 1;
                        }
                    },
                    Err(e) => {
                        if failure.is_none() {
                            warn!("Partition {} failed, abandoning job", idx);
                            failure = Some(e);
                        }
                    }
                }
            }
            pool.shutdown();
        }

        match failure {
            Some(e) => Err(e),
            None => {
                debug!("Merged {} partitions", merged);
                Ok(global)
            }
        }
    }
}

/// Data-parallel scheduler on rayon.
///
/// Partitions are mapped by rayon workers; each worker then takes the lock on the global
/// aggregate once to merge its partial.  The critical section is entered once per
/// partition, never per record.
pub struct ParallelScheduler {
    pool: Option<ThreadPool>
}

impl ParallelScheduler {

    /// Runs on rayon's global thread pool.
    pub fn new() -> Self {
        ParallelScheduler { pool: None }
    }

    /// Runs on a dedicated pool of `n_threads` threads.
    pub fn with_threads(n_threads: usize) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads.max(1))
            .build()?;
        Ok(ParallelScheduler { pool: Some(pool) })
    }
}

impl Default for ParallelScheduler {
    fn default() -> Self {
        ParallelScheduler::new()
    }
}

impl Scheduler for ParallelScheduler {

    fn compute<P, A, E, F>(&self, partitions: Vec<P>, map: F) -> Result<A, JobError<E>>
            where P: Partition,
                  A: Aggregate,
                  E: StdError + Send + 'static,
                  F: 'static + Send + Sync + Fn(usize, P) -> Result<A, E> {

        debug!("Number of Partitions: {}", partitions.len());

        let global = Mutex::new(A::default());
        let run = || {
            partitions.into_par_iter().enumerate().try_for_each(|(idx, part)| {
                let partial = run_map(&map, idx, part)?;
                trace!("Merging partition {}", idx);
                let mut g = global.lock().unwrap_or_else(PoisonError::into_inner);
                g.merge(partial);
                Ok(())
            })
        };

        match self.pool {
            Some(ref pool) => pool.install(run),
            None => run()
        }?;

        debug!("Finished");
        Ok(global.into_inner().unwrap_or_else(PoisonError::into_inner))
    }
}
