//! Static partitioning of the key sequence across worker threads.
//!
//! ```text
//!   keys:        [ 0 ........ c-1 | c ....... 2c-1 | ... | (w-1)c ........ n-1 ]
//!   worker:      [      0         |       1        | ... |        w-1          ]
//!   assignments: [ written by 0   | written by 1   | ... | written by w-1      ]
//! ```
//!
//! `c = n / w`; the last range absorbs the remainder. The assignment vector
//! is split with `split_at_mut` along the same boundaries so each worker owns
//! the output for its own keys. Workers share only the `Inserter`.

use std::ops::Range;
use std::thread;
use std::time::{Duration, Instant};

use crate::{
    error::{PlacementError, Result},
    hash::{KeyHasher, Murmur3},
    insert::{Inserter, Stats},
};

/// Validated parameters for one run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    /// Number of slots in the placement table. At least the number of distinct keys.
    pub table_capacity: usize,
    /// Number of worker threads, at least 1.
    pub threads: usize,
}

#[derive(Clone, Debug)]
pub struct RunReport {
    /// `assignments[i]` is the slot of key `i`.
    pub assignments: Vec<usize>,
    pub stats: Stats,
    /// Wall time from the first worker spawn to the last join.
    pub elapsed: Duration,
}

/// Splits `len` items into `workers` contiguous ranges of `len / workers`,
/// the last range taking the remainder.
pub fn partition(len: usize, workers: usize) -> Vec<Range<usize>> {
    assert!(workers > 0);
    let chunk = len / workers;
    (0..workers)
        .map(|t| {
            let start = t * chunk;
            let end = if t == workers - 1 { len } else { start + chunk };
            start..end
        })
        .collect()
}

/// Runs a full insertion pass with a fresh table and MurmurHash3.
pub fn run(keys: &[&[u8]], config: &RunConfig) -> Result<RunReport> {
    run_with(keys, config, Murmur3)
}

pub fn run_with<H: KeyHasher>(
    keys: &[&[u8]],
    config: &RunConfig,
    hasher: H,
) -> Result<RunReport> {
    let inserter = Inserter::with_hasher(config.table_capacity, hasher);
    run_on(&inserter, keys, config.threads)
}

/// Runs `keys` through `inserter` on `threads` workers and blocks until all
/// of them have finished.
///
/// If any worker runs out of table space it stops its partition; the other
/// workers complete and the first error is returned after the join as
/// [`Error::Placement`](crate::Error::Placement).
pub fn run_on<'a, H: KeyHasher>(
    inserter: &Inserter<'a, H>,
    keys: &[&'a [u8]],
    threads: usize,
) -> Result<RunReport> {
    let ranges = partition(keys.len(), threads);
    let mut assignments = vec![0usize; keys.len()];

    tracing::info!(
        keys = keys.len(),
        threads,
        capacity = inserter.table().capacity(),
        "starting insertion"
    );

    let start = Instant::now();
    let results: Vec<Result<(), PlacementError>> = thread::scope(|s| {
        let mut rest = assignments.as_mut_slice();
        let handles: Vec<_> = ranges
            .iter()
            .enumerate()
            .map(|(worker, range)| {
                let (out, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
                rest = tail;
                let part = &keys[range.clone()];
                let first = range.start;
                s.spawn(move || work(worker, first, inserter, part, out))
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });
    let elapsed = start.elapsed();

    results.into_iter().collect::<Result<(), _>>()?;

    let stats = inserter.stats();
    tracing::info!(
        unique = stats.unique,
        collisions = stats.collisions,
        elapsed_ms = elapsed.as_millis() as u64,
        "insertion finished"
    );

    Ok(RunReport {
        assignments,
        stats,
        elapsed,
    })
}

fn work<'a, H: KeyHasher>(
    worker: usize,
    first: usize,
    inserter: &Inserter<'a, H>,
    keys: &[&'a [u8]],
    out: &mut [usize],
) -> Result<(), PlacementError> {
    let span = tracing::debug_span!("worker", worker, first, keys = keys.len());
    let _enter = span.enter();

    for (&key, slot) in keys.iter().zip(out.iter_mut()) {
        *slot = inserter.insert(key)?.slot;
    }

    tracing::debug!(last = first + keys.len(), "partition done");
    Ok(())
}
