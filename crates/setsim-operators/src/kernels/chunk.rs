//! Worker pool and chunking policy shared by all kernels.

use std::ops::Range;
use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use setsim_core::config::EngineConfig;

/// How a kernel call spreads work across threads.
///
/// `workers <= 1` runs everything on the calling thread. Otherwise work runs
/// inside `pool` (or the global rayon pool when `pool` is `None`).
#[derive(Clone)]
pub struct Parallelism {
    pool: Option<Arc<ThreadPool>>,
    workers: usize,
    chunks_per_worker: usize,
    sum_chunk_rows: usize,
}

impl std::fmt::Debug for Parallelism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parallelism")
            .field("workers", &self.workers)
            .field("dedicated_pool", &self.pool.is_some())
            .field("chunks_per_worker", &self.chunks_per_worker)
            .field("sum_chunk_rows", &self.sum_chunk_rows)
            .finish()
    }
}

const DEFAULT_CHUNKS_PER_WORKER: usize = 4;
const DEFAULT_SUM_CHUNK_ROWS: usize = 4096;

fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Parallelism {
    /// Dedicated pool of `workers` threads; `0` means one per core.
    ///
    /// If the pool cannot be built the kernels fall back to one thread.
    pub fn new(workers: usize) -> Self {
        let workers = if workers == 0 {
            available_workers()
        } else {
            workers
        };
        if workers <= 1 {
            return Self::sequential();
        }
        match ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("setsim-worker-{i}"))
            .build()
        {
            Ok(pool) => Self {
                pool: Some(Arc::new(pool)),
                workers,
                chunks_per_worker: DEFAULT_CHUNKS_PER_WORKER,
                sum_chunk_rows: DEFAULT_SUM_CHUNK_ROWS,
            },
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_err, workers, "thread pool build failed; running sequentially");
                Self::sequential()
            }
        }
    }

    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self::new(cfg.max_parallel_tasks)
            .with_chunks_per_worker(cfg.chunks_per_worker)
            .with_sum_chunk_rows(cfg.sum_chunk_rows)
    }

    pub fn sequential() -> Self {
        Self {
            pool: None,
            workers: 1,
            chunks_per_worker: DEFAULT_CHUNKS_PER_WORKER,
            sum_chunk_rows: DEFAULT_SUM_CHUNK_ROWS,
        }
    }

    pub fn with_chunks_per_worker(mut self, n: usize) -> Self {
        self.chunks_per_worker = n.max(1);
        self
    }

    pub fn with_sum_chunk_rows(mut self, n: usize) -> Self {
        self.sum_chunk_rows = n.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn sum_chunk_rows(&self) -> usize {
        self.sum_chunk_rows
    }

    /// Row chunk length for the Jaccard kernel.
    pub fn jaccard_chunk_len(&self, rows: usize) -> usize {
        let chunks = self.workers.saturating_mul(self.chunks_per_worker).max(1);
        rows.div_ceil(chunks).max(1)
    }

    /// Run `f` inside the configured pool.
    pub fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }

    /// Hand matching disjoint `chunk_len` slices of `a` and `b` to
    /// `f(start_row, a_slice, b_slice)`. Both buffers must have equal length.
    pub fn for_each_chunk_pair_mut<A, B, F>(&self, a: &mut [A], b: &mut [B], chunk_len: usize, f: F)
    where
        A: Send,
        B: Send,
        F: Fn(usize, &mut [A], &mut [B]) + Send + Sync,
    {
        debug_assert_eq!(a.len(), b.len());
        let chunk_len = chunk_len.max(1);
        if self.workers <= 1 {
            for (i, (ca, cb)) in a.chunks_mut(chunk_len).zip(b.chunks_mut(chunk_len)).enumerate() {
                f(i * chunk_len, ca, cb);
            }
            return;
        }
        self.install(|| {
            a.par_chunks_mut(chunk_len)
                .zip(b.par_chunks_mut(chunk_len))
                .enumerate()
                .for_each(|(i, (ca, cb))| f(i * chunk_len, ca, cb));
        });
    }

    /// Map each `chunk_len` row range of `0..len` through `f`. Results come
    /// back in range order whatever the worker count.
    pub fn map_chunks<R, F>(&self, len: usize, chunk_len: usize, f: F) -> Vec<R>
    where
        R: Send,
        F: Fn(Range<usize>) -> R + Send + Sync,
    {
        let chunk_len = chunk_len.max(1);
        let ranges: Vec<Range<usize>> = (0..len)
            .step_by(chunk_len)
            .map(|start| start..(start + chunk_len).min(len))
            .collect();
        if self.workers <= 1 {
            return ranges.into_iter().map(f).collect();
        }
        self.install(|| ranges.into_par_iter().map(f).collect())
    }
}

impl Default for Parallelism {
    /// Global rayon pool sized by rayon itself.
    fn default() -> Self {
        Self {
            pool: None,
            workers: rayon::current_num_threads(),
            chunks_per_worker: DEFAULT_CHUNKS_PER_WORKER,
            sum_chunk_rows: DEFAULT_SUM_CHUNK_ROWS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_len_never_zero() {
        let p = Parallelism::sequential();
        assert_eq!(p.jaccard_chunk_len(0), 1);
        assert_eq!(p.jaccard_chunk_len(10), 3);
    }

    #[test]
    fn map_chunks_preserves_order() {
        let p = Parallelism::new(4);
        let starts = p.map_chunks(10, 3, |r| r.start);
        assert_eq!(starts, vec![0, 3, 6, 9]);
    }

    #[test]
    fn chunk_pairs_cover_every_slot() {
        let p = Parallelism::new(3);
        let mut rows = vec![0usize; 17];
        let mut even = vec![false; 17];
        p.for_each_chunk_pair_mut(&mut rows, &mut even, 4, |start, ra, eb| {
            assert_eq!(ra.len(), eb.len());
            for (k, (r, e)) in ra.iter_mut().zip(eb.iter_mut()).enumerate() {
                *r = start + k;
                *e = (start + k) % 2 == 0;
            }
        });
        assert_eq!(rows, (0..17).collect::<Vec<_>>());
        assert_eq!(even, (0..17).map(|i| i % 2 == 0).collect::<Vec<_>>());
    }
}
