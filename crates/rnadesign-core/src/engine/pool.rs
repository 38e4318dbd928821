//! Bounded scatter/gather execution with sequential fallback.

use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Number of workers used when none is configured: available cores minus one, at least one.
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1).max(1))
        .unwrap_or(1)
}

/// Executes independent, stateless work items and gathers results in input order.
///
/// Building the underlying worker pool may fail; in that case, and whenever a parallel
/// map panics, the same work is executed sequentially on the calling thread.
pub struct TaskPool {
    threads: usize,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl TaskPool {
    pub fn new(threads: Option<usize>) -> Self {
        let threads = threads.unwrap_or_else(default_threads).max(1);

        #[cfg(feature = "parallel")]
        {
            let pool = if threads > 1 {
                match rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("rnadesign-worker-{i}"))
                    .build()
                {
                    Ok(pool) => Some(pool),
                    Err(e) => {
                        warn!(error = %e, "Failed to create worker pool; running sequentially.");
                        None
                    }
                }
            } else {
                None
            };
            debug!(threads, parallel = pool.is_some(), "Task pool ready.");
            Self { threads, pool }
        }

        #[cfg(not(feature = "parallel"))]
        {
            debug!(threads, "Task pool ready (sequential build).");
            Self { threads }
        }
    }

    pub fn sequential() -> Self {
        Self::new(Some(1))
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn is_parallel(&self) -> bool {
        #[cfg(feature = "parallel")]
        {
            self.pool.is_some()
        }
        #[cfg(not(feature = "parallel"))]
        {
            false
        }
    }

    /// Applies `f` to every item. `result[i]` always corresponds to `items[i]`.
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        if let Some(pool) = &self.pool {
            let attempt = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                pool.install(|| items.par_iter().map(&f).collect::<Vec<R>>())
            }));
            match attempt {
                Ok(results) => return results,
                Err(_) => {
                    warn!(
                        items = items.len(),
                        "Parallel execution failed; re-running sequentially."
                    );
                }
            }
        }

        items.iter().map(f).collect()
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threads_is_at_least_one() {
        assert!(default_threads() >= 1);
    }

    #[test]
    fn map_preserves_input_order() {
        let pool = TaskPool::new(Some(4));
        let items: Vec<u64> = (0..200).collect();
        let out = pool.map(&items, |x| x * 2);
        assert_eq!(out, items.iter().map(|x| x * 2).collect::<Vec<_>>());
    }

    #[test]
    fn sequential_pool_runs_on_caller() {
        let pool = TaskPool::sequential();
        assert!(!pool.is_parallel());
        assert_eq!(pool.threads(), 1);
        assert_eq!(pool.map(&[1, 2, 3], |x| x + 1), vec![2, 3, 4]);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn panicking_parallel_map_falls_back_to_sequential() {
        let pool = TaskPool::new(Some(2));
        assert!(pool.is_parallel());
        let out = pool.map(&[1, 2, 3], |x| {
            if rayon::current_thread_index().is_some() {
                panic!("worker failure");
            }
            x * 10
        });
        assert_eq!(out, vec![10, 20, 30]);
    }
}
