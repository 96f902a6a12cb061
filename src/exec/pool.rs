// src/exec/pool.rs

//! Bounded worker pool for one execution group.
//!
//! Workers are scoped threads that claim items through a shared atomic
//! cursor. Each item's result lands in its own slot, so results come back in
//! input order regardless of completion order.

use std::num::NonZeroUsize;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use thiserror::Error;
use tracing::{debug, warn};

/// Upper bound for the default pool size.
pub const MAX_DEFAULT_WORKERS: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("failed to start worker threads: {0}")]
    Spawn(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    max_workers: usize,
}

impl WorkerPool {
    /// A pool of at most `max_workers` threads (at least one).
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    /// `min(available parallelism, 32)`.
    pub fn with_default_size() -> Self {
        let cpus = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self::new(cpus.min(MAX_DEFAULT_WORKERS))
    }

    pub fn sequential() -> Self {
        Self::new(1)
    }

    pub fn size(&self) -> usize {
        self.max_workers
    }

    /// A pool whose workers never start.
    #[cfg(test)]
    pub(crate) fn unstartable() -> Self {
        Self { max_workers: 0 }
    }

    /// Apply `work` to every item using up to `size()` threads.
    ///
    /// A slot is `None` only if the worker that claimed it panicked. If some
    /// workers fail to start, the ones that did start drain the queue; the
    /// call fails only when no worker could start.
    pub fn map<T, R, F>(&self, items: &[T], work: F) -> Result<Vec<Option<R>>, PoolError>
    where
        T: Sync,
        R: Send + Sync,
        F: Fn(&T) -> R + Sync,
    {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let workers = self.max_workers.min(items.len());
        let cursor = AtomicUsize::new(0);
        let slots: Vec<OnceLock<R>> = items.iter().map(|_| OnceLock::new()).collect();

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            for id in 0..workers {
                let spawned = thread::Builder::new()
                    .name(format!("wsrun-worker-{id}"))
                    .spawn_scoped(scope, || drain_queue(items, &cursor, &slots, &work));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(err) => {
                        warn!(worker = id, error = %err, "failed to spawn worker thread");
                        break;
                    }
                }
            }

            if handles.is_empty() {
                return Err(PoolError::Spawn(format!(
                    "none of {} worker(s) could be started",
                    workers.max(1)
                )));
            }
            debug!(workers = handles.len(), items = items.len(), "worker pool started");

            for handle in handles {
                if handle.join().is_err() {
                    warn!("worker thread panicked");
                }
            }
            Ok(())
        })?;

        Ok(slots.into_iter().map(OnceLock::into_inner).collect())
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::with_default_size()
    }
}

fn drain_queue<T, R, F>(items: &[T], cursor: &AtomicUsize, slots: &[OnceLock<R>], work: &F)
where
    F: Fn(&T) -> R,
{
    loop {
        let idx = cursor.fetch_add(1, Ordering::Relaxed);
        let Some(item) = items.get(idx) else {
            break;
        };
        let _ = slots[idx].set(work(item));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn results_keep_input_order() {
        let items: Vec<u64> = (0..20).collect();
        let out = WorkerPool::new(4)
            .map(&items, |n| {
                thread::sleep(Duration::from_millis(20 - n));
                n * 2
            })
            .unwrap();
        let out: Vec<u64> = out.into_iter().map(Option::unwrap).collect();
        assert_eq!(out, items.iter().map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn concurrency_never_exceeds_pool_size() {
        let active = AtomicUsize::new(0);
        let peak = Mutex::new(0usize);
        let items: Vec<usize> = (0..16).collect();
        WorkerPool::new(3)
            .map(&items, |_| {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                {
                    let mut p = peak.lock().unwrap();
                    *p = (*p).max(now);
                }
                thread::sleep(Duration::from_millis(10));
                active.fetch_sub(1, Ordering::SeqCst);
            })
            .unwrap();
        let peak = *peak.lock().unwrap();
        assert!(peak <= 3, "peak concurrency {peak}");
        assert!(peak >= 1);
    }

    #[test]
    fn panicking_item_leaves_an_empty_slot() {
        let items = vec![1, 2, 3];
        let out = WorkerPool::sequential()
            .map(&items, |n| {
                if *n == 2 {
                    panic!("boom");
                }
                *n
            })
            .unwrap();
        assert_eq!(out[0], Some(1));
        assert_eq!(out[1], None);
        // The only worker died, so nothing claimed the last item.
        assert_eq!(out[2], None);
    }

    #[test]
    fn unstartable_pool_reports_error() {
        let err = WorkerPool::unstartable().map(&[1, 2], |n| *n).unwrap_err();
        assert!(matches!(err, PoolError::Spawn(_)));
    }

    #[test]
    fn default_size_is_bounded() {
        let pool = WorkerPool::with_default_size();
        assert!(pool.size() >= 1 && pool.size() <= MAX_DEFAULT_WORKERS);
        assert_eq!(WorkerPool::new(0).size(), 1);
    }
}
