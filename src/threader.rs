//! Worker pool, progress counters and cooperative cancellation.

use crate::enums::Threading;

use log::trace;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Runs the partitions of one stage on a fixed-size pool and blocks until
/// all of them are done.
pub struct MultiThreader {
    pool: ThreadPool,
    workers: usize,
}

impl fmt::Debug for MultiThreader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiThreader")
            .field("workers", &self.workers)
            .finish()
    }
}

impl MultiThreader {
    pub fn new(workers: usize) -> Result<Self, ThreadPoolBuildError> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("volume-pipeline-{i}"))
            .build()?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Calls `job` once per partition, handing it the partition by value,
    /// and returns the results in partition order. Single-threaded filters
    /// run on the calling thread. The first error wins; partitions that
    /// have not started yet are skipped.
    pub fn execute<P, R, E, F>(&self, threading: Threading, partitions: Vec<P>, job: F) -> Result<Vec<R>, E>
    where
        P: Send,
        R: Send,
        E: Send,
        F: Fn(usize, P) -> Result<R, E> + Sync,
    {
        match threading {
            Threading::SingleThreaded => partitions
                .into_iter()
                .enumerate()
                .map(|(i, p)| job(i, p))
                .collect(),
            Threading::Parallel => self.pool.install(|| {
                partitions
                    .into_par_iter()
                    .enumerate()
                    .map(|(i, p)| {
                        trace!("partition {i} on {:?}", rayon::current_thread_index());
                        job(i, p)
                    })
                    .collect()
            }),
        }
    }
}

/// Cloneable cancellation flag shared between the pipeline and whoever
/// wants to stop it.
#[derive(Clone, Debug, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Snapshot posted to a progress observer.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressEvent {
    pub stage: String,
    pub completed: u64,
    pub total: u64,
}

impl ProgressEvent {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.completed as f64 / self.total as f64).min(1.0)
        }
    }
}

pub type ProgressObserver = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Append-only pixel counter for one stage execution.
pub struct ProgressTracker {
    stage: String,
    total: u64,
    completed: AtomicU64,
    observer: Option<ProgressObserver>,
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("stage", &self.stage)
            .field("total", &self.total)
            .field("completed", &self.completed)
            .finish()
    }
}

impl ProgressTracker {
    pub fn new(stage: impl Into<String>, total: u64, observer: Option<ProgressObserver>) -> Self {
        Self {
            stage: stage.into(),
            total,
            completed: AtomicU64::new(0),
            observer,
        }
    }

    /// Adds `pixels` to the counter and notifies the observer.
    pub fn add(&self, pixels: u64) {
        let completed = self.completed.fetch_add(pixels, Ordering::Relaxed) + pixels;
        if let Some(observer) = &self.observer {
            observer(&ProgressEvent {
                stage: self.stage.clone(),
                completed,
                total: self.total,
            });
        }
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn results_come_back_in_partition_order() {
        let threader = MultiThreader::new(4).unwrap();
        let parts: Vec<usize> = (0..32).collect();
        let out: Result<Vec<usize>, ()> = threader.execute(Threading::Parallel, parts, |i, p| Ok(i * 100 + p));
        assert_eq!(out.unwrap(), (0..32).map(|i| i * 101).collect::<Vec<_>>());
    }

    #[test]
    fn single_threaded_runs_on_caller() {
        let threader = MultiThreader::new(4).unwrap();
        let caller = std::thread::current().id();
        let parts = vec![(); 5];
        let out: Result<Vec<bool>, ()> = threader.execute(Threading::SingleThreaded, parts, |_, _| {
            Ok(std::thread::current().id() == caller)
        });
        assert!(out.unwrap().into_iter().all(|same| same));
    }

    #[test]
    fn errors_are_propagated() {
        let threader = MultiThreader::new(2).unwrap();
        let parts = vec![1, 2, 3];
        let out = threader.execute(Threading::Parallel, parts, |_, p| if p == 2 { Err("boom") } else { Ok(p) });
        assert_eq!(out, Err("boom"));
    }

    #[test]
    fn progress_counts_are_monotonic_and_complete() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let observer: ProgressObserver = Arc::new(move |e: &ProgressEvent| sink.lock().unwrap().push(e.completed));
        let tracker = ProgressTracker::new("stage", 40, Some(observer));
        let threader = MultiThreader::new(4).unwrap();
        let parts = vec![10u64; 4];
        threader
            .execute::<_, _, (), _>(Threading::Parallel, parts, |_, n| {
                tracker.add(n);
                Ok(())
            })
            .unwrap();
        assert_eq!(tracker.completed(), 40);
        let mut seen = events.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec![10, 20, 30, 40]);
    }

    #[test]
    fn abort_flag_is_shared_between_clones() {
        let handle = AbortHandle::new();
        let other = handle.clone();
        other.abort();
        assert!(handle.is_aborted());
        handle.reset();
        assert!(!other.is_aborted());
    }
}
