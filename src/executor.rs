//! Bounded task executors.
//!
//! Both implementations run each task in isolation and hand results back in
//! completion order. A task that panics is logged and produces no result;
//! its siblings keep running.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc;

use thiserror::Error;
use tokio::task::JoinSet;
use tracing::error;

pub type Task<T> = Box<dyn FnOnce() -> T + Send + 'static>;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("worker pool needs at least one worker")]
    NoWorkers,

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to build runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

pub trait TaskExecutor: Sized {
    /// Create a pool running at most `workers` tasks at once.
    fn with_workers(workers: usize) -> Result<Self, ExecutorError>;

    /// Run every task, calling `on_complete` as each one finishes.
    fn run_all<T, F>(&self, tasks: Vec<Task<T>>, on_complete: F)
    where
        T: Send + 'static,
        F: FnMut(T);
}

pub struct RayonExecutor {
    pool: rayon::ThreadPool,
}

impl TaskExecutor for RayonExecutor {
    fn with_workers(workers: usize) -> Result<Self, ExecutorError> {
        if workers == 0 {
            return Err(ExecutorError::NoWorkers);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("radiomics-worker-{i}"))
            .build()?;
        Ok(Self { pool })
    }

    fn run_all<T, F>(&self, tasks: Vec<Task<T>>, mut on_complete: F)
    where
        T: Send + 'static,
        F: FnMut(T),
    {
        let (tx, rx) = mpsc::channel();
        for task in tasks {
            let tx = tx.clone();
            self.pool.spawn(move || match catch_unwind(AssertUnwindSafe(task)) {
                Ok(result) => {
                    // The receiver only hangs up once every sender is gone.
                    let _ = tx.send(result);
                }
                Err(_) => error!("Extraction task panicked"),
            });
        }
        drop(tx);

        for result in rx {
            on_complete(result);
        }
    }
}

pub struct TokioExecutor {
    runtime: tokio::runtime::Runtime,
}

impl TaskExecutor for TokioExecutor {
    fn with_workers(workers: usize) -> Result<Self, ExecutorError> {
        if workers == 0 {
            return Err(ExecutorError::NoWorkers);
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .max_blocking_threads(workers)
            .thread_name("radiomics-worker")
            .build()?;
        Ok(Self { runtime })
    }

    fn run_all<T, F>(&self, tasks: Vec<Task<T>>, mut on_complete: F)
    where
        T: Send + 'static,
        F: FnMut(T),
    {
        self.runtime.block_on(async {
            let mut set = JoinSet::new();
            for task in tasks {
                set.spawn_blocking(task);
            }
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(result) => on_complete(result),
                    Err(err) => error!(error = %err, "Extraction task panicked"),
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn tasks(count: usize) -> Vec<Task<usize>> {
        (0..count)
            .map(|i| Box::new(move || i) as Task<usize>)
            .collect()
    }

    fn peak_concurrency<E: TaskExecutor>(workers: usize) -> usize {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<Task<()>> = (0..12)
            .map(|_| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                Box::new(move || {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(10));
                    active.fetch_sub(1, Ordering::SeqCst);
                }) as Task<()>
            })
            .collect();

        E::with_workers(workers).unwrap().run_all(tasks, |_| {});
        peak.load(Ordering::SeqCst)
    }

    #[test]
    fn rayon_delivers_every_result() {
        let mut seen = Vec::new();
        RayonExecutor::with_workers(3)
            .unwrap()
            .run_all(tasks(10), |i| seen.push(i));
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn tokio_delivers_every_result() {
        let mut seen = Vec::new();
        TokioExecutor::with_workers(3)
            .unwrap()
            .run_all(tasks(10), |i| seen.push(i));
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn concurrency_never_exceeds_worker_count() {
        assert!(peak_concurrency::<RayonExecutor>(2) <= 2);
        assert!(peak_concurrency::<TokioExecutor>(2) <= 2);
    }

    #[test]
    fn panicking_task_does_not_stop_siblings() {
        let mut work = tasks(4);
        work.push(Box::new(|| panic!("backend exploded")));

        let mut rayon_seen = 0;
        RayonExecutor::with_workers(2)
            .unwrap()
            .run_all(work, |_| rayon_seen += 1);
        assert_eq!(rayon_seen, 4);

        let mut work = tasks(4);
        work.push(Box::new(|| panic!("backend exploded")));
        let mut tokio_seen = 0;
        TokioExecutor::with_workers(2)
            .unwrap()
            .run_all(work, |_| tokio_seen += 1);
        assert_eq!(tokio_seen, 4);
    }

    #[test]
    fn zero_workers_is_rejected() {
        assert!(matches!(
            RayonExecutor::with_workers(0),
            Err(ExecutorError::NoWorkers)
        ));
        assert!(matches!(
            TokioExecutor::with_workers(0),
            Err(ExecutorError::NoWorkers)
        ));
    }
}
