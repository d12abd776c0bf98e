//! Bounded worker pool for blocking conversion jobs.
//!
//! The pool is an explicit handle: the caller creates it, hands it to the
//! pipeline and shuts it down when the run ends, whatever the outcome. At
//! most `workers` jobs run at once; each job runs on tokio's blocking
//! thread pool.
//!
//! After a job fails, jobs that have not started are skipped and
//! [`WorkerPool::run_all`] waits for the running ones before it returns the
//! error. Blocking work cannot be cancelled midway, so once `run_all`
//! returns, no job of that call is still writing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::error::{ConvertError, PoolError};

/// Default number of concurrent conversion jobs.
pub const DEFAULT_WORKERS: usize = 1;

/// A bounded pool of blocking workers.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    /// Create a pool running at most `workers` jobs concurrently.
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            workers,
            permits: Arc::new(Semaphore::new(workers)),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Stop accepting jobs. Jobs already running finish normally.
    pub fn shutdown(&self) {
        if !self.permits.is_closed() {
            debug!("Shutting down worker pool ({} workers)", self.workers);
            self.permits.close();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.permits.is_closed()
    }

    /// Run every job and wait for all of them.
    ///
    /// Results come back in submission order. The first failing job stops
    /// the jobs that have not started yet; its error is returned once every
    /// started job has finished.
    pub async fn run_all<T, F>(&self, jobs: Vec<F>) -> Result<Vec<T>, ConvertError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, ConvertError> + Send + 'static,
    {
        if self.is_shut_down() {
            return Err(PoolError::Closed.into());
        }

        let total = jobs.len();
        let failed = Arc::new(AtomicBool::new(false));
        let mut set = JoinSet::new();
        for (index, job) in jobs.into_iter().enumerate() {
            let permits = Arc::clone(&self.permits);
            let failed = Arc::clone(&failed);
            set.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|_| PoolError::Closed)?;
                if failed.load(Ordering::SeqCst) {
                    return Ok(None);
                }
                let outcome = tokio::task::spawn_blocking(job)
                    .await
                    .map_err(|e| PoolError::Join(e.to_string()))?;
                match outcome {
                    Ok(value) => Ok::<_, ConvertError>(Some((index, value))),
                    Err(e) => {
                        failed.store(true, Ordering::SeqCst);
                        Err(e)
                    }
                }
            });
        }

        let mut results: Vec<Option<T>> = (0..total).map(|_| None).collect();
        let mut first_error: Option<ConvertError> = None;
        while let Some(joined) = set.join_next().await {
            let outcome = joined
                .map_err(|e| ConvertError::from(PoolError::Join(e.to_string())))
                .and_then(|outcome| outcome);
            match outcome {
                Ok(Some((index, value))) => results[index] = Some(value),
                Ok(None) => {}
                Err(e) => {
                    failed.store(true, Ordering::SeqCst);
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            debug!("Worker pool run failed: {}", e);
            return Err(e);
        }
        Ok(results.into_iter().flatten().collect())
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}
