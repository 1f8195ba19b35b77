use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;

/// Number of uploads processed concurrently. Fixed for the process lifetime.
pub const WORKER_COUNT: usize = 2;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker pool is closed")]
    Closed,

    #[error("worker task failed: {0}")]
    Failed(String),
}

/// Fixed-size pool for per-upload jobs. Each job runs on its own task once it holds a slot,
/// so slow model calls and their backoff sleeps never run on the request handler.
#[derive(Clone)]
pub struct WorkerPool {
    slots: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Waits for a free slot, then runs `job` to completion on a spawned task.
    pub async fn run<F, T>(&self, job: F) -> Result<T, WorkerError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let slot = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| WorkerError::Closed)?;

        let handle = tokio::spawn(async move {
            let _slot = slot;
            job.await
        });

        handle.await.map_err(|e| WorkerError::Failed(e.to_string()))
    }

    /// Stops accepting new jobs. Jobs already holding a slot finish normally.
    pub fn close(&self) {
        self.slots.close();
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(WORKER_COUNT)
    }
}
