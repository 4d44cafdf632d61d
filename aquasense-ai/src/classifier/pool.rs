//! Bounded pool for CPU-bound inference
//!
//! Jobs run on tokio's blocking threads; a semaphore caps how many run at
//! once so a burst of requests cannot starve the runtime.

use super::InferenceError;
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub struct InferencePool {
    permits: Arc<Semaphore>,
    workers: usize,
}

impl InferencePool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// Pool sized to the machine's available parallelism
    pub fn with_default_size() -> Self {
        Self::new(
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2),
        )
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run a blocking job
    ///
    /// The permit moves into the job, so it stays held until the job finishes
    /// even if the caller stops waiting. A panic in the job surfaces as
    /// [`InferenceError::WorkerFailed`].
    pub async fn run<T, F>(&self, job: F) -> Result<T, InferenceError>
    where
        F: FnOnce() -> Result<T, InferenceError> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| InferenceError::PoolClosed)?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| InferenceError::WorkerFailed(format!("Task join error: {}", e)))?
    }
}
