//! Process-wide worker pool shared by every deformer.
//!
//! The pool is built lazily on the first `acquire` and torn down when the
//! last handle is dropped. Deformers hold a handle for their whole lifetime.

use std::sync::{Arc, Mutex, Weak};

use meshblur_config::DispatchConfig;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::info;

use crate::error::SmearError;

static SHARED_POOL: Mutex<Weak<ThreadPool>> = Mutex::new(Weak::new());

/// Reference-counted handle to the shared pool.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    pool: Arc<ThreadPool>,
}

impl WorkerPool {
    /// Get a handle to the shared pool, building it if no handle is alive.
    ///
    /// `worker_threads` only takes effect when the pool is built; later
    /// callers share whatever pool already exists.
    pub fn acquire(config: &DispatchConfig) -> Result<Self, SmearError> {
        let mut shared = SHARED_POOL.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(pool) = shared.upgrade() {
            return Ok(Self { pool });
        }

        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("smear-worker-{i}"));
        if let Some(threads) = config.worker_threads {
            builder = builder.num_threads(threads);
        }
        let pool = Arc::new(
            builder
                .build()
                .map_err(|e| SmearError::PoolUnavailable(e.to_string()))?,
        );
        info!(
            "Worker pool created with {} threads",
            pool.current_num_threads()
        );

        *shared = Arc::downgrade(&pool);
        Ok(Self { pool })
    }

    /// Whether any handle to the shared pool is currently alive.
    pub fn live() -> bool {
        let shared = SHARED_POOL.lock().unwrap_or_else(|e| e.into_inner());
        shared.strong_count() > 0
    }

    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` inside the pool, blocking until it returns.
    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    pub fn same_pool(&self, other: &WorkerPool) -> bool {
        Arc::ptr_eq(&self.pool, &other.pool)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Strong count includes this handle
        if Arc::strong_count(&self.pool) == 1 {
            info!("Releasing worker pool");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_share_one_pool() {
        let config = DispatchConfig::default();
        let first = WorkerPool::acquire(&config).unwrap();
        let second = WorkerPool::acquire(&config).unwrap();

        assert!(first.same_pool(&second));
        assert!(WorkerPool::live());
        assert!(first.thread_count() >= 1);
    }

    #[test]
    fn test_install_runs_on_pool() {
        let pool = WorkerPool::acquire(&DispatchConfig::default()).unwrap();
        let sum: u64 = pool.install(|| (1..=10u64).sum());
        assert_eq!(sum, 55);
    }
}
