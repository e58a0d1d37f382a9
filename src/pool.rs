//! Execution pool: a fixed worker set over a shared provider group.

use crate::cancel::CancelToken;
use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::provider::{ProviderGroup, TaskProvider};
use crate::queue::ExecutionQueue;
use crate::stream::ExecutionStream;
use crate::worker::Worker;
use std::sync::Arc;

/// Shared pool state. Queues and streams hold their own reference, so the
/// workers cannot be torn down while any provider is still registered.
pub(crate) struct PoolCore {
    group: Arc<ProviderGroup>,
    workers: Vec<Worker>,
}

impl PoolCore {
    fn new(worker_count: usize) -> Arc<Self> {
        let group = Arc::new(ProviderGroup::new());
        let workers = (0..worker_count)
            .map(|i| {
                let executor: Arc<dyn TaskProvider> = group.clone();
                Worker::new(format!("execpool-worker-{i}"), executor)
            })
            .collect();
        log::debug!("execution pool created with {worker_count} workers");
        Arc::new(PoolCore { group, workers })
    }

    pub(crate) fn add_provider(&self, provider: Arc<dyn TaskProvider>) {
        self.group.add(provider);
    }

    pub(crate) fn remove_provider(&self, provider: &Arc<dyn TaskProvider>) {
        self.group.remove(provider);
    }

    /// Wake one worker; `true` iff some worker claimed the notification.
    ///
    /// Iteration stops at the first claim: a worker that is already
    /// draining will pick up whatever becomes available on its next pull,
    /// so queuing further wakeups is wasted work.
    pub(crate) fn notify_one_worker(&self) -> bool {
        self.workers.iter().any(Worker::notify)
    }

    /// Wake every worker, without short-circuiting.
    pub(crate) fn notify_all_workers(&self) {
        for worker in &self.workers {
            worker.notify();
        }
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for PoolCore {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.shutdown();
        }
        for worker in &self.workers {
            worker.join();
        }
        log::debug!("execution pool shut down");
    }
}

/// Thread-pool-like execution context shared by queues and streams.
///
/// The pool owns its worker threads and a provider group that fairly
/// rotates across every attached queue and stream. Create one pool per
/// process (or per subsystem) and attach as many queues/streams as needed;
/// attaching each to its own pool wastes threads.
///
/// Queues and streams created from a pool keep it alive: worker threads are
/// joined when the pool handle *and* every queue/stream created from it
/// have been dropped.
pub struct ExecutionPool {
    core: Arc<PoolCore>,
}

impl ExecutionPool {
    /// Create a pool with the hardware-derived default worker count
    /// (`max(logical CPUs, 4)`).
    pub fn new() -> Self {
        ExecutionPool {
            core: PoolCore::new(PoolConfig::default().worker_count),
        }
    }

    /// Create a pool with an explicit worker count.
    ///
    /// Fails with [`PoolError::NoWorkers`] for `0` and
    /// [`PoolError::SingleWorker`] for `1`: a single-thread pool offers
    /// nothing over [`ExecutionQueue::standalone_serial`].
    pub fn with_workers(worker_count: usize) -> Result<Self, PoolError> {
        Self::with_config(PoolConfig::with_worker_count(worker_count))
    }

    /// Create a pool from a [`PoolConfig`].
    pub fn with_config(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;
        Ok(ExecutionPool {
            core: PoolCore::new(config.worker_count),
        })
    }

    /// Number of worker threads owned by the pool.
    pub fn worker_count(&self) -> usize {
        self.core.worker_count()
    }

    /// Create a concurrent execution queue attached to this pool.
    ///
    /// Items pushed into the queue start in push order but may run in
    /// parallel across workers; completion order is not guaranteed.
    pub fn concurrent_queue<I, R, F>(&self, executor: F) -> ExecutionQueue<I, R>
    where
        I: Send + 'static,
        R: Send + 'static,
        F: Fn(&CancelToken, I) -> R + Send + Sync + 'static,
    {
        ExecutionQueue::new(Some(self.core.clone()), false, Box::new(executor))
    }

    /// Create a serial execution queue attached to this pool.
    ///
    /// At most one item from this queue runs at any instant, anywhere in
    /// the pool; completion order equals push order.
    pub fn serial_queue<I, R, F>(&self, executor: F) -> ExecutionQueue<I, R>
    where
        I: Send + 'static,
        R: Send + 'static,
        F: Fn(&CancelToken, I) -> R + Send + Sync + 'static,
    {
        ExecutionQueue::new(Some(self.core.clone()), true, Box::new(executor))
    }

    /// Create an execution stream attached to this pool. The stream is
    /// created stopped; call [`ExecutionStream::start`] to begin execution.
    pub fn stream<F>(&self, executee: F) -> ExecutionStream
    where
        F: Fn(&CancelToken) + Send + Sync + 'static,
    {
        ExecutionStream::new(self.core.clone(), Box::new(executee))
    }
}

impl Default for ExecutionPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Pool core with an arbitrary (even unusable) worker count, bypassing
/// config validation. A zero-worker core always reports "no idle worker",
/// which is how the overflow fallback gets exercised deterministically.
#[cfg(test)]
pub(crate) fn test_core(worker_count: usize) -> Arc<PoolCore> {
    PoolCore::new(worker_count)
}
