//! FIFO execution queue, serial or concurrent.

use crate::cancel::{CancelSource, CancelToken};
use crate::error::TaskError;
use crate::handle::{self, TaskHandle, TaskPromise};
use crate::pool::PoolCore;
use crate::provider::{TaskProvider, WeakProvider};
use crate::task::Task;
use crate::worker::Worker;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

type ExecutorFn<I, R> = Box<dyn Fn(&CancelToken, I) -> R + Send + Sync>;

struct QueueRecord<I, R> {
    item: I,
    promise: TaskPromise<R>,
    token: CancelToken,
}

struct QueueState<I, R> {
    fifo: VecDeque<QueueRecord<I, R>>,
    /// Tasks emitted by `next_task` that have not yet finished running.
    running: usize,
}

struct QueueCore<I, R> {
    serial: bool,
    /// Fast-path emptiness hint. Authoritative state is the FIFO under the
    /// lock; every `true` observed here is re-checked there.
    has_task: AtomicBool,
    state: Mutex<QueueState<I, R>>,
    drained: Condvar,
    cancel: CancelSource,
    pool: Option<Arc<PoolCore>>,
    overflow: Worker,
    executor: ExecutorFn<I, R>,
    self_ref: Weak<QueueCore<I, R>>,
}

impl<I, R> QueueCore<I, R> {
    /// Wake a worker for newly available work: one pool worker if any is
    /// idle, otherwise the queue's own overflow worker.
    fn notify_workers(&self) {
        let pool_notified = match &self.pool {
            Some(pool) => pool.notify_one_worker(),
            None => false,
        };
        if !pool_notified {
            self.overflow.notify();
        }
    }

    /// Run one queued record. Executes on whichever worker pulled the task.
    fn run_one(&self) {
        let record = {
            let mut state = self.state.lock();
            let record = state.fifo.pop_front();
            if state.fifo.is_empty() {
                self.has_task.store(false, Ordering::Release);
            }
            record
        };

        // The pop can come up empty: when two workers observe the same
        // record at pull time, the earlier runner takes it.
        if let Some(record) = record {
            let QueueRecord {
                item,
                promise,
                token,
            } = record;
            match panic::catch_unwind(AssertUnwindSafe(|| (self.executor)(&token, item))) {
                Ok(value) => promise.fulfill(value),
                Err(payload) => {
                    log::error!("queue executor panicked; failing the task's result handle");
                    promise.fail(TaskError::from_panic(payload));
                }
            }
        }

        let (has_more, drained) = {
            let mut state = self.state.lock();
            state.running -= 1;
            let has_more = !state.fifo.is_empty();
            (has_more, state.running == 0 && !has_more)
        };

        if self.serial && has_more {
            // A serial queue suppresses wakeups while a task is in flight;
            // schedule the next step now that this one is done.
            self.notify_workers();
        } else if drained {
            self.drained.notify_all();
        }
    }

    fn wait_drained(&self) {
        let mut state = self.state.lock();
        while state.running > 0 || !state.fifo.is_empty() {
            self.drained.wait(&mut state);
        }
    }
}

impl<I, R> TaskProvider for QueueCore<I, R>
where
    I: Send + 'static,
    R: Send + 'static,
{
    fn next_task(&self) -> Option<Task> {
        if !self.has_task.load(Ordering::Acquire) {
            return None;
        }
        let core = self.self_ref.upgrade()?;
        {
            let mut state = self.state.lock();
            if state.fifo.is_empty() {
                self.has_task.store(false, Ordering::Release);
                return None;
            }
            if self.serial && state.running > 0 {
                // At most one task from a serial queue in flight, anywhere.
                return None;
            }
            state.running += 1;
        }
        Some(Task::new(move || core.run_one()))
    }
}

/// FIFO queue of user items processed by a fixed executor callback.
///
/// Created from an [`ExecutionPool`] (serial or concurrent), or standalone
/// via [`standalone_serial`](Self::standalone_serial). Items are submitted
/// with [`push`](Self::push), which returns a [`TaskHandle`] for the item's
/// eventual result.
///
/// Ordering guarantees:
/// - serial queue: completion order equals push order;
/// - concurrent queue: start order equals push order, completion order is
///   unspecified.
///
/// Dropping the queue cancels every outstanding token, blocks until all
/// pending and in-flight items have finished, then detaches from the pool.
///
/// [`ExecutionPool`]: crate::ExecutionPool
pub struct ExecutionQueue<I, R> {
    core: Arc<QueueCore<I, R>>,
    /// The provider handle registered with the pool, kept for removal by
    /// identity on drop.
    registration: Option<Arc<dyn TaskProvider>>,
}

impl<I, R> ExecutionQueue<I, R>
where
    I: Send + 'static,
    R: Send + 'static,
{
    pub(crate) fn new(
        pool: Option<Arc<PoolCore>>,
        serial: bool,
        executor: ExecutorFn<I, R>,
    ) -> Self {
        let worker_name = if serial {
            "execpool-serial-queue"
        } else {
            "execpool-concurrent-queue"
        };
        let core = Arc::new_cyclic(|weak: &Weak<QueueCore<I, R>>| {
            let overflow_source: Arc<dyn TaskProvider> = Arc::new(WeakProvider(weak.clone()));
            QueueCore {
                serial,
                has_task: AtomicBool::new(false),
                state: Mutex::new(QueueState {
                    fifo: VecDeque::new(),
                    running: 0,
                }),
                drained: Condvar::new(),
                cancel: CancelSource::new(),
                pool,
                overflow: Worker::new(worker_name.to_string(), overflow_source),
                executor,
                self_ref: weak.clone(),
            }
        });

        let registration = core.pool.as_ref().map(|pool| {
            let provider: Arc<dyn TaskProvider> = core.clone();
            pool.add_provider(provider.clone());
            provider
        });

        ExecutionQueue { core, registration }
    }

    /// Create a serial queue that does not use a pool: every item runs on
    /// the queue's own dedicated thread. Suitable for long-running tasks
    /// that would otherwise hog pool workers.
    pub fn standalone_serial<F>(executor: F) -> Self
    where
        F: Fn(&CancelToken, I) -> R + Send + Sync + 'static,
    {
        ExecutionQueue::new(None, true, Box::new(executor))
    }

    /// Append an item to the queue. Non-blocking and unbounded.
    ///
    /// The returned handle resolves to the executor's result for this item;
    /// it is safe to discard if the result is not needed.
    pub fn push(&self, item: I) -> TaskHandle<R> {
        let (promise, handle) = handle::channel();
        let token = self.core.cancel.token();

        let had_task;
        {
            let mut state = self.core.state.lock();
            had_task = self.core.has_task.load(Ordering::Relaxed);
            state.fifo.push_back(QueueRecord {
                item,
                promise,
                token,
            });
            self.core.has_task.store(true, Ordering::Release);
        }

        // Serial queues skip the wakeup when work was already pending: the
        // in-flight task re-notifies on completion.
        if !self.core.serial || !had_task {
            self.core.notify_workers();
        }

        handle
    }

    /// Mark every item currently in the queue (and every task in flight) as
    /// cancelled. Items pushed after this call observe a clean flag.
    ///
    /// Cancellation is cooperative: items still reach the executor, which
    /// decides what a cancelled item yields.
    pub fn cancel(&self) {
        log::debug!("queue cancelled; outstanding tokens flipped");
        self.core.cancel.cancel_and_renew();
    }

    /// Whether this queue executes at most one item at a time.
    pub fn is_serial(&self) -> bool {
        self.core.serial
    }
}

impl<I, R> Drop for ExecutionQueue<I, R> {
    fn drop(&mut self) {
        // In-flight and still-queued items observe the flag; the executor
        // runs for every record regardless.
        self.core.cancel.cancel();
        self.core.wait_drained();
        if let Some(provider) = self.registration.take() {
            if let Some(pool) = &self.core.pool {
                pool.remove_provider(&provider);
            }
        }
        self.core.overflow.shutdown();
        self.core.overflow.join();
    }
}
