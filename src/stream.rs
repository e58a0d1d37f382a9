//! Demand-driven execution stream.

use crate::cancel::{CancelSource, CancelToken};
use crate::pool::PoolCore;
use crate::provider::{TaskProvider, WeakProvider};
use crate::task::Task;
use crate::worker::Worker;
use parking_lot::{Condvar, Mutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

type ExecuteeFn = Box<dyn Fn(&CancelToken) + Send + Sync>;

struct StreamCore {
    started: AtomicBool,
    running: Mutex<usize>,
    drained: Condvar,
    cancel: CancelSource,
    pool: Arc<PoolCore>,
    overflow: Worker,
    executee: ExecuteeFn,
    self_ref: Weak<StreamCore>,
}

impl StreamCore {
    fn run_once(&self) {
        let token = self.cancel.token();
        if panic::catch_unwind(AssertUnwindSafe(|| (self.executee)(&token))).is_err() {
            log::error!("stream executee panicked; stream continues");
        }

        let running = {
            let mut running = self.running.lock();
            *running -= 1;
            *running
        };
        if running == 0 {
            self.drained.notify_all();
        }
    }

    fn wait_drained(&self) {
        let mut running = self.running.lock();
        while *running > 0 {
            self.drained.wait(&mut running);
        }
    }
}

impl TaskProvider for StreamCore {
    fn next_task(&self) -> Option<Task> {
        if !self.started.load(Ordering::Acquire) {
            return None;
        }
        let core = self.self_ref.upgrade()?;
        *self.running.lock() += 1;
        Some(Task::new(move || core.run_once()))
    }
}

/// Open-ended producer that manufactures an identical task on demand while
/// started.
///
/// Streams model work whose amount is unknown up front, such as a
/// directory walk, where an idle worker should immediately obtain more of
/// it: as long as the stream is started, every free worker that consults it
/// receives another call to the executee.
///
/// Created stopped; [`start`](Self::start) wakes *all* pool workers plus
/// the stream's own overflow worker. [`stop`](Self::stop) stops producing
/// new tasks without interrupting those already running. Dropping the
/// stream stops it, cancels its token, and blocks until every in-flight
/// call has returned.
pub struct ExecutionStream {
    core: Arc<StreamCore>,
    registration: Option<Arc<dyn TaskProvider>>,
}

impl ExecutionStream {
    pub(crate) fn new(pool: Arc<PoolCore>, executee: ExecuteeFn) -> Self {
        let core = Arc::new_cyclic(|weak: &Weak<StreamCore>| {
            let overflow_source: Arc<dyn TaskProvider> = Arc::new(WeakProvider(weak.clone()));
            StreamCore {
                started: AtomicBool::new(false),
                running: Mutex::new(0),
                drained: Condvar::new(),
                cancel: CancelSource::new(),
                pool,
                overflow: Worker::new("execpool-stream".to_string(), overflow_source),
                executee,
                self_ref: weak.clone(),
            }
        });

        let provider: Arc<dyn TaskProvider> = core.clone();
        core.pool.add_provider(provider.clone());

        ExecutionStream {
            core,
            registration: Some(provider),
        }
    }

    /// Start producing tasks. Idempotent; `start` after `stop` resumes the
    /// stream with no lost demand.
    pub fn start(&self) {
        self.core.started.store(true, Ordering::Release);
        log::debug!("stream started");
        self.core.pool.notify_all_workers();
        self.core.overflow.notify();
    }

    /// Stop producing tasks. Calls already in flight continue; the executee
    /// observes the cancel flag only when the stream is dropped.
    pub fn stop(&self) {
        self.core.started.store(false, Ordering::Release);
        log::debug!("stream stopped");
    }

    /// Whether the stream is currently producing tasks.
    pub fn is_started(&self) -> bool {
        self.core.started.load(Ordering::Acquire)
    }
}

impl Drop for ExecutionStream {
    fn drop(&mut self) {
        self.stop();
        self.core.cancel.cancel();
        self.core.wait_drained();
        if let Some(provider) = self.registration.take() {
            self.core.pool.remove_provider(&provider);
        }
        self.core.overflow.shutdown();
        self.core.overflow.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::ExecutionPool;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_stream_created_stopped() {
        let pool = ExecutionPool::with_workers(2).expect("valid");
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let stream = pool.stream(move |_cancel| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!stream.is_started());
        thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stream_executes_while_started() {
        let pool = ExecutionPool::with_workers(2).expect("valid");
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let stream = pool.stream(move |_cancel| {
            c.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
        });

        stream.start();
        assert!(stream.is_started());
        thread::sleep(Duration::from_millis(100));
        stream.stop();

        assert!(counter.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_stop_halts_production() {
        let pool = ExecutionPool::with_workers(2).expect("valid");
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let stream = pool.stream(move |_cancel| {
            c.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
        });

        stream.start();
        thread::sleep(Duration::from_millis(50));
        stream.stop();

        // Let in-flight calls finish, then verify the counter settles.
        thread::sleep(Duration::from_millis(50));
        let settled = counter.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.load(Ordering::SeqCst), settled);
    }

    #[test]
    fn test_start_stop_start_resumes() {
        let pool = ExecutionPool::with_workers(2).expect("valid");
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let stream = pool.stream(move |_cancel| {
            c.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
        });

        stream.start();
        stream.stop();
        stream.start();
        assert!(stream.is_started());

        thread::sleep(Duration::from_millis(100));
        assert!(counter.load(Ordering::SeqCst) >= 1);
    }
}
