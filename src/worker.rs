//! Parked worker thread.
//!
//! A worker owns one OS thread, spawned lazily on first notification. When
//! notified it drains its executor (the pool's provider group, or a single
//! provider for queue/stream overflow workers) until a pull comes back
//! empty, then parks on a condition variable.
//!
//! The `check_next_task` latch closes the classic lost-wakeup race: a
//! notification that lands between a failed pull and the park re-sets the
//! latch, and the worker re-checks it under the park mutex before waiting.

use crate::provider::TaskProvider;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

struct ParkState {
    should_quit: bool,
}

struct WorkerShared {
    executor: Arc<dyn TaskProvider>,
    /// Set by `notify`, cleared by the thread before each pull. While true,
    /// further notifications are redundant and report `false`.
    check_next_task: AtomicBool,
    park: Mutex<ParkState>,
    condvar: Condvar,
}

/// A single worker thread pulling tasks through an executor.
pub(crate) struct Worker {
    name: String,
    shared: Arc<WorkerShared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// Create an idle worker. No thread is spawned until the first
    /// successful [`notify`](Self::notify).
    pub(crate) fn new(name: String, executor: Arc<dyn TaskProvider>) -> Self {
        Worker {
            name,
            shared: Arc::new(WorkerShared {
                executor,
                check_next_task: AtomicBool::new(false),
                park: Mutex::new(ParkState { should_quit: false }),
                condvar: Condvar::new(),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Wake the worker to pull tasks.
    ///
    /// Returns `true` iff this call claimed the idle-to-running transition.
    /// `false` means another notifier got there first, or the worker is
    /// already draining; either way it will pull again before parking, so
    /// the notification is not lost.
    pub(crate) fn notify(&self) -> bool {
        if self.shared.check_next_task.swap(true, Ordering::AcqRel) {
            return false;
        }

        self.spawn_if_needed();

        // Take the park mutex so the signal cannot slot in between the
        // thread's latch re-check and its wait.
        drop(self.shared.park.lock());
        self.shared.condvar.notify_one();
        true
    }

    /// Ask the worker thread to exit. Idempotent; does not wait.
    pub(crate) fn shutdown(&self) {
        {
            let mut park = self.shared.park.lock();
            park.should_quit = true;
        }
        self.shared.condvar.notify_all();
    }

    /// Join the worker thread if it was ever spawned.
    ///
    /// A worker tearing down its own pool (possible when the last reference
    /// to a pool is dropped from a task) must not join itself; in that case
    /// the thread is left to exit on its own after observing `should_quit`.
    pub(crate) fn join(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            handle.join().expect("Failed to join worker thread");
        }
    }

    fn spawn_if_needed(&self) {
        let mut handle = self.handle.lock();
        if handle.is_none() {
            let shared = self.shared.clone();
            let name = self.name.clone();
            *handle = Some(
                thread::Builder::new()
                    .name(self.name.clone())
                    .spawn(move || Worker::run_loop(&name, shared))
                    .expect("Failed to spawn worker thread"),
            );
        }
    }

    fn run_loop(name: &str, shared: Arc<WorkerShared>) {
        log::debug!("worker {name} started");
        loop {
            if shared.park.lock().should_quit {
                break;
            }

            // Clear the latch before pulling: a notification racing with
            // the pull re-sets it and is caught below.
            shared.check_next_task.store(false, Ordering::Release);

            if let Some(task) = shared.executor.next_task() {
                task.run();
                continue;
            }

            {
                let mut park = shared.park.lock();
                if shared.check_next_task.load(Ordering::Acquire) {
                    // Notified between the failed pull and the park.
                    continue;
                }
                if park.should_quit {
                    break;
                }
                shared.condvar.wait(&mut park);
            }

            // Awake and about to drain: mark running so notifiers stop
            // signalling; the loop clears the latch again before the pull.
            shared.check_next_task.store(true, Ordering::Release);
        }
        log::debug!("worker {name} exiting");
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
        self.join();
    }
}
