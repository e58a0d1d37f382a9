//! One-shot result channel between a queued task and its submitter.
//!
//! [`ExecutionQueue::push`] returns the consumer half, [`TaskHandle`]; the
//! producer half, [`TaskPromise`], travels inside the queue record and is
//! fulfilled (or failed) by whichever worker runs the task.
//!
//! [`ExecutionQueue::push`]: crate::ExecutionQueue::push

use crate::error::TaskError;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

struct Shared<R> {
    cell: Mutex<Option<Result<R, TaskError>>>,
    done: Condvar,
}

/// Create a connected promise/handle pair.
pub(crate) fn channel<R>() -> (TaskPromise<R>, TaskHandle<R>) {
    let shared = Arc::new(Shared {
        cell: Mutex::new(None),
        done: Condvar::new(),
    });
    (
        TaskPromise {
            shared: Some(shared.clone()),
        },
        TaskHandle { shared },
    )
}

/// Consumer half of a task's result channel.
///
/// Single-consumer and retrievable exactly once: [`wait`](Self::wait)
/// consumes the handle. Dropping a handle never blocks; a caller that does
/// not care about the outcome can freely discard it.
pub struct TaskHandle<R> {
    shared: Arc<Shared<R>>,
}

impl<R> TaskHandle<R> {
    /// Block until the task finishes and return its outcome.
    pub fn wait(self) -> Result<R, TaskError> {
        let mut cell = self.shared.cell.lock();
        loop {
            if let Some(outcome) = cell.take() {
                return outcome;
            }
            self.shared.done.wait(&mut cell);
        }
    }

    /// Block until the task finishes or `timeout` elapses. Returns whether
    /// the result is available; when it is, [`wait`](Self::wait) returns
    /// without blocking.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut cell = self.shared.cell.lock();
        if cell.is_some() {
            return true;
        }
        let _ = self.shared.done.wait_for(&mut cell, timeout);
        cell.is_some()
    }

    /// Whether the task has already finished.
    pub fn is_done(&self) -> bool {
        self.shared.cell.lock().is_some()
    }
}

impl<R> std::fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("done", &self.is_done())
            .finish()
    }
}

/// Producer half of a task's result channel.
///
/// Dropping an unfulfilled promise records [`TaskError::Abandoned`] so the
/// handle never waits forever.
pub(crate) struct TaskPromise<R> {
    shared: Option<Arc<Shared<R>>>,
}

impl<R> TaskPromise<R> {
    fn set(&mut self, outcome: Result<R, TaskError>) {
        if let Some(shared) = self.shared.take() {
            *shared.cell.lock() = Some(outcome);
            shared.done.notify_all();
        }
    }

    /// Record a successful result.
    pub(crate) fn fulfill(mut self, value: R) {
        self.set(Ok(value));
    }

    /// Record a failure.
    pub(crate) fn fail(mut self, error: TaskError) {
        self.set(Err(error));
    }
}

impl<R> Drop for TaskPromise<R> {
    fn drop(&mut self) {
        self.set(Err(TaskError::Abandoned));
    }
}
