//! Error types for pool construction and task outcomes.

use std::any::Any;

/// Error raised synchronously when constructing an [`ExecutionPool`]
/// with an unusable worker count.
///
/// [`ExecutionPool`]: crate::ExecutionPool
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The requested worker count was zero.
    #[error("execution pool requires at least one worker thread")]
    NoWorkers,

    /// The requested worker count was one. A single-thread pool offers no
    /// concurrency beyond a serial queue, so the pool refuses it.
    #[error("single-thread pool adds nothing over a serial queue; use ExecutionQueue::standalone_serial instead")]
    SingleWorker,
}

/// Failure recorded in a [`TaskHandle`] when a queued item did not produce
/// a result.
///
/// Cancellation is *not* an error: a cancelled callback that honours its
/// [`CancelToken`] returns normally and the handle carries whatever value
/// it chose for the cancel path.
///
/// [`TaskHandle`]: crate::TaskHandle
/// [`CancelToken`]: crate::CancelToken
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// The user callback panicked. The panic was caught by the worker;
    /// the pool and all other tasks are unaffected.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was destroyed before producing a result.
    #[error("task was dropped before producing a result")]
    Abandoned,
}

impl TaskError {
    /// Build a `Panicked` error from a payload caught by
    /// `std::panic::catch_unwind`.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        TaskError::Panicked(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_panic_str_payload() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(
            TaskError::from_panic(payload),
            TaskError::Panicked("boom".to_string())
        );
    }

    #[test]
    fn test_from_panic_string_payload() {
        let payload: Box<dyn Any + Send> = Box::new("kaput".to_string());
        assert_eq!(
            TaskError::from_panic(payload),
            TaskError::Panicked("kaput".to_string())
        );
    }

    #[test]
    fn test_from_panic_opaque_payload() {
        let payload: Box<dyn Any + Send> = Box::new(42u32);
        match TaskError::from_panic(payload) {
            TaskError::Panicked(msg) => assert!(msg.contains("non-string")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_display() {
        assert!(PoolError::NoWorkers.to_string().contains("at least one"));
        assert!(PoolError::SingleWorker.to_string().contains("serial queue"));
        assert!(TaskError::Abandoned.to_string().contains("dropped"));
    }
}
