//! One-shot unit of work.

/// A nullary, one-shot, movable unit of work bound to the provider that
/// created it.
///
/// Providers hand out `Option<Task>`: `None` means "nothing to run right
/// now". A task runs at most once; `FnOnce` makes re-running unrepresentable.
pub(crate) struct Task(Box<dyn FnOnce() + Send>);

impl Task {
    /// Wrap a thunk into a task.
    pub(crate) fn new<F>(thunk: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Task(Box::new(thunk))
    }

    /// Execute the task, consuming it.
    pub(crate) fn run(self) {
        (self.0)();
    }
}
