//! Task providers and the rotating provider group.

use crate::task::Task;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Source of tasks, pulled on demand.
///
/// The whole contract is one method: "give me the next task if any".
/// Queues and streams implement it; the [`ProviderGroup`] multiplexes many
/// of them behind the same interface so a worker does not care whether it
/// drains one provider or a whole pool's worth.
pub(crate) trait TaskProvider: Send + Sync {
    /// Next task from this provider, or `None` when it has nothing ready.
    fn next_task(&self) -> Option<Task>;
}

/// Provider identity for registration/removal: thin data-pointer
/// comparison, immune to `dyn` vtable-pointer duplication.
fn same_provider(a: &Arc<dyn TaskProvider>, b: &Arc<dyn TaskProvider>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

struct GroupState {
    providers: Vec<Arc<dyn TaskProvider>>,
    cursor: usize,
}

/// Ordered ring of providers with round-robin dispatch.
///
/// Each `next_task` call consults at most `len` providers, starting at the
/// rotation cursor rather than the head, so a hot early provider cannot
/// starve later ones. The cursor advances by one per consulted provider;
/// the next call resumes after the last one consulted. Membership changes
/// reset the cursor to the beginning; coarse, but membership churn is rare
/// compared to pulls.
pub(crate) struct ProviderGroup {
    state: Mutex<GroupState>,
}

impl ProviderGroup {
    pub(crate) fn new() -> Self {
        ProviderGroup {
            state: Mutex::new(GroupState {
                providers: Vec::new(),
                cursor: 0,
            }),
        }
    }

    pub(crate) fn add(&self, provider: Arc<dyn TaskProvider>) {
        let mut state = self.state.lock();
        state.providers.push(provider);
        state.cursor = 0;
    }

    pub(crate) fn remove(&self, provider: &Arc<dyn TaskProvider>) {
        let mut state = self.state.lock();
        state.providers.retain(|p| !same_provider(p, provider));
        state.cursor = 0;
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.state.lock().providers.len()
    }
}

impl TaskProvider for ProviderGroup {
    fn next_task(&self) -> Option<Task> {
        // Lock order: group before any provider's own lock. Providers are
        // consulted in place, without cloning their Arc, so no transient
        // ownership of a provider outlives this call.
        let mut state = self.state.lock();
        for _ in 0..state.providers.len() {
            if state.cursor >= state.providers.len() {
                state.cursor = 0;
            }
            let index = state.cursor;
            state.cursor += 1;
            if let Some(task) = state.providers[index].next_task() {
                return Some(task);
            }
        }
        None
    }
}

/// Provider shim holding a weak back-reference.
///
/// Queues and streams own their overflow worker while also *being* that
/// worker's provider; the worker therefore reaches its owner through a
/// `Weak` so the two do not keep each other alive. After the owner is gone
/// the shim simply reports "no tasks".
pub(crate) struct WeakProvider<P: TaskProvider>(pub(crate) Weak<P>);

impl<P: TaskProvider> TaskProvider for WeakProvider<P> {
    fn next_task(&self) -> Option<Task> {
        self.0.upgrade().and_then(|provider| provider.next_task())
    }
}
