//! Cooperative cancellation flags.
//!
//! Cancellation is strictly cooperative: the framework never interrupts a
//! running callback. A [`CancelToken`] is a shared boolean the callback
//! polls at its own cadence; [`CancelSource`] is the issuing side, owned by
//! a queue or stream.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared, read-only view of a cancellation flag.
///
/// Every user callback receives a `&CancelToken` as its first argument and
/// decides for itself when (and whether) to check it. Tokens are cheap to
/// clone; all clones issued from the same source generation observe the
/// same flag.
#[derive(Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Whether the owning queue or stream has cancelled this token's
    /// generation.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Issuer of [`CancelToken`]s.
///
/// Holds the *current* flag in a swappable slot. `cancel` flips the current
/// flag so every token issued so far observes `true`; `cancel_and_renew`
/// additionally installs a fresh flag so tokens issued afterwards start
/// clean. This is what lets a queue distinguish items pushed before an
/// explicit cancel (which must see the flag) from items pushed after
/// (which must not).
pub(crate) struct CancelSource {
    current: Mutex<Arc<AtomicBool>>,
}

impl CancelSource {
    pub(crate) fn new() -> Self {
        CancelSource {
            current: Mutex::new(Arc::new(AtomicBool::new(false))),
        }
    }

    /// Issue a token for the current generation.
    pub(crate) fn token(&self) -> CancelToken {
        CancelToken {
            flag: self.current.lock().clone(),
        }
    }

    /// Cancel the current generation. Idempotent.
    pub(crate) fn cancel(&self) {
        self.current.lock().store(true, Ordering::Release);
    }

    /// Cancel the current generation and install a fresh one for
    /// subsequently issued tokens.
    pub(crate) fn cancel_and_renew(&self) {
        let mut slot = self.current.lock();
        slot.store(true, Ordering::Release);
        *slot = Arc::new(AtomicBool::new(false));
    }
}
