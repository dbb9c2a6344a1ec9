//! Exactly-once release of resources held by a logical request.

use parking_lot::Mutex;

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Guard that runs its release hook exactly once.
///
/// The hook runs on the first call to [`release`](Self::release) or when the
/// guard is dropped, whichever comes first. Later calls are no-ops, so
/// completion and cancellation paths can both release without coordinating.
pub struct ReleaseGuard {
    release: Mutex<Option<ReleaseFn>>,
}

impl ReleaseGuard {
    /// Creates a new release guard.
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    /// Runs the hook if it has not run yet. Returns true if this call ran it.
    pub fn release(&self) -> bool {
        let hook = self.release.lock().take();
        match hook {
            Some(hook) => {
                hook();
                true
            }
            None => false,
        }
    }

    /// Returns whether the hook has already run or been disarmed.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.release.lock().is_none()
    }

    /// Disarms the guard, preventing the hook from running.
    pub fn disarm(&self) {
        self.release.lock().take();
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if let Some(hook) = self.release.get_mut().take() {
            hook();
        }
    }
}

impl std::fmt::Debug for ReleaseGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseGuard")
            .field("released", &self.is_released())
            .finish()
    }
}
