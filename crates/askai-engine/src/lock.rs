use std::sync::atomic::{AtomicBool, Ordering};

/// Engine-wide single-writer token
///
/// Acquisition never waits: a caller that loses the race gets `None` and must
/// drop its request.
#[derive(Debug, Default)]
pub struct SendLock {
    busy: AtomicBool,
}

impl SendLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<SendGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SendGuard { lock: self })
    }

    pub fn is_held(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the lock when dropped, whatever path the holder took
#[derive(Debug)]
pub struct SendGuard<'a> {
    lock: &'a SendLock,
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        self.lock.busy.store(false, Ordering::Release);
    }
}
