//! Mutex-backed digest guard.

use super::ExclusionGuard;
use std::sync::{Arc, Mutex, OnceLock};

/// The default [`ExclusionGuard`]: a plain mutex.
///
/// Digest exclusivity is process-wide, so pipelines built without an
/// explicit guard all share [`DigestLock::global`]. A fresh instance from
/// [`DigestLock::new`] only serializes the callers that hold it.
#[derive(Debug, Default)]
pub struct DigestLock {
    lock: Mutex<()>,
}

impl DigestLock {
    /// Create a new unlocked guard
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock shared by every pipeline in this process
    pub fn global() -> Arc<DigestLock> {
        static GLOBAL: OnceLock<Arc<DigestLock>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(DigestLock::new())))
    }
}

impl ExclusionGuard for DigestLock {
    fn exclusive(&self, op: &mut dyn FnMut()) {
        // A poisoned lock only means an earlier digest panicked; the unit
        // value behind it cannot be left inconsistent.
        let _held = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        op();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::guarded;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn lock_serializes_concurrent_callers() {
        let lock = Arc::new(DigestLock::new());
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    guarded(lock.as_ref(), || {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(2));
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                    });
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn lock_recovers_after_poisoning() {
        let lock = Arc::new(DigestLock::new());

        let poisoner = Arc::clone(&lock);
        let result = thread::spawn(move || {
            guarded(poisoner.as_ref(), || panic!("digest blew up"));
        })
        .join();
        assert!(result.is_err());

        assert_eq!(guarded(lock.as_ref(), || 7), 7);
    }

    #[test]
    fn global_lock_is_shared() {
        let first = DigestLock::global();
        let second = DigestLock::global();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &Arc::new(DigestLock::new())));
    }
}
