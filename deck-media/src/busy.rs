//! Re-entrancy guard for long-running pipelines.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Holds an in-flight flag for the lifetime of one operation.
///
/// Capture and PDF assembly must not interleave with themselves; a second
/// trigger while one run is in flight acquires nothing and the caller backs
/// off.
pub(crate) struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    /// Try to claim the flag. Returns `None` if an operation is already in
    /// flight.
    pub(crate) fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self {
                flag: Arc::clone(flag),
            })
        }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_until_dropped() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = BusyGuard::try_acquire(&flag).expect("first acquire");
        assert!(BusyGuard::try_acquire(&flag).is_none());
        drop(guard);
        assert!(BusyGuard::try_acquire(&flag).is_some());
    }
}
