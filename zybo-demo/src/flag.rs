//! Interrupt to main loop handoff.
use core::sync::atomic::{AtomicBool, Ordering};

/// Boolean written by an interrupt handler and consumed by the main loop.
///
/// Events are not queued: a second [Self::set] before the main loop consumed the first one is
/// merged into it.
#[derive(Debug, Default)]
pub struct EventFlag(AtomicBool);

impl EventFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    #[inline]
    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear the flag and return whether it was set.
    #[inline]
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::Relaxed)
    }

    #[inline]
    pub fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_coalesced() {
        let flag = EventFlag::new();
        assert!(!flag.take());
        flag.set();
        flag.set();
        assert!(flag.is_set());
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[test]
    fn clear() {
        let flag = EventFlag::new();
        flag.set();
        flag.clear();
        assert!(!flag.is_set());
    }
}
