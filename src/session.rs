//! Live-loop coordination. One analysis pass runs at a time by
//! construction: the loop never starts a new acquisition while a prior
//! detect/score/render sequence is outstanding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation for the live loop. Cancelling stops the next
/// scheduled iteration; an in-flight detection is left to finish.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_flag_is_sticky_and_shared() {
        let flag = StopFlag::new();
        let other = flag.clone();
        assert!(!flag.is_cancelled());

        other.cancel();
        assert!(flag.is_cancelled());
        assert!(other.is_cancelled());
    }
}
