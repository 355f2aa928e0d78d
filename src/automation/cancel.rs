//! Cooperative cancellation shared between the controller and its worker thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Upper bound on how long a cancellable sleep goes without re-checking the flag.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// A cloneable "keep going" flag. Every clone observes the same flag.
///
/// Created active; `cancel()` clears it for good. A new run gets a new token.
#[derive(Clone, Debug)]
pub struct CancelToken {
    active: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn cancel(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        !self.active.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration` unless cancelled first.
    ///
    /// Returns `true` if the full duration elapsed, `false` if cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_sleep_completes_when_active() {
        let token = CancelToken::new();
        assert!(token.sleep(Duration::from_millis(10)));
    }

    #[test]
    fn test_sleep_returns_early_on_cancel() {
        let token = CancelToken::new();
        let clone = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            clone.cancel();
        });

        let start = Instant::now();
        assert!(!token.sleep(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(2));
        handle.join().unwrap();
    }
}
