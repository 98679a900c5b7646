use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::shared::cancellation::CancellationToken;

/// How often a parked producer re-checks the cancellation token.
const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// Parks the production loop while nobody is subscribed.
pub struct PauseGate {
    paused: Mutex<bool>,
    changed: Condvar,
}

impl PauseGate {
    pub fn new() -> Self {
        Self {
            paused: Mutex::new(false),
            changed: Condvar::new(),
        }
    }

    pub fn pause(&self) {
        *self.lock() = true;
    }

    pub fn resume(&self) {
        *self.lock() = false;
        self.changed.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        *self.lock()
    }

    /// Blocks while paused. Returns false if `cancel` fired instead.
    pub fn wait_while_paused(&self, cancel: &CancellationToken) -> bool {
        let mut paused = self.lock();
        while *paused {
            if cancel.is_cancelled() {
                return false;
            }
            paused = self
                .changed
                .wait_timeout(paused, CANCEL_CHECK_INTERVAL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        !cancel.is_cancelled()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.paused.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_open_gate_does_not_block() {
        let gate = PauseGate::new();
        assert!(gate.wait_while_paused(&CancellationToken::new()));
    }

    #[test]
    fn test_resume_wakes_waiter() {
        let gate = Arc::new(PauseGate::new());
        gate.pause();
        let waiter = {
            let gate = gate.clone();
            thread::spawn(move || gate.wait_while_paused(&CancellationToken::new()))
        };
        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());
        gate.resume();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_cancel_releases_parked_waiter() {
        let gate = Arc::new(PauseGate::new());
        gate.pause();
        let cancel = CancellationToken::new();
        let waiter = {
            let gate = gate.clone();
            let cancel = cancel.clone();
            thread::spawn(move || gate.wait_while_paused(&cancel))
        };
        let start = Instant::now();
        cancel.cancel();
        assert!(!waiter.join().unwrap());
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(gate.is_paused());
    }
}
