//! Cancellation and pacing
//!
//! A [`CancelToken`] carries a stop request from one flow to another and an
//! acknowledgement back, so the requester can wait until the running flow has
//! actually stopped issuing device commands.
//!
//! Blocking waits go through a [`Pacer`] so tests can run cadences without
//! sleeping.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Default)]
struct CancelState {
    cancelled: bool,
    acknowledged: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<CancelState>,
    changed: Condvar,
}

/// Shared stop signal with acknowledgement
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    shared: Arc<Shared>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CancelState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Request a stop
    pub fn cancel(&self) {
        self.lock().cancelled = true;
        self.shared.changed.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Wait up to `timeout` for a stop request; returns true if cancelled
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .shared
            .changed
            .wait_timeout_while(guard, timeout, |state| !state.cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        guard.cancelled
    }

    /// Called by the running flow once it has stopped
    pub fn acknowledge(&self) {
        self.lock().acknowledged = true;
        self.shared.changed.notify_all();
    }

    pub fn is_acknowledged(&self) -> bool {
        self.lock().acknowledged
    }

    /// Wait up to `timeout` for the running flow to acknowledge
    pub fn wait_acknowledged(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .shared
            .changed
            .wait_timeout_while(guard, timeout, |state| !state.acknowledged)
            .unwrap_or_else(PoisonError::into_inner);
        guard.acknowledged
    }

    /// Clear both flags for the next run
    pub fn reset(&self) {
        let mut state = self.lock();
        state.cancelled = false;
        state.acknowledged = false;
    }
}

/// Source of blocking delays
pub trait Pacer: Send + Sync {
    /// Wait for `duration`, returning early if `cancel` is raised.
    /// Returns true if the wait was cut short by cancellation.
    fn pause(&self, duration: Duration, cancel: &CancelToken) -> bool;
}

/// Real-time pacer
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&self, duration: Duration, cancel: &CancelToken) -> bool {
        cancel.wait_timeout(duration)
    }
}

/// Pacer that never sleeps and records the requested delays
#[derive(Debug, Clone, Default)]
pub struct InstantPacer {
    requested: Arc<Mutex<Vec<Duration>>>,
}

impl InstantPacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far
    pub fn requested(&self) -> Vec<Duration> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sum of all requested delays
    pub fn total(&self) -> Duration {
        self.requested().iter().sum()
    }
}

impl Pacer for InstantPacer {
    fn pause(&self, duration: Duration, cancel: &CancelToken) -> bool {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
        std::thread::yield_now();
        cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_cancel_wakes_waiter() {
        let token = CancelToken::new();
        let waiter = {
            let token = token.clone();
            thread::spawn(move || token.wait_timeout(Duration::from_secs(10)))
        };
        token.cancel();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_acknowledge_round_trip() {
        let token = CancelToken::new();
        let worker = {
            let token = token.clone();
            thread::spawn(move || {
                while !token.wait_timeout(Duration::from_millis(5)) {}
                token.acknowledge();
            })
        };
        token.cancel();
        assert!(token.wait_acknowledged(Duration::from_secs(10)));
        worker.join().unwrap();

        token.reset();
        assert!(!token.is_cancelled());
        assert!(!token.is_acknowledged());
    }

    #[test]
    fn test_instant_pacer_records() {
        let pacer = InstantPacer::new();
        let token = CancelToken::new();
        assert!(!pacer.pause(Duration::from_secs(5), &token));
        token.cancel();
        assert!(pacer.pause(Duration::from_secs(30), &token));
        assert_eq!(pacer.total(), Duration::from_secs(35));
    }
}
