//! Shared listener state
//!
//! One object owns every piece of mutable state shared between the
//! background loop, recognition workers, and the command handler: the
//! running and pause flags, the debounce timestamp, and the exclusive
//! handler slot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Permit held by the single live handler flow
///
/// Dropping the permit releases the handler slot.
pub type HandlerPermit = OwnedSemaphorePermit;

/// Outcome of the debounce gate for a detected wake phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeGate {
    /// Trigger accepted; the wake timestamp was updated
    Accepted,

    /// Trigger fell inside the debounce window; no state changed
    Debounced {
        /// Elapsed time since the last accepted trigger
        since_last: Duration,
    },
}

/// Synchronized listener state
pub struct ListenerState {
    running: AtomicBool,
    paused: AtomicBool,
    last_wake: Mutex<Option<Instant>>,
    handler_slot: Arc<Semaphore>,
    debounce: Duration,
}

impl ListenerState {
    /// Create listener state with the given debounce window
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        Self {
            running: AtomicBool::new(true),
            paused: AtomicBool::new(false),
            last_wake: Mutex::new(None),
            handler_slot: Arc::new(Semaphore::new(1)),
            debounce,
        }
    }

    /// Whether the assistant is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Request shutdown; the background loop exits on its next iteration
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether background capture is paused
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Pause background capture without stopping the loop
    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::SeqCst) {
            tracing::debug!("background listener paused");
        }
    }

    /// Resume background capture
    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::SeqCst) {
            tracing::debug!("background listener resumed");
        }
    }

    /// Run the debounce gate for a detected wake phrase
    ///
    /// The wake timestamp advances only when the trigger is accepted; a
    /// debounced trigger leaves all state untouched.
    pub fn gate_wake(&self) -> WakeGate {
        let now = Instant::now();
        let mut last = self.last_wake.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(prev) = *last {
            let since_last = now.duration_since(prev);
            if since_last < self.debounce {
                return WakeGate::Debounced { since_last };
            }
        }

        *last = Some(now);
        WakeGate::Accepted
    }

    /// Attempt a non-blocking acquisition of the handler slot
    ///
    /// Returns `None` when a handler flow is already live — the caller
    /// drops the trigger rather than queueing it.
    #[must_use]
    pub fn try_begin_handling(&self) -> Option<HandlerPermit> {
        Arc::clone(&self.handler_slot).try_acquire_owned().ok()
    }

    /// Whether a handler flow currently holds the slot
    #[must_use]
    pub fn is_handling(&self) -> bool {
        self.handler_slot.available_permits() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debounce_sequence() {
        let state = ListenerState::new(Duration::from_millis(50));

        // First trigger is always accepted
        assert_eq!(state.gate_wake(), WakeGate::Accepted);

        // Immediately retriggering is debounced, repeatedly
        assert!(matches!(state.gate_wake(), WakeGate::Debounced { .. }));
        assert!(matches!(state.gate_wake(), WakeGate::Debounced { .. }));

        // After the window elapses the next trigger is accepted again
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(state.gate_wake(), WakeGate::Accepted);
    }

    #[test]
    fn test_debounced_trigger_does_not_extend_window() {
        let state = ListenerState::new(Duration::from_millis(50));
        assert_eq!(state.gate_wake(), WakeGate::Accepted);

        // A debounced trigger must not reset the timestamp, so a trigger
        // right after the first window elapses still passes.
        std::thread::sleep(Duration::from_millis(30));
        assert!(matches!(state.gate_wake(), WakeGate::Debounced { .. }));
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(state.gate_wake(), WakeGate::Accepted);
    }

    #[test]
    fn test_handler_slot_is_exclusive() {
        let state = ListenerState::new(Duration::from_secs(3));

        let permit = state.try_begin_handling().expect("slot free");
        assert!(state.is_handling());

        // Second acquisition loses the race
        assert!(state.try_begin_handling().is_none());

        drop(permit);
        assert!(!state.is_handling());
        assert!(state.try_begin_handling().is_some());
    }

    #[test]
    fn test_pause_resume() {
        let state = ListenerState::new(Duration::from_secs(3));
        assert!(!state.is_paused());

        state.pause();
        assert!(state.is_paused());

        // Idempotent
        state.pause();
        assert!(state.is_paused());

        state.resume();
        assert!(!state.is_paused());
    }

    #[test]
    fn test_stop_clears_running() {
        let state = ListenerState::new(Duration::from_secs(3));
        assert!(state.is_running());
        state.stop();
        assert!(!state.is_running());
    }
}
